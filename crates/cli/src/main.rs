use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::Parser;
use pmcheck_cli::{App, Command};
use pmcheck_core::trace::display::format_trace;
use pmcheck_core::trace::TraceEvent;
use pmcheck_core::{Checker, CheckerConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let app = App::parse();
    match &app.command {
        Command::Generate(args) => generate(args),
        Command::Check(args) => check(args),
        Command::Fmt(args) => fmt(args),
        Command::Schema => schema(),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn generate(args: &pmcheck_cli::GenerateArgs) {
    if args.pool_size == 0 {
        fail("--pool-size must be at least 1");
    }
    fs::create_dir_all(&args.output_dir)
        .unwrap_or_else(|e| fail(&format!("Failed to create output directory: {e}")));

    let traces = pmcheck_testgen::generator::generate_mult_traces(
        args.n_trace,
        args.n_thread,
        args.n_tx,
        args.n_op,
        args.pool_size,
    );

    for trace in &traces {
        if args.compact {
            let path = args.output_dir.join(format!("{}.trace", trace.get_id()));
            fs::write(&path, format_trace(trace.get_data()))
                .unwrap_or_else(|e| fail(&format!("Failed to write {}: {e}", path.display())));
        } else {
            let path = args.output_dir.join(format!("{}.json", trace.get_id()));
            let file = fs::File::create(&path)
                .unwrap_or_else(|e| fail(&format!("Failed to create {}: {e}", path.display())));
            serde_json::to_writer_pretty(file, trace)
                .unwrap_or_else(|e| fail(&format!("Failed to write {}: {e}", path.display())));
        }
    }

    println!(
        "Generated {} traces to {}",
        traces.len(),
        args.output_dir.display()
    );
}

fn is_trace_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "json" || ext == "trace")
}

/// Expands directories into the trace files they contain, sorted by path.
fn collect_inputs(paths: &[PathBuf], accept: fn(&Path) -> bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)
                .unwrap_or_else(|e| fail(&format!("Failed to read {}: {e}", path.display())))
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|p| accept(p))
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }
    if files.is_empty() {
        fail("No trace files found");
    }
    files
}

/// Loads a trace from a generated JSON file, a JSON event array, or the
/// compact text format.
fn load_trace(path: &Path) -> Result<Vec<TraceEvent>, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    if path.extension().is_some_and(|ext| ext == "json") {
        if let Ok(trace) = serde_json::from_str::<pmcheck_testgen::Trace>(&text) {
            return Ok(trace.get_data().clone());
        }
        serde_json::from_str::<Vec<TraceEvent>>(&text).map_err(|e| e.to_string())
    } else {
        pmcheck_parser::parse_trace(&text).map_err(|e| e.to_string())
    }
}

fn check(args: &pmcheck_cli::CheckArgs) {
    let config = CheckerConfig::from(args);
    let mut any_failed = false;

    for path in collect_inputs(&args.paths, is_trace_file) {
        let filename = path.file_name().unwrap_or_default().to_string_lossy();
        let events = load_trace(&path)
            .unwrap_or_else(|e| fail(&format!("Failed to parse {filename}: {e}")));
        tracing::debug!(file = %filename, events = events.len(), "checking trace");

        let mut checker = Checker::new(config.clone());
        if let Err((index, err)) = checker.apply_all(&events) {
            any_failed = true;
            if args.json {
                let result = serde_json::json!({
                    "file": filename,
                    "ok": false,
                    "event": index,
                    "error": err.to_string(),
                });
                println!("{result}");
            } else {
                println!("{filename}: ERROR at event {index} ({}): {err}", events[index]);
            }
            continue;
        }

        let report = checker.finish();
        let ok = report.is_clean();
        any_failed |= !ok;
        if args.json {
            let result = serde_json::json!({
                "file": filename,
                "ok": ok,
                "report": report,
            });
            println!("{result}");
        } else if args.verbose {
            println!("{filename}: {}", if ok { "PASS" } else { "FAIL" });
            for line in report.to_string().lines() {
                println!("  {line}");
            }
            for warning in &report.warnings {
                println!("  {}: {}", warning.kind, warning.region);
            }
        } else if ok {
            println!("{filename}: PASS");
        } else {
            println!(
                "{filename}: FAIL ({} unflushed, {} violations)",
                report.unflushed.len(),
                report.detected.iter().map(|(_, count)| count).sum::<u64>()
            );
        }
    }

    if any_failed {
        process::exit(1);
    }
}

fn fmt(args: &pmcheck_cli::FmtArgs) {
    let is_compact = |path: &Path| path.extension().is_some_and(|ext| ext == "trace");
    let mut unformatted = false;

    for path in collect_inputs(&args.paths, is_compact) {
        let text = fs::read_to_string(&path)
            .unwrap_or_else(|e| fail(&format!("Failed to read {}: {e}", path.display())));
        let events = pmcheck_parser::parse_trace(&text)
            .unwrap_or_else(|e| fail(&format!("{}: {e}", path.display())));
        let formatted = format_trace(&events);
        if formatted == text {
            continue;
        }
        if args.check {
            println!("Would reformat {}", path.display());
            unformatted = true;
        } else {
            fs::write(&path, formatted)
                .unwrap_or_else(|e| fail(&format!("Failed to write {}: {e}", path.display())));
            println!("Formatted {}", path.display());
        }
    }

    if unformatted {
        process::exit(1);
    }
}

fn schema() {
    let schema = schemars::schema_for!(Vec<TraceEvent>);
    let text = serde_json::to_string_pretty(&schema)
        .unwrap_or_else(|e| fail(&format!("Failed to serialize schema: {e}")));
    println!("{text}");
}

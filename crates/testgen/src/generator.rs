use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Duration, Local};
use pmcheck_core::trace::TraceEvent;
use pmcheck_core::{ThreadId, TxId};
use rand::distr::{Distribution, Uniform};
use rand::RngExt;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Granularity of generated objects, flushes, and stores.
pub const LINE: u64 = 64;

/// Largest number of objects registered by one transaction.
const MAX_OBJECTS: usize = 4;

#[derive(Clone, Debug, Default, Deserialize, Serialize, TypedBuilder)]
pub struct TraceParams {
    pub id: u64,
    pub n_thread: u64,
    /// Transactions per thread.
    pub n_tx: u64,
    /// Stores per transaction.
    pub n_op: u64,
    /// Size of the mapped pool, in lines.
    pub pool_size: u64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct Trace {
    params: TraceParams,
    info: String,
    start: DateTime<Local>,
    end: DateTime<Local>,
    data: Vec<TraceEvent>,
}

impl Trace {
    #[must_use]
    pub const fn new(
        params: TraceParams,
        info: String,
        start: DateTime<Local>,
        end: DateTime<Local>,
        data: Vec<TraceEvent>,
    ) -> Self {
        Self {
            params,
            info,
            start,
            end,
            data,
        }
    }

    #[must_use]
    pub const fn get_id(&self) -> u64 {
        self.params.id
    }

    #[must_use]
    pub const fn get_data(&self) -> &Vec<TraceEvent> {
        &self.data
    }

    #[must_use]
    pub const fn get_params(&self) -> &TraceParams {
        &self.params
    }

    #[must_use]
    pub fn get_duration(&self) -> Duration {
        self.end - self.start
    }
}

/// A store of a random aligned chunk of `line`.
fn store_in_line<R: RngExt>(rng: &mut R, thread: ThreadId, line: u64) -> TraceEvent {
    let words = LINE / 8;
    let first = rng.random_range(0..words);
    let len = rng.random_range(1..=words - first);
    TraceEvent::Store {
        thread,
        addr: line * LINE + first * 8,
        size: len * 8,
        value: rng.random(),
        context: None,
    }
}

const fn flush_line(line: u64) -> TraceEvent {
    TraceEvent::Flush {
        addr: line * LINE,
        size: LINE,
    }
}

/// Generate a single trace of `n_thread` threads, each running `n_tx`
/// transactions of `n_op` stores over a pool of `pool_size` lines.
///
/// # Well-formedness
///
/// Every generated trace replays without error:
/// 1. The pool is mapped before any other event.
/// 2. Transaction ids are globally unique, and each thread runs its
///    transactions one after the other, so `add`, `remove`, and `end` only
///    ever name an active transaction.
/// 3. A transaction's objects are distinct lines, and only a line still
///    owned is ever removed.
///
/// Each thread's lines are flushed and fenced before its transaction ends,
/// so the final state has no unflushed stores. About one store in eight
/// deliberately misses the transaction's objects, and threads occasionally
/// store outside any transaction.
///
/// Threads' scripts are interleaved at random, preserving each thread's
/// program order.
///
/// # Panics
///
/// Panics if `pool_size` is zero (cannot create a uniform distribution over
/// an empty range).
#[must_use]
pub fn generate_single_trace(
    n_thread: u64,
    n_tx: u64,
    n_op: u64,
    pool_size: u64,
) -> Vec<TraceEvent> {
    let mut random_generator = rand::rng();
    let line_range = Uniform::new(0, pool_size).unwrap();
    let mut next_tx = 0;

    let mut scripts: Vec<VecDeque<TraceEvent>> = (1..=n_thread)
        .map(|thread| {
            let thread = ThreadId(u32::try_from(thread).unwrap_or(u32::MAX));
            let mut script = VecDeque::new();

            for _ in 0..n_tx {
                let tx = TxId(next_tx);
                next_tx += 1;
                script.push_back(TraceEvent::TxBegin { tx, thread });

                let cap = usize::try_from(pool_size).map_or(MAX_OBJECTS, |p| p.min(MAX_OBJECTS));
                let n_objects = random_generator.random_range(1..=cap);
                let mut objects: Vec<u64> = Vec::new();
                let mut chosen: HashSet<u64> = HashSet::new();
                while objects.len() < n_objects {
                    let line = line_range.sample(&mut random_generator);
                    if chosen.insert(line) {
                        objects.push(line);
                        script.push_back(TraceEvent::TxAdd {
                            tx,
                            addr: line * LINE,
                            size: LINE,
                        });
                    }
                }

                let mut touched: HashSet<u64> = HashSet::new();
                for _ in 0..n_op {
                    let line = if random_generator.random_bool(0.125) {
                        line_range.sample(&mut random_generator)
                    } else {
                        objects[random_generator.random_range(0..objects.len())]
                    };
                    touched.insert(line);
                    script.push_back(store_in_line(&mut random_generator, thread, line));

                    if random_generator.random_bool(0.25) {
                        script.push_back(flush_line(line));
                    }
                    if objects.len() > 1 && random_generator.random_bool(0.05) {
                        let idx = random_generator.random_range(0..objects.len());
                        let line = objects.swap_remove(idx);
                        script.push_back(TraceEvent::TxRemove {
                            tx,
                            addr: line * LINE,
                            size: LINE,
                        });
                    }
                }

                let mut touched: Vec<u64> = touched.into_iter().collect();
                touched.sort_unstable();
                script.extend(touched.into_iter().map(flush_line));
                script.push_back(TraceEvent::Fence);
                script.push_back(TraceEvent::TxEnd { tx });

                if random_generator.random_bool(0.1) {
                    let line = line_range.sample(&mut random_generator);
                    script.push_back(store_in_line(&mut random_generator, thread, line));
                    script.push_back(flush_line(line));
                    script.push_back(TraceEvent::Fence);
                }
            }

            script
        })
        .collect();

    let mut events = vec![TraceEvent::Map {
        addr: 0,
        size: pool_size * LINE,
    }];
    loop {
        let live: Vec<usize> = (0..scripts.len())
            .filter(|i| !scripts[*i].is_empty())
            .collect();
        if live.is_empty() {
            break;
        }
        let pick = live[random_generator.random_range(0..live.len())];
        events.extend(scripts[pick].pop_front());
    }
    events
}

#[must_use]
pub fn generate_mult_traces(
    n_trace: u64,
    n_thread: u64,
    n_tx: u64,
    n_op: u64,
    pool_size: u64,
) -> Vec<Trace> {
    (0..n_trace)
        .into_par_iter()
        .map(|i_trace| {
            let start_time = Local::now();
            let trace = generate_single_trace(n_thread, n_tx, n_op, pool_size);
            let end_time = Local::now();
            Trace {
                params: TraceParams {
                    id: i_trace,
                    n_thread,
                    n_tx,
                    n_op,
                    pool_size,
                },
                info: "generated".to_string(),
                start: start_time,
                end: end_time,
                data: trace,
            }
        })
        .collect()
}

/// DSL macro for building test traces.
///
/// Produces `Vec<TraceEvent>`.
///
/// # Syntax
///
/// ```ignore
/// trace! {
///     map(0x0, 0x10000),
///     begin(7, 1),                 // tx 7 registered by thread 1
///     add(7, 0x2000, 0x100),
///     store(1, 0x2000, 16, 0xff),  // thread, addr, size, value
///     flush(0x2000, 16),
///     fence(),
///     end(7),
/// }
/// ```
///
/// Build a single `TraceEvent`.
#[macro_export]
macro_rules! ev {
    (map($addr:expr, $size:expr)) => {
        pmcheck_core::trace::TraceEvent::Map { addr: $addr, size: $size }
    };
    (unmap($addr:expr, $size:expr)) => {
        pmcheck_core::trace::TraceEvent::Unmap { addr: $addr, size: $size }
    };
    (exclude($addr:expr, $size:expr)) => {
        pmcheck_core::trace::TraceEvent::Exclude { addr: $addr, size: $size }
    };
    (store($thread:expr, $addr:expr, $size:expr, $value:expr)) => {
        pmcheck_core::trace::TraceEvent::Store {
            thread: pmcheck_core::ThreadId($thread),
            addr: $addr,
            size: $size,
            value: $value,
            context: None,
        }
    };
    (flush($addr:expr, $size:expr)) => {
        pmcheck_core::trace::TraceEvent::Flush { addr: $addr, size: $size }
    };
    (fence()) => {
        pmcheck_core::trace::TraceEvent::Fence
    };
    (begin($tx:expr, $thread:expr)) => {
        pmcheck_core::trace::TraceEvent::TxBegin {
            tx: pmcheck_core::TxId($tx),
            thread: pmcheck_core::ThreadId($thread),
        }
    };
    (end($tx:expr)) => {
        pmcheck_core::trace::TraceEvent::TxEnd { tx: pmcheck_core::TxId($tx) }
    };
    (add($tx:expr, $addr:expr, $size:expr)) => {
        pmcheck_core::trace::TraceEvent::TxAdd {
            tx: pmcheck_core::TxId($tx),
            addr: $addr,
            size: $size,
        }
    };
    (remove($tx:expr, $addr:expr, $size:expr)) => {
        pmcheck_core::trace::TraceEvent::TxRemove {
            tx: pmcheck_core::TxId($tx),
            addr: $addr,
            size: $size,
        }
    };
    (join($tx:expr, $thread:expr)) => {
        pmcheck_core::trace::TraceEvent::TxJoin {
            tx: pmcheck_core::TxId($tx),
            thread: pmcheck_core::ThreadId($thread),
        }
    };
    (leave($tx:expr, $thread:expr)) => {
        pmcheck_core::trace::TraceEvent::TxLeave {
            tx: pmcheck_core::TxId($tx),
            thread: pmcheck_core::ThreadId($thread),
        }
    };
}

/// Build a full trace from comma-separated events.
#[macro_export]
macro_rules! trace {
    ($($op:ident($($args:tt)*)),* $(,)?) => {
        vec![
            $($crate::ev!($op($($args)*))),*
        ]
    };
}

/// Replay `events` on a fresh checker built from `config`.
#[allow(dead_code)]
pub fn replay(
    config: pmcheck_core::CheckerConfig,
    events: &[pmcheck_core::trace::TraceEvent],
) -> pmcheck_core::Checker {
    let mut checker = pmcheck_core::Checker::new(config);
    checker
        .apply_all(events)
        .unwrap_or_else(|(i, err)| panic!("event {i} ({}) failed: {err}", events[i]));
    checker
}

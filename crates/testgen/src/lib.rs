//! Random, well-formed persistent-memory traces for testing and
//! benchmarking `pmcheck_core`.

pub mod generator;

pub use generator::{generate_mult_traces, generate_single_trace, Trace, TraceParams};

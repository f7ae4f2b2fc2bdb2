//! Stopwatch timers and scoped call-stack profiling.
//!
//! - [`Timer`] is a start/stop/reset stopwatch that can also be bound to a
//!   scope with [`Timer::scope`].
//! - [`ProfiledCall`] and [`ProfileScope`] run code under a fresh
//!   [`CallProfiler`] and either print the collected statistics or dump them
//!   to a file named from a `{funcname}-{pid}-{timestamp}` style template.
//! - [`section`] and [`profiled`] mark the calls the profiler records.

pub mod constants;
pub mod core;
pub mod models;
pub mod system;

pub use crate::core::{
    profile_scope::ProfileScope,
    profiled_call::{ProfiledCall, profile_function},
    profiler::{CallProfiler, Profiler, SectionGuard, is_profiling, profiled, section},
    timer::{Timer, TimerScope, TimerState},
};
pub use crate::models::{
    CaughtErrorPolicy, FunctionRecord, Outcome, ProfileOptions, ProfileStats, Routed,
    TimestampStyle,
};
pub use crate::system::stats_writer::ProfileError;

//! # Core Profiling Logic
//!
//! ## Modules
//!
//! - **`timer`**: The start/stop/reset stopwatch and its scope guard.
//! - **`profiler`**: The `Profiler` collaborator trait, the default `CallProfiler`
//!   and the `section` instrumentation it records.
//! - **`profiled_call`** and **`profile_scope`**: Run a function or a block under a
//!   fresh profiler and route its statistics when it ends.
//! - **`interpolator`**: Expands `{placeholder}` tokens in output names.
//! - **`config_loader`**: Reads and writes profiling options as TOML.

pub mod config_loader;
pub mod interpolator;
pub mod profile_scope;
pub mod profiled_call;
pub mod profiler;
pub mod timer;

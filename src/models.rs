// src/models.rs

//! Data models for collected statistics and profiling options.

use crate::constants::{
    DEFAULT_BLOCK_NAME_TEMPLATE, DEFAULT_FUNCTION_NAME_TEMPLATE, DEFAULT_OUTPUT_DIR,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// --- Statistics ---

/// Aggregated timing of one instrumented function over a profiling session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// The name the function was recorded under.
    pub name: String,
    /// Every call, recursive ones included.
    pub calls: u64,
    /// Calls that were not made while the same function was already on the stack.
    pub primitive_calls: u64,
    /// Time spent in the function itself, children excluded.
    pub total_time: Duration,
    /// Time spent in the function and everything it called.
    pub cumulative_time: Duration,
}

impl FunctionRecord {
    /// Creates an empty record for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: 0,
            primitive_calls: 0,
            total_time: Duration::ZERO,
            cumulative_time: Duration::ZERO,
        }
    }

    /// Own time per call, in seconds.
    pub fn total_per_call(&self) -> f64 {
        if self.calls == 0 {
            return 0.0;
        }
        self.total_time.as_secs_f64() / self.calls as f64
    }

    /// Cumulative time per primitive call, in seconds.
    pub fn cumulative_per_call(&self) -> f64 {
        if self.primitive_calls == 0 {
            return 0.0;
        }
        self.cumulative_time.as_secs_f64() / self.primitive_calls as f64
    }
}

/// The raw statistics collected by a profiler during one session.
///
/// This is what gets written to a dump file. The wrappers treat it as an
/// opaque blob; only [`ProfileStats::load`] reads it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileStats {
    /// The name of the profiled function or block.
    pub label: String,
    /// The id of the process that produced the statistics.
    pub pid: u32,
    /// Seconds since the Unix epoch at which collection was enabled.
    pub started_unix: u64,
    /// Wall-clock time the profiler was enabled for.
    pub wall_time: Duration,
    /// User CPU seconds consumed by the process while enabled.
    pub user_cpu_secs: f64,
    /// System CPU seconds consumed by the process while enabled.
    pub system_cpu_secs: f64,
    /// Per-function records, sorted by cumulative time, longest first.
    pub functions: Vec<FunctionRecord>,
}

impl ProfileStats {
    /// Creates an empty set of statistics for `label`.
    pub fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pid: std::process::id(),
            started_unix: 0,
            wall_time: Duration::ZERO,
            user_cpu_secs: 0.0,
            system_cpu_secs: 0.0,
            functions: Vec::new(),
        }
    }

    /// Total number of recorded calls.
    pub fn total_calls(&self) -> u64 {
        self.functions.iter().map(|f| f.calls).sum()
    }

    /// Total number of non-recursive calls.
    pub fn primitive_calls(&self) -> u64 {
        self.functions.iter().map(|f| f.primitive_calls).sum()
    }

    /// Looks up the record for a function by name.
    pub fn function(&self, name: &str) -> Option<&FunctionRecord> {
        self.functions.iter().find(|f| f.name == name)
    }
}

// --- Options ---

/// What a profiling wrapper does with an error it was configured to catch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaughtErrorPolicy {
    /// Hand the error back to the caller as `Err` once teardown has run.
    #[default]
    Reraise,
    /// Swallow the error and return it as [`Outcome::Caught`].
    ReturnAsValue,
}

/// How the `{timestamp}` placeholder is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampStyle {
    /// `20240131_235959`
    #[default]
    Compact,
    /// `2024-01-31_23:59:59.123456`
    Extended,
}

/// Options shared by the function and block profiling wrappers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileOptions {
    /// Dump the statistics to a file instead of printing them.
    pub write_to_disk: bool,
    /// Directory template. If the resolved directory does not exist the
    /// statistics are printed instead.
    pub output_dir: String,
    /// File name template. The dump extension is appended to it.
    pub output_name: String,
    /// Rendering of the `{timestamp}` placeholder.
    pub timestamp: TimestampStyle,
    /// Print the statistics even when they were written to disk.
    pub echo: bool,
    /// What to do with an error that the wrapper catches.
    pub on_caught_error: CaughtErrorPolicy,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            write_to_disk: true,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            output_name: DEFAULT_FUNCTION_NAME_TEMPLATE.to_string(),
            timestamp: TimestampStyle::Compact,
            echo: false,
            on_caught_error: CaughtErrorPolicy::Reraise,
        }
    }
}

impl ProfileOptions {
    /// Defaults for profiling a block of code: print only, always echo.
    pub fn block() -> Self {
        Self {
            write_to_disk: false,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            output_name: DEFAULT_BLOCK_NAME_TEMPLATE.to_string(),
            timestamp: TimestampStyle::Extended,
            echo: true,
            on_caught_error: CaughtErrorPolicy::Reraise,
        }
    }

    /// Options that only print to the console.
    pub fn console() -> Self {
        Self {
            write_to_disk: false,
            ..Self::default()
        }
    }

    /// Sets `write_to_disk` and the directory template.
    pub fn write_to(mut self, dir: impl Into<String>) -> Self {
        self.write_to_disk = true;
        self.output_dir = dir.into();
        self
    }

    /// Sets the file name template.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Sets the caught-error policy.
    pub fn on_caught_error(mut self, policy: CaughtErrorPolicy) -> Self {
        self.on_caught_error = policy;
        self
    }
}

// --- Results ---

/// The value a profiled call hands back when it does not propagate an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The work returned normally.
    Completed(T),
    /// The work failed with a caught error and the policy was
    /// [`CaughtErrorPolicy::ReturnAsValue`].
    Caught(E),
}

impl<T, E> Outcome<T, E> {
    /// Converts back into a plain `Result`.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Caught(err) => Err(err),
        }
    }

    /// Whether the work failed with a caught error.
    pub fn is_caught(&self) -> bool {
        matches!(self, Self::Caught(_))
    }

    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Caught(_) => None,
        }
    }
}

/// Where a session's statistics ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Dumped to this file.
    Disk(PathBuf),
    /// Printed to the console, as requested.
    Console,
    /// Meant for this file, printed to the console instead.
    Fallback(PathBuf),
}

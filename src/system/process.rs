// src/system/process.rs

//! Process facts: pid, working directory, clocks and CPU counters.

use crate::models::TimestampStyle;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

const COMPACT_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");
const EXTENDED_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]_[hour]:[minute]:[second].[subsecond digits:6]"
);

/// Clock ticks per second for `/proc/self/stat`. `sysconf(_SC_CLK_TCK)` is 100
/// on every mainstream Linux configuration.
const CLOCK_TICKS_PER_SEC: f64 = 100.0;

/// The id of the current process.
pub fn pid() -> u32 {
    std::process::id()
}

/// The current working directory in its simplest form, or `.` if it cannot be read.
pub fn current_dir() -> PathBuf {
    match std::env::current_dir() {
        Ok(dir) => dunce::simplified(&dir).to_path_buf(),
        Err(e) => {
            log::warn!("Could not read the current working directory: {}", e);
            PathBuf::from(".")
        }
    }
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Renders the current local time in the requested style.
/// Falls back to UTC when the local offset cannot be determined.
pub fn timestamp(style: TimestampStyle) -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let format = match style {
        TimestampStyle::Compact => COMPACT_FORMAT,
        TimestampStyle::Extended => EXTENDED_FORMAT,
    };
    now.format(format).unwrap_or_else(|e| {
        log::warn!("Could not format timestamp: {}", e);
        now.unix_timestamp().to_string()
    })
}

/// A snapshot of the CPU time the process has consumed so far.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimes {
    /// User-mode seconds.
    pub user: f64,
    /// Kernel-mode seconds.
    pub system: f64,
}

impl CpuTimes {
    /// Reads the process CPU counters. On platforms without `/proc` both read as zero.
    pub fn now() -> Self {
        fs::read_to_string("/proc/self/stat")
            .ok()
            .and_then(|stat| parse_proc_stat(&stat))
            .unwrap_or_default()
    }

    /// The CPU time consumed between `earlier` and `self`.
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            user: (self.user - earlier.user).max(0.0),
            system: (self.system - earlier.system).max(0.0),
        }
    }
}

/// Extracts `utime` and `stime` from the contents of `/proc/self/stat`.
fn parse_proc_stat(stat: &str) -> Option<CpuTimes> {
    // The command name is parenthesised and may contain spaces, so count
    // fields from the closing parenthesis. utime and stime are fields 14
    // and 15, i.e. the 12th and 13th after the name.
    let after_name = stat.rsplit_once(')')?.1;
    let mut fields = after_name.split_whitespace().skip(11);
    let utime: f64 = fields.next()?.parse().ok()?;
    let stime: f64 = fields.next()?.parse().ok()?;
    Some(CpuTimes {
        user: utime / CLOCK_TICKS_PER_SEC,
        system: stime / CLOCK_TICKS_PER_SEC,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proc_stat_with_spaces_in_name() {
        let stat = "4242 (my prog) S 1 4242 4242 0 -1 4194560 100 0 0 0 250 50 0 0 20 0 1 0";
        let cpu = parse_proc_stat(stat).unwrap();
        assert!((cpu.user - 2.5).abs() < f64::EPSILON);
        assert!((cpu.system - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_proc_stat_rejects_truncated_input() {
        assert!(parse_proc_stat("4242 (prog) S 1 2").is_none());
        assert!(parse_proc_stat("garbage").is_none());
    }

    #[test]
    fn test_cpu_times_since_never_negative() {
        let later = CpuTimes { user: 1.0, system: 0.0 };
        let earlier = CpuTimes { user: 2.0, system: 0.5 };
        assert_eq!(later.since(&earlier), CpuTimes::default());
    }

    #[test]
    fn test_timestamp_styles() {
        let compact = timestamp(TimestampStyle::Compact);
        assert_eq!(compact.len(), "20240131_235959".len());
        assert_eq!(compact.chars().nth(8), Some('_'));

        let extended = timestamp(TimestampStyle::Extended);
        assert_eq!(extended.len(), "2024-01-31_23:59:59.123456".len());
        assert!(!extended.contains(' '));
    }

    #[test]
    fn test_current_dir_exists() {
        assert!(current_dir().is_dir());
    }
}

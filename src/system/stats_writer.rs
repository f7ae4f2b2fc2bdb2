//! # Statistics Output
//!
//! Dumps are bincode-encoded and LZ4-compressed with the uncompressed size
//! prepended. Console output is a plain-text table of the top functions.

use crate::{
    constants::{DUMP_EXTENSION, MAX_PRINTED_ROWS},
    core::interpolator::PlaceholderContext,
    models::{FunctionRecord, ProfileOptions, ProfileStats, Routed},
};
use colored::Colorize;
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors raised while writing or reading a profile dump.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// Reading or writing the dump failed.
    #[error("Filesystem Error: {0}")]
    Io(#[from] io::Error),
    /// The temporary file could not be moved into place.
    #[error("Error with temporary file: {0}")]
    TempFile(#[from] tempfile::PersistError),
    /// The statistics could not be encoded.
    #[error("Failed to serialize profile statistics: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    /// The dump does not decode to statistics.
    #[error("Failed to deserialize profile statistics: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    /// The dump is not valid LZ4 data.
    #[error("Failed to decompress profile dump: {0}. It might be corrupt.")]
    Decompress(#[from] lz4_flex::block::DecompressError),
    /// The dump file has no content.
    #[error("Profile dump '{0}' is empty.")]
    EmptyDump(PathBuf),
}

impl ProfileStats {
    /// Reads statistics back from a dump written by [`dump`].
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        load(path)
    }
}

/// Serializes `stats` into a compressed dump at `path`.
///
/// The bytes are written to a temporary file next to `path` and moved into
/// place, so a reader never observes a half-written dump.
pub fn dump(stats: &ProfileStats, path: &Path) -> Result<(), ProfileError> {
    let raw = bincode::serde::encode_to_vec(stats, bincode::config::standard())?;
    log::trace!("Serialized profile '{}' to {} bytes.", stats.label, raw.len());

    let compressed = lz4_flex::compress_prepend_size(&raw);
    log::trace!("Compressed profile to {} bytes.", compressed.len());

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(&compressed)?;
    temp.flush()?;
    temp.persist(path)?;
    Ok(())
}

/// Reads a dump written by [`dump`].
pub fn load(path: &Path) -> Result<ProfileStats, ProfileError> {
    let compressed = fs::read(path)?;
    if compressed.is_empty() {
        return Err(ProfileError::EmptyDump(path.to_path_buf()));
    }
    let raw = lz4_flex::decompress_size_prepended(&compressed)?;
    let (stats, _): (ProfileStats, usize) =
        bincode::serde::decode_from_slice(&raw, bincode::config::standard())?;
    Ok(stats)
}

/// Writes a human-readable table of `stats` to `out`.
pub fn print(stats: &ProfileStats, out: &mut dyn Write) -> io::Result<()> {
    let primitive = stats.primitive_calls();
    writeln!(
        out,
        "\n{} {}",
        format!("Profile of '{}'", stats.label).bold(),
        format!("(pid {})", stats.pid).dimmed()
    )?;
    writeln!(
        out,
        "         {} function calls ({} primitive call{}) in {:.6} seconds",
        stats.total_calls(),
        primitive,
        if primitive == 1 { "" } else { "s" },
        stats.wall_time.as_secs_f64()
    )?;
    writeln!(
        out,
        "         CPU: {:.3}s user, {:.3}s system",
        stats.user_cpu_secs, stats.system_cpu_secs
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "{:>10} {:>10} {:>10} {:>10} {:>10}  function",
        "ncalls", "tottime", "percall", "cumtime", "percall"
    )?;
    for record in stats.functions.iter().take(MAX_PRINTED_ROWS) {
        writeln!(out, "{}", format_row(record))?;
    }
    if stats.functions.len() > MAX_PRINTED_ROWS {
        writeln!(
            out,
            "{}",
            format!("  ... {} more", stats.functions.len() - MAX_PRINTED_ROWS).dimmed()
        )?;
    }
    writeln!(out)?;
    Ok(())
}

fn format_row(record: &FunctionRecord) -> String {
    let ncalls = if record.calls == record.primitive_calls {
        record.calls.to_string()
    } else {
        format!("{}/{}", record.calls, record.primitive_calls)
    };
    format!(
        "{:>10} {:>10.6} {:>10.6} {:>10.6} {:>10.6}  {}",
        ncalls,
        record.total_time.as_secs_f64(),
        record.total_per_call(),
        record.cumulative_time.as_secs_f64(),
        record.cumulative_per_call(),
        record.name
    )
}

/// Resolves the dump path for `options` without touching the filesystem.
pub fn dump_path(options: &ProfileOptions, context: &PlaceholderContext) -> (PathBuf, PathBuf) {
    let dir = PathBuf::from(context.expand_dir(&options.output_dir));
    let name = context.expand(&options.output_name);
    let file = dir.join(format!("{}.{}", name, DUMP_EXTENSION));
    (dir, file)
}

/// Sends `stats` where `options` ask for.
///
/// Writing to disk never fails the caller: a missing directory or a failed
/// dump is logged and the statistics are printed to `out` instead.
pub fn route(
    stats: &ProfileStats,
    options: &ProfileOptions,
    context: &PlaceholderContext,
    out: &mut dyn Write,
) -> Routed {
    let routed = if options.write_to_disk {
        let (dir, file) = dump_path(options, context);
        if !dir.is_dir() {
            log::warn!(
                "Profile directory '{}' does not exist. Printing statistics instead.",
                dir.display()
            );
            Routed::Fallback(file)
        } else {
            match dump(stats, &file) {
                Ok(()) => {
                    log::info!("Profile of '{}' written to '{}'", stats.label, file.display());
                    Routed::Disk(file)
                }
                Err(e) => {
                    log::warn!(
                        "Could not write profile to '{}': {}. Printing statistics instead.",
                        file.display(),
                        e
                    );
                    Routed::Fallback(file)
                }
            }
        }
    } else {
        Routed::Console
    };

    let wrote_to_disk = matches!(routed, Routed::Disk(_));
    if !wrote_to_disk || options.echo {
        if let Err(e) = print(stats, out) {
            log::warn!("Could not print profile statistics: {}", e);
        }
    }
    routed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimestampStyle;
    use std::time::Duration;
    use tempfile::tempdir;

    fn sample_stats() -> ProfileStats {
        let mut stats = ProfileStats::empty("sample");
        stats.wall_time = Duration::from_millis(12);
        stats.functions = vec![
            FunctionRecord {
                name: "walk".to_string(),
                calls: 4,
                primitive_calls: 1,
                total_time: Duration::from_millis(3),
                cumulative_time: Duration::from_millis(10),
            },
            FunctionRecord {
                name: "leaf".to_string(),
                calls: 2,
                primitive_calls: 2,
                total_time: Duration::from_millis(7),
                cumulative_time: Duration::from_millis(7),
            },
        ];
        stats
    }

    fn context_for(dir: &Path) -> PlaceholderContext {
        PlaceholderContext::new("sample", TimestampStyle::Compact).with_cwd(dir)
    }

    #[test]
    fn test_dump_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.prof");
        let stats = sample_stats();

        dump(&stats, &path).unwrap();
        assert_eq!(ProfileStats::load(&path).unwrap(), stats);
    }

    #[test]
    fn test_load_rejects_empty_and_corrupt_dumps() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty.prof");
        fs::write(&empty, b"").unwrap();
        assert!(matches!(load(&empty), Err(ProfileError::EmptyDump(_))));

        let corrupt = dir.path().join("corrupt.prof");
        fs::write(&corrupt, b"\x05\x00\x00\x00abc").unwrap();
        assert!(load(&corrupt).is_err());
    }

    #[test]
    fn test_print_formats_table() {
        let mut out = Vec::new();
        print(&sample_stats(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("6 function calls (3 primitive calls) in 0.012000 seconds"));
        assert!(text.contains("ncalls"));
        assert!(text.contains("4/1"));
        assert!(text.contains("leaf"));
    }

    #[test]
    fn test_route_to_console() {
        let dir = tempdir().unwrap();
        let mut out = Vec::new();
        let routed = route(
            &sample_stats(),
            &ProfileOptions::console(),
            &context_for(dir.path()),
            &mut out,
        );
        assert_eq!(routed, Routed::Console);
        assert!(!out.is_empty());
    }

    #[test]
    fn test_route_to_disk_is_silent_without_echo() {
        let dir = tempdir().unwrap();
        let options = ProfileOptions::default().named("{funcname}-{pid}");
        let mut out = Vec::new();

        let routed = route(&sample_stats(), &options, &context_for(dir.path()), &mut out);

        let expected = dir
            .path()
            .join(format!("sample-{}.{}", std::process::id(), DUMP_EXTENSION));
        assert_eq!(routed, Routed::Disk(expected.clone()));
        assert!(expected.is_file());
        assert!(out.is_empty());
    }

    #[test]
    fn test_route_echo_prints_as_well() {
        let dir = tempdir().unwrap();
        let mut options = ProfileOptions::default().named("echoed");
        options.echo = true;
        let mut out = Vec::new();

        let routed = route(&sample_stats(), &options, &context_for(dir.path()), &mut out);
        assert!(matches!(routed, Routed::Disk(_)));
        assert!(!out.is_empty());
    }

    #[test]
    fn test_route_falls_back_when_directory_is_missing() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let options = ProfileOptions::default()
            .write_to(missing.to_string_lossy())
            .named("lost");
        let mut out = Vec::new();

        let routed = route(&sample_stats(), &options, &context_for(dir.path()), &mut out);

        assert_eq!(routed, Routed::Fallback(missing.join("lost.prof")));
        assert!(!missing.exists());
        assert!(String::from_utf8(out).unwrap().contains("function calls"));
    }
}

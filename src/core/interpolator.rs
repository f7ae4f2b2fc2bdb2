//! Expansion of `{funcname}`, `{pid}`, `{cwd}` and `{timestamp}` in output
//! directory and file name templates.

use crate::{models::TimestampStyle, system::process};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{([A-Za-z_]+)\}").expect("placeholder pattern is valid");
}

type Resolver = fn(&PlaceholderContext) -> String;

/// Every placeholder an output template understands.
const PLACEHOLDERS: &[(&str, Resolver)] = &[
    ("funcname", resolve_funcname),
    ("pid", resolve_pid),
    ("cwd", resolve_cwd),
    ("timestamp", resolve_timestamp),
];

fn resolve_funcname(ctx: &PlaceholderContext) -> String {
    ctx.funcname.clone()
}

fn resolve_pid(ctx: &PlaceholderContext) -> String {
    ctx.pid.to_string()
}

fn resolve_cwd(ctx: &PlaceholderContext) -> String {
    ctx.cwd.to_string_lossy().into_owned()
}

fn resolve_timestamp(ctx: &PlaceholderContext) -> String {
    ctx.timestamp.clone()
}

/// The values available to `{...}` placeholders, captured once per call.
#[derive(Debug, Clone)]
pub struct PlaceholderContext {
    funcname: String,
    pid: u32,
    cwd: PathBuf,
    timestamp: String,
}

impl PlaceholderContext {
    /// Captures the process id, working directory and current time for a call to `funcname`.
    pub fn new(funcname: impl Into<String>, style: TimestampStyle) -> Self {
        Self {
            funcname: funcname.into(),
            pid: process::pid(),
            cwd: process::current_dir(),
            timestamp: process::timestamp(style),
        }
    }

    /// Replaces the captured working directory.
    pub fn with_cwd(mut self, cwd: &Path) -> Self {
        self.cwd = cwd.to_path_buf();
        self
    }

    /// Replaces the captured timestamp.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Substitutes every known `{name}` placeholder in `template`.
    /// Unknown placeholders are left as they are.
    pub fn expand(&self, template: &str) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures<'_>| {
                let whole = caps.get(0).map_or("", |m| m.as_str());
                let key = caps.get(1).map_or("", |m| m.as_str());
                match PLACEHOLDERS.iter().find(|(name, _)| *name == key) {
                    Some((_, resolve)) => resolve(self),
                    None => {
                        log::trace!("Leaving unknown placeholder '{}' untouched", whole);
                        whole.to_string()
                    }
                }
            })
            .into_owned()
    }

    /// Like [`expand`](Self::expand), then expands a leading `~` to the home directory.
    pub fn expand_dir(&self, template: &str) -> String {
        let expanded = self.expand(template);
        shellexpand::tilde(&expanded).into_owned()
    }
}

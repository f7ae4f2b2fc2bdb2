//! # Call-Stack Profiler
//!
//! The profiling wrappers only need a collaborator that can be switched on and
//! off and asked for its statistics afterwards. That contract is the
//! [`Profiler`] trait.
//!
//! [`CallProfiler`] is the default collaborator: a deterministic profiler that
//! records every [`section`] entered on its thread while it is enabled. Each
//! enabled profiler registers itself in a thread-local stack; sections always
//! record into the innermost one, so nested sessions do not interfere.

use crate::{
    core::timer::Timer,
    models::{FunctionRecord, ProfileStats},
    system::{
        process::{self, CpuTimes},
        stats_writer::{self, ProfileError},
    },
};
use std::{
    cell::RefCell,
    collections::HashMap,
    io::{self, Write},
    path::Path,
    rc::{Rc, Weak},
    time::{Duration, Instant},
};

thread_local! {
    static ACTIVE: RefCell<Vec<Rc<RefCell<Recorder>>>> = const { RefCell::new(Vec::new()) };
}

/// The collaborator contract used by the profiling wrappers.
///
/// Wrappers create a fresh instance with `Default` for every call and never
/// share one between calls.
pub trait Profiler: Default {
    /// Starts collecting.
    fn enable(&mut self);

    /// Stops collecting. Must be safe to call more than once.
    fn disable(&mut self);

    /// Whether collection is currently on.
    fn is_enabled(&self) -> bool;

    /// The statistics gathered so far, labelled with `label`.
    fn stats(&self, label: &str) -> ProfileStats;

    /// Writes the statistics to `path` as an opaque dump.
    fn dump_stats(&self, label: &str, path: &Path) -> Result<(), ProfileError> {
        stats_writer::dump(&self.stats(label), path)
    }

    /// Writes a human-readable summary of the statistics to `out`.
    fn print_stats(&self, label: &str, out: &mut dyn Write) -> io::Result<()> {
        stats_writer::print(&self.stats(label), out)
    }
}

#[derive(Debug)]
struct Frame {
    id: u64,
    name: String,
    started: Instant,
    children: Duration,
}

/// Call-stack bookkeeping shared between a profiler and its open sections.
#[derive(Debug, Default)]
struct Recorder {
    stack: Vec<Frame>,
    functions: HashMap<String, FunctionRecord>,
    next_id: u64,
}

impl Recorder {
    /// Opens a frame and returns its depth and id.
    fn enter(&mut self, name: &str) -> (usize, u64) {
        let depth = self.stack.len();
        let id = self.next_id;
        self.next_id += 1;
        self.stack.push(Frame {
            id,
            name: name.to_string(),
            started: Instant::now(),
            children: Duration::ZERO,
        });
        (depth, id)
    }

    /// Closes the frame `id` and everything above it, if it is still open
    /// at `depth`. Frames from a later session never match.
    fn close(&mut self, depth: usize, id: u64) {
        if self.stack.get(depth).is_some_and(|frame| frame.id == id) {
            self.exit_to(depth);
        }
    }

    /// Closes frames until only `depth` remain.
    fn exit_to(&mut self, depth: usize) {
        let now = Instant::now();
        while self.stack.len() > depth {
            self.pop_frame(now);
        }
    }

    fn pop_frame(&mut self, now: Instant) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let elapsed = now.saturating_duration_since(frame.started);
        if let Some(parent) = self.stack.last_mut() {
            parent.children += elapsed;
        }

        let recursive = self.stack.iter().any(|f| f.name == frame.name);
        let record = self
            .functions
            .entry(frame.name)
            .or_insert_with_key(|name| FunctionRecord::new(name.as_str()));
        record.calls += 1;
        record.total_time += elapsed.saturating_sub(frame.children);
        // Cumulative time is only counted at the outermost call of a
        // recursive chain, otherwise it would be counted twice.
        if !recursive {
            record.primitive_calls += 1;
            record.cumulative_time += elapsed;
        }
    }
}

/// Deterministic profiler over explicitly instrumented [`section`]s.
#[derive(Debug, Default)]
pub struct CallProfiler {
    recorder: Rc<RefCell<Recorder>>,
    session: Timer,
    wall_time: Duration,
    cpu_at_enable: CpuTimes,
    cpu_time: CpuTimes,
    started_unix: u64,
    enabled: bool,
}

impl CallProfiler {
    /// Creates a disabled profiler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Profiler for CallProfiler {
    fn enable(&mut self) {
        if self.enabled {
            return;
        }
        let recorder = Rc::clone(&self.recorder);
        ACTIVE.with(|active| active.borrow_mut().push(recorder));
        if self.started_unix == 0 {
            self.started_unix = process::unix_now();
        }
        self.cpu_at_enable = CpuTimes::now();
        self.session.reset(true);
        self.enabled = true;
        log::debug!("Profiler enabled");
    }

    fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.wall_time += self.session.elapsed();
        let cpu = CpuTimes::now().since(&self.cpu_at_enable);
        self.cpu_time.user += cpu.user;
        self.cpu_time.system += cpu.system;

        if let Ok(mut recorder) = self.recorder.try_borrow_mut() {
            recorder.exit_to(0);
        }
        let this = &self.recorder;
        // The registry may already be gone if this runs during thread teardown.
        let _ = ACTIVE.try_with(|active| {
            if let Ok(mut active) = active.try_borrow_mut() {
                active.retain(|r| !Rc::ptr_eq(r, this));
            }
        });
        log::debug!(
            "Profiler disabled after {:.6}s",
            self.wall_time.as_secs_f64()
        );
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn stats(&self, label: &str) -> ProfileStats {
        let mut functions: Vec<FunctionRecord> = self
            .recorder
            .try_borrow()
            .map(|r| r.functions.values().cloned().collect())
            .unwrap_or_default();
        functions.sort_by(|a, b| {
            b.cumulative_time
                .cmp(&a.cumulative_time)
                .then_with(|| a.name.cmp(&b.name))
        });

        ProfileStats {
            label: label.to_string(),
            pid: process::pid(),
            started_unix: self.started_unix,
            wall_time: self.wall_time,
            user_cpu_secs: self.cpu_time.user,
            system_cpu_secs: self.cpu_time.system,
            functions,
        }
    }
}

impl Drop for CallProfiler {
    fn drop(&mut self) {
        self.disable();
    }
}

/// Guard for one call recorded by [`section`]. The call ends when it is dropped.
#[derive(Debug)]
#[must_use = "the section ends as soon as the guard is dropped"]
pub struct SectionGuard {
    target: Option<(Weak<RefCell<Recorder>>, usize, u64)>,
}

impl Drop for SectionGuard {
    fn drop(&mut self) {
        let Some((recorder, depth, id)) = self.target.take() else {
            return;
        };
        if let Some(recorder) = recorder.upgrade() {
            if let Ok(mut recorder) = recorder.try_borrow_mut() {
                recorder.close(depth, id);
            }
        }
    }
}

/// Records a call of `name` into the innermost enabled [`CallProfiler`] on
/// this thread, lasting until the returned guard is dropped.
///
/// Without an enabled profiler this does nothing.
pub fn section(name: &str) -> SectionGuard {
    let target = ACTIVE
        .try_with(|active| active.borrow().last().cloned())
        .ok()
        .flatten()
        .and_then(|recorder| {
            let (depth, id) = recorder.try_borrow_mut().ok()?.enter(name);
            Some((Rc::downgrade(&recorder), depth, id))
        });
    SectionGuard { target }
}

/// Runs `f` as a [`section`] named `name`.
pub fn profiled<T>(name: &str, f: impl FnOnce() -> T) -> T {
    let _section = section(name);
    f()
}

/// Whether an enabled [`CallProfiler`] is collecting on this thread.
pub fn is_profiling() -> bool {
    ACTIVE
        .try_with(|active| !active.borrow().is_empty())
        .unwrap_or(false)
}

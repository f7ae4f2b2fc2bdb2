//! Profiling a block of code until the end of its scope.

use crate::{
    core::{
        interpolator::PlaceholderContext,
        profiler::{self, CallProfiler, Profiler, SectionGuard},
    },
    models::{ProfileOptions, Routed},
    system::stats_writer,
};
use std::{
    fmt,
    io::{self, Write},
};

/// Profiles everything that runs until it is dropped or [`finish`](Self::finish)ed.
///
/// ```no_run
/// use proftime::{ProfileOptions, ProfileScope};
///
/// {
///     let _profile = ProfileScope::enter("startup", ProfileOptions::block());
///     // ... code to measure ...
/// } // statistics are printed here
/// ```
pub struct ProfileScope<'a> {
    label: String,
    options: ProfileOptions,
    context: PlaceholderContext,
    profiler: CallProfiler,
    root: Option<SectionGuard>,
    out: Box<dyn Write + 'a>,
    routed: Option<Routed>,
}

impl fmt::Debug for ProfileScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileScope")
            .field("label", &self.label)
            .field("options", &self.options)
            .field("profiler", &self.profiler)
            .field("routed", &self.routed)
            .finish_non_exhaustive()
    }
}

impl ProfileScope<'static> {
    /// Starts profiling the current scope, printing to standard output.
    pub fn enter(label: impl Into<String>, options: ProfileOptions) -> Self {
        Self::enter_to(label, options, io::stdout())
    }
}

impl<'a> ProfileScope<'a> {
    /// Starts profiling the current scope. Console output goes to `out`.
    pub fn enter_to(
        label: impl Into<String>,
        options: ProfileOptions,
        out: impl Write + 'a,
    ) -> Self {
        let label = label.into();
        let context = PlaceholderContext::new(&label, options.timestamp);
        let mut collaborator = CallProfiler::new();
        collaborator.enable();
        let root = Some(profiler::section(&label));
        log::debug!("Entered profile scope '{}'", label);
        Self {
            label,
            options,
            context,
            profiler: collaborator,
            root,
            out: Box::new(out),
            routed: None,
        }
    }

    /// Ends the scope now and reports where the statistics went.
    pub fn finish(mut self) -> Routed {
        self.teardown()
    }

    fn teardown(&mut self) -> Routed {
        if let Some(routed) = &self.routed {
            return routed.clone();
        }
        drop(self.root.take());
        self.profiler.disable();
        let stats = self.profiler.stats(&self.label);
        let routed = stats_writer::route(&stats, &self.options, &self.context, &mut self.out);
        log::debug!(
            "Left profile scope '{}', routed to {:?}",
            self.label,
            routed
        );
        self.routed = Some(routed.clone());
        routed
    }
}

impl Drop for ProfileScope<'_> {
    fn drop(&mut self) {
        self.teardown();
    }
}

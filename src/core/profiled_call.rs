//! Profiling wrapper for a single function call.

use crate::{
    core::{
        interpolator::PlaceholderContext,
        profiler::{self, CallProfiler, Profiler},
    },
    models::{CaughtErrorPolicy, Outcome, ProfileOptions},
    system::stats_writer,
};
use std::{
    fmt,
    io::{self, Write},
    marker::PhantomData,
};

/// Profiles a fallible unit of work with a fresh profiler per call.
///
/// Teardown (disabling the profiler and routing its statistics) runs on every
/// exit path: success, caught error, uncaught error and panic. The error
/// predicate set with [`catching`](Self::catching) only decides what the
/// caller gets back afterwards.
pub struct ProfiledCall<E, P = CallProfiler> {
    name: String,
    options: ProfileOptions,
    catches: Box<dyn Fn(&E) -> bool>,
    _profiler: PhantomData<fn() -> P>,
}

impl<E, P> fmt::Debug for ProfiledCall<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfiledCall")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E> ProfiledCall<E> {
    /// Creates a wrapper for the function `name`, backed by a [`CallProfiler`].
    /// Every error is caught until [`catching`](Self::catching) narrows it down.
    pub fn new(name: impl Into<String>, options: ProfileOptions) -> Self {
        Self {
            name: name.into(),
            options,
            catches: Box::new(|_: &E| true),
            _profiler: PhantomData,
        }
    }
}

impl<E, P: Profiler> ProfiledCall<E, P> {
    /// Swaps the profiler collaborator.
    pub fn with_profiler<Q: Profiler>(self) -> ProfiledCall<E, Q> {
        ProfiledCall {
            name: self.name,
            options: self.options,
            catches: self.catches,
            _profiler: PhantomData,
        }
    }

    /// Only errors for which `predicate` holds are handled by the
    /// caught-error policy. Others are returned as `Err` after teardown.
    pub fn catching(mut self, predicate: impl Fn(&E) -> bool + 'static) -> Self {
        self.catches = Box::new(predicate);
        self
    }

    /// Sets what happens to a caught error.
    pub fn policy(mut self, policy: CaughtErrorPolicy) -> Self {
        self.options.on_caught_error = policy;
        self
    }

    /// The name statistics are recorded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The options in effect.
    pub fn options(&self) -> &ProfileOptions {
        &self.options
    }

    /// Runs `work` under the profiler, printing to standard output.
    pub fn run<T>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<Outcome<T, E>, E> {
        self.run_to(&mut io::stdout(), work)
    }

    /// Runs `work` under the profiler. Console output goes to `out`.
    pub fn run_to<T, W: Write>(
        &self,
        out: &mut W,
        work: impl FnOnce() -> Result<T, E>,
    ) -> Result<Outcome<T, E>, E> {
        let context = PlaceholderContext::new(&self.name, self.options.timestamp);
        let mut collaborator = P::default();
        collaborator.enable();

        let session = scopeguard::guard(collaborator, |mut collaborator| {
            collaborator.disable();
            let stats = collaborator.stats(&self.name);
            let routed = stats_writer::route(&stats, &self.options, &context, out);
            log::debug!("Profile of '{}' routed to {:?}", self.name, routed);
        });

        let result = {
            let _root = profiler::section(&self.name);
            work()
        };
        drop(session);

        match result {
            Ok(value) => Ok(Outcome::Completed(value)),
            Err(err) if (self.catches)(&err) => match self.options.on_caught_error {
                CaughtErrorPolicy::Reraise => {
                    log::debug!("'{}' failed with a caught error; re-raising", self.name);
                    Err(err)
                }
                CaughtErrorPolicy::ReturnAsValue => {
                    log::debug!("'{}' failed with a caught error; returning it", self.name);
                    Ok(Outcome::Caught(err))
                }
            },
            Err(err) => {
                log::debug!("'{}' failed with an uncaught error", self.name);
                Err(err)
            }
        }
    }

    /// Turns the wrapper into a function that profiles every call of `f`.
    pub fn wrap<A, T>(
        self,
        f: impl Fn(A) -> Result<T, E>,
    ) -> impl Fn(A) -> Result<Outcome<T, E>, E> {
        move |arg| self.run(|| f(arg))
    }
}

/// Profiles one call of `work` as the function `name`.
pub fn profile_function<T, E>(
    name: &str,
    options: ProfileOptions,
    work: impl FnOnce() -> Result<T, E>,
) -> Result<Outcome<T, E>, E> {
    ProfiledCall::new(name, options).run(work)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::profiler::{is_profiling, profiled};
    use crate::models::ProfileStats;
    use std::cell::Cell;
    use std::panic::{self, AssertUnwindSafe};
    use tempfile::tempdir;

    thread_local! {
        static ENABLED: Cell<u32> = const { Cell::new(0) };
        static DISABLED: Cell<u32> = const { Cell::new(0) };
    }

    /// Counts enable/disable transitions on top of the real profiler.
    #[derive(Debug, Default)]
    struct CountingProfiler {
        inner: CallProfiler,
    }

    impl Profiler for CountingProfiler {
        fn enable(&mut self) {
            ENABLED.with(|c| c.set(c.get() + 1));
            self.inner.enable();
        }

        fn disable(&mut self) {
            if self.inner.is_enabled() {
                DISABLED.with(|c| c.set(c.get() + 1));
            }
            self.inner.disable();
        }

        fn is_enabled(&self) -> bool {
            self.inner.is_enabled()
        }

        fn stats(&self, label: &str) -> ProfileStats {
            self.inner.stats(label)
        }
    }

    fn disabled_count() -> u32 {
        DISABLED.with(Cell::get)
    }

    #[derive(Debug, PartialEq)]
    enum JobError {
        Retryable,
        Fatal,
    }

    fn counting(options: ProfileOptions) -> ProfiledCall<JobError, CountingProfiler> {
        ProfiledCall::new("job", options).with_profiler::<CountingProfiler>()
    }

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_console_run_returns_value_unchanged() {
        init_logger();
        let mut out = Vec::new();
        let call = ProfiledCall::<JobError>::new("noop", ProfileOptions::console());

        let result = call.run_to(&mut out, || Ok("value"));

        assert_eq!(result, Ok(Outcome::Completed("value")));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("function calls"));
        assert!(text.contains("noop"));
    }

    #[test]
    fn test_run_dumps_sections_to_disk() {
        init_logger();
        let dir = tempdir().unwrap();
        let options = ProfileOptions::default()
            .write_to(dir.path().to_string_lossy())
            .named("{funcname}");
        let mut out = Vec::new();

        let result = ProfiledCall::<JobError>::new("crunch", options).run_to(&mut out, || {
            let total: u64 = (0..3).map(|i| profiled("step", || i * 2)).sum();
            Ok(total)
        });

        assert_eq!(result, Ok(Outcome::Completed(6)));
        assert!(out.is_empty());
        let stats = ProfileStats::load(&dir.path().join("crunch.prof")).unwrap();
        assert_eq!(stats.label, "crunch");
        assert_eq!(stats.function("crunch").map(|f| f.calls), Some(1));
        assert_eq!(stats.function("step").map(|f| f.calls), Some(3));
    }

    #[test]
    fn test_caught_error_is_reraised_after_teardown() {
        let mut out = Vec::new();
        let call = counting(ProfileOptions::console());

        let result: Result<Outcome<(), _>, _> = call.run_to(&mut out, || Err(JobError::Retryable));

        assert_eq!(result, Err(JobError::Retryable));
        assert_eq!(disabled_count(), 1);
        assert!(!is_profiling());
        assert!(!out.is_empty());
    }

    #[test]
    fn test_caught_error_can_be_returned_as_value() {
        let mut out = Vec::new();
        let call = counting(ProfileOptions::console()).policy(CaughtErrorPolicy::ReturnAsValue);

        let result: Result<Outcome<(), _>, _> = call.run_to(&mut out, || Err(JobError::Retryable));

        assert_eq!(result, Ok(Outcome::Caught(JobError::Retryable)));
        assert_eq!(disabled_count(), 1);
    }

    #[test]
    fn test_uncaught_error_still_runs_teardown() {
        let mut out = Vec::new();
        let call = counting(ProfileOptions::console())
            .policy(CaughtErrorPolicy::ReturnAsValue)
            .catching(|e| *e == JobError::Retryable);

        let result: Result<Outcome<(), _>, _> = call.run_to(&mut out, || Err(JobError::Fatal));

        assert_eq!(result, Err(JobError::Fatal));
        assert_eq!(disabled_count(), 1);
        assert!(String::from_utf8(out).unwrap().contains("function calls"));
    }

    #[test]
    #[allow(clippy::panic)]
    fn test_panic_still_runs_teardown() {
        let mut out = Vec::new();
        let call = counting(ProfileOptions::console());

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            call.run_to(&mut out, || -> Result<(), JobError> { panic!("work exploded") })
        }));

        assert!(result.is_err());
        assert_eq!(disabled_count(), 1);
        assert!(!is_profiling());
        assert!(!out.is_empty());
    }

    #[test]
    fn test_missing_directory_falls_back_to_console() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let options = ProfileOptions::default()
            .write_to(missing.to_string_lossy())
            .named("{funcname}");
        let mut out = Vec::new();

        let result = ProfiledCall::<JobError>::new("fallback", options).run_to(&mut out, || Ok(1));

        assert_eq!(result, Ok(Outcome::Completed(1)));
        assert!(!missing.exists());
        assert!(String::from_utf8(out).unwrap().contains("function calls"));
    }

    #[test]
    fn test_wrap_uses_fresh_profiler_per_call() {
        let dir = tempdir().unwrap();
        let options = ProfileOptions::default()
            .write_to(dir.path().to_string_lossy())
            .named("{funcname}-{timestamp}");
        let double = counting(options).wrap(|x: u32| Ok(x * 2));

        assert_eq!(double(2), Ok(Outcome::Completed(4)));
        assert_eq!(double(5), Ok(Outcome::Completed(10)));
        assert_eq!(ENABLED.with(Cell::get), 2);
        assert_eq!(disabled_count(), 2);
    }

    #[test]
    fn test_profile_function_shorthand() {
        let result = profile_function("shorthand", ProfileOptions::console(), || {
            Ok::<_, JobError>(3)
        });
        assert_eq!(result.map(Outcome::completed), Ok(Some(3)));
    }
}

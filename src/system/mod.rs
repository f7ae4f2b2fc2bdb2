//! # System Interaction Layer
//!
//! The boundary between the profiling logic and the operating system.
//!
//! ## Modules
//!
//! - **`process`**: Facts about the running process read at call time: its id, the
//!   working directory, CPU counters from `/proc` and formatted local timestamps.
//! - **`stats_writer`**: Sends collected statistics to their destination. Dumps are
//!   bincode-encoded, LZ4-compressed and written atomically; console output is a
//!   plain-text table. A missing target directory degrades to console output.

pub mod process;
pub mod stats_writer;

// src/constants.rs

//! Defaults shared by the wrappers and the config loader.

/// The extension appended to every profile dump file.
pub const DUMP_EXTENSION: &str = "prof";

/// The default directory template for profile dumps: the current working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "{cwd}";

/// The default file name template used when profiling a function.
pub const DEFAULT_FUNCTION_NAME_TEMPLATE: &str = "{funcname}-{pid}-{timestamp}";

/// The default file name template used when profiling a block of code.
pub const DEFAULT_BLOCK_NAME_TEMPLATE: &str = "proftime-{timestamp}";

/// The conventional name of a profiling configuration file.
pub const CONFIG_FILENAME: &str = "proftime.toml";

/// How many rows `print_stats` shows before summarizing the rest.
pub const MAX_PRINTED_ROWS: usize = 40;

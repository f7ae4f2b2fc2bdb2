//! # Config Loader
//!
//! Reads [`ProfileOptions`] from the `[profile]` table of a TOML file, so
//! profiling can be tuned per project without touching code. Every key is
//! optional; missing keys take the function-profiling defaults.
//!
//! ```toml
//! [profile]
//! write_to_disk = true
//! output_dir = "{cwd}/profiles"
//! output_name = "{funcname}-{timestamp}"
//! timestamp = "extended"
//! on_caught_error = "return_as_value"
//! ```

use crate::{constants::CONFIG_FILENAME, models::ProfileOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    profile: ProfileOptions,
}

/// Parses profiling options from TOML text.
pub fn parse_options(content: &str) -> Result<ProfileOptions> {
    let file: ConfigFile =
        toml::from_str(content).context("Failed to parse the [profile] configuration")?;
    Ok(file.profile)
}

/// Loads profiling options from a TOML file.
pub fn load_options(path: &Path) -> Result<ProfileOptions> {
    log::debug!("Loading profile options from '{}'", path.display());
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_options(&content).with_context(|| format!("Invalid config file '{}'", path.display()))
}

/// Loads `proftime.toml` from `dir`, or returns the defaults if there is none.
pub fn load_options_in(dir: &Path) -> Result<ProfileOptions> {
    let path = dir.join(CONFIG_FILENAME);
    if !path.exists() {
        log::debug!(
            "No '{}' in '{}', using defaults",
            CONFIG_FILENAME,
            dir.display()
        );
        return Ok(ProfileOptions::default());
    }
    load_options(&path)
}

/// Writes `options` as a `[profile]` table to `path`.
pub fn save_options(path: &Path, options: &ProfileOptions) -> Result<()> {
    let file = ConfigFile {
        profile: options.clone(),
    };
    let content =
        toml::to_string_pretty(&file).context("Failed to serialize profile options to TOML")?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write config file '{}'", path.display()))?;
    Ok(())
}

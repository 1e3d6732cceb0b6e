//! Load `.mirrorcp.toml` (CLI only). Lib does not use this; the consuming program injects config via CopyOpts.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct MirrorcpToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    workers: Option<usize>,
    producers: Option<usize>,
    batch_size: Option<usize>,
    worker_batch_size: Option<usize>,
    queue_capacity: Option<usize>,
    verbose: Option<bool>,
    strict: Option<bool>,
    json: Option<bool>,
}

/// Default config location: `.mirrorcp.toml` in `dir`.
pub fn default_config_path(dir: &Path) -> PathBuf {
    dir.join(PackagePaths::get().config_filename())
}

/// Parse a config file body. Errors carry the toml diagnostic.
pub fn parse_mirrorcp_toml(s: &str) -> Result<MirrorcpToml, toml::de::Error> {
    toml::from_str(s)
}

/// Read and parse a config file. None if it cannot be read; Some(Err) if it is malformed.
pub fn read_mirrorcp_toml(path: &Path) -> Option<Result<MirrorcpToml, toml::de::Error>> {
    let s = std::fs::read_to_string(path).ok()?;
    Some(parse_mirrorcp_toml(&s))
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, Some $field:ident) => {
        if let Some(v) = $sec.$field {
            $opts.$field = Some(v);
        }
    };
    ($sec:expr, $opts:expr, $field:ident) => {
        if let Some(v) = $sec.$field {
            $opts.$field = v;
        }
    };
}

/// Apply file config to opts (only set fields present in the file). Call before applying CLI.
pub fn apply_file_to_opts(file: &MirrorcpToml, opts: &mut Opts) {
    let sec = &file.settings;
    apply_file_opt!(sec, opts, Some workers);
    apply_file_opt!(sec, opts, Some producers);
    apply_file_opt!(sec, opts, Some batch_size);
    apply_file_opt!(sec, opts, Some worker_batch_size);
    apply_file_opt!(sec, opts, Some queue_capacity);
    apply_file_opt!(sec, opts, verbose);
    apply_file_opt!(sec, opts, strict);
    apply_file_opt!(sec, opts, json);
}

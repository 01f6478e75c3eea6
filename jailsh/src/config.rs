//! Command line and environment configuration for the `jailsh` binary.
use clap::Parser;
use jail_path::{JailRoot, DEFAULT_MAX_PATH_LEN};
use std::path::PathBuf;

/// Jail root used when neither `--root` nor `JAILSH_ROOT` is given.
pub const DEFAULT_ROOT: &str = "/tmp/test";

/// SUMMARY:
/// Settings for one shell process. Each flag falls back to an environment variable, then to
/// a built-in default.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "jailsh")]
#[command(version, about = "A shell whose filesystem commands cannot leave one directory", long_about = None)]
pub struct Config {
    /// Jail root directory (created if absent)
    #[arg(long, env = "JAILSH_ROOT", default_value = DEFAULT_ROOT)]
    pub root: PathBuf,

    /// Longest candidate path accepted, in bytes
    #[arg(long, env = "JAILSH_MAX_PATH_LEN", default_value_t = DEFAULT_MAX_PATH_LEN, value_parser = parse_path_len)]
    pub max_path_len: usize,

    /// Octal permission bits for a jail root that has to be created
    #[arg(long, env = "JAILSH_ROOT_MODE", default_value = "700", value_parser = parse_mode)]
    pub root_mode: u32,

    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive)
    #[arg(long, env = "JAILSH_LOG", default_value = "warn")]
    pub log_level: String,
}

impl Config {
    /// SUMMARY:
    /// Establish the jail root: create it with `root_mode` if absent, canonicalize it, and
    /// apply the configured path length limit.
    ///
    /// ERRORS:
    /// - `JailError::InvalidRoot`: The root cannot be created or is not a directory.
    pub fn open_jail(&self) -> jail_path::Result<JailRoot> {
        let jail = JailRoot::try_new_create(&self.root, self.root_mode)?;
        Ok(jail.with_max_path_len(self.max_path_len))
    }
}

fn parse_path_len(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("not a byte count: {e}"))?;
    if n == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(n)
}

fn parse_mode(s: &str) -> Result<u32, String> {
    let digits = s.strip_prefix("0o").unwrap_or(s);
    let mode = u32::from_str_radix(digits, 8).map_err(|e| format!("not an octal mode: {e}"))?;
    if mode > 0o7777 {
        return Err(format!("mode {s} has bits above 0o7777"));
    }
    Ok(mode)
}

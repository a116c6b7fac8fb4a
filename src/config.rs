//! Configuration Module
//!
//! Handles loading the store configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::diagnostics::DiagnosticSink;

/// Environment variable holding the cache root directory.
pub const ENV_CACHE_DIR: &str = "DISK_CACHE_DIR";
/// Environment variable enabling gzip compression of stored entries.
pub const ENV_COMPRESS: &str = "DISK_CACHE_COMPRESS";

/// Store configuration parameters.
///
/// Fixed once a store is built from it.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory holding the shard directories
    pub root: PathBuf,
    /// Whether entries are gzip-compressed on disk
    pub compress: bool,
    /// Receives human-readable diagnostics
    pub debug: DiagnosticSink,
}

impl StoreConfig {
    /// Creates a config rooted at `root`, uncompressed, with a no-op sink.
    ///
    /// # Arguments
    /// * `root` - Directory holding the shard directories
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Creates a new StoreConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DISK_CACHE_DIR` - Cache root (default: `./cache`)
    /// - `DISK_CACHE_COMPRESS` - `1`, `true`, `yes` or `on` to enable gzip (default: off)
    pub fn from_env() -> Self {
        Self {
            root: env::var_os(ENV_CACHE_DIR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(default_root),
            compress: env::var(ENV_COMPRESS)
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            debug: DiagnosticSink::noop(),
        }
    }

    /// Enables or disables gzip compression of stored entries.
    ///
    /// # Arguments
    /// * `compress` - `true` stores gzip members, `false` stores raw bytes
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Sets the sink receiving diagnostic messages.
    ///
    /// # Arguments
    /// * `debug` - Sink invoked on write failures
    pub fn with_debug(mut self, debug: DiagnosticSink) -> Self {
        self.debug = debug;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            compress: false,
            debug: DiagnosticSink::noop(),
        }
    }
}

/// `<cwd>/cache`, falling back to a relative `cache` if the cwd is unreadable.
fn default_root() -> PathBuf {
    env::current_dir()
        .map(|cwd| cwd.join("cache"))
        .unwrap_or_else(|_| PathBuf::from("cache"))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = StoreConfig::default();
        assert!(config.root.ends_with("cache"));
        assert!(!config.compress);
        assert!(config.debug.is_noop());
    }

    #[test]
    fn test_config_builders() {
        let config = StoreConfig::new("/tmp/c").with_compress(true);
        assert_eq!(config.root, PathBuf::from("/tmp/c"));
        assert!(config.compress);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(parse_flag("On"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the env vars so parallel tests don't race.
        env::remove_var(ENV_CACHE_DIR);
        env::remove_var(ENV_COMPRESS);

        let config = StoreConfig::from_env();
        assert_eq!(config.root, default_root());
        assert!(!config.compress);

        env::set_var(ENV_CACHE_DIR, "/var/tmp/disk-cache");
        env::set_var(ENV_COMPRESS, "true");

        let config = StoreConfig::from_env();
        assert_eq!(config.root, PathBuf::from("/var/tmp/disk-cache"));
        assert!(config.compress);

        env::remove_var(ENV_CACHE_DIR);
        env::remove_var(ENV_COMPRESS);
    }
}

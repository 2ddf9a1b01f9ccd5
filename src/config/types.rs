// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
    #[serde(default)]
    pub preload: PreloadConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Static file serving configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StaticFilesConfig {
    /// Static root, relative to the working directory unless absolute
    pub root: String,
    /// Files tried, in order, when a directory is requested
    pub index_files: Vec<String>,
}

/// Module preload configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PreloadConfig {
    #[serde(default = "default_preload_enabled")]
    pub enabled: bool,
    /// File extensions (without the dot) that get a `link` header
    #[serde(default = "default_preload_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_follow_dynamic_imports")]
    pub follow_dynamic_imports: bool,
}

#[allow(clippy::missing_const_for_fn)]
fn default_preload_enabled() -> bool {
    true
}

fn default_preload_extensions() -> Vec<String> {
    vec!["js".to_string()]
}

#[allow(clippy::missing_const_for_fn)]
fn default_follow_dynamic_imports() -> bool {
    true
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            enabled: default_preload_enabled(),
            extensions: default_preload_extensions(),
            follow_dynamic_imports: default_follow_dynamic_imports(),
        }
    }
}

impl PreloadConfig {
    /// Whether a file with this extension should get a `link` header
    pub fn applies_to(&self, extension: Option<&str>) -> bool {
        self.enabled
            && extension.is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    pub show_headers: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preload_applies_to() {
        let preload = PreloadConfig::default();
        assert!(preload.applies_to(Some("js")));
        assert!(!preload.applies_to(Some("mjs")));
        assert!(!preload.applies_to(Some("html")));
        assert!(!preload.applies_to(None));
    }

    #[test]
    fn test_preload_disabled() {
        let preload = PreloadConfig {
            enabled: false,
            ..PreloadConfig::default()
        };
        assert!(!preload.applies_to(Some("js")));
    }
}

// Configuration module entry point
// Manages application configuration, the static root and shared state

mod root;
mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use root::StaticRoot;
pub use state::AppState;
pub use types::{
    Config, HttpConfig, LoggingConfig, PerformanceConfig, PreloadConfig, ServerConfig,
    StaticFilesConfig,
};

use crate::cli::Cli;

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("MODPRELOAD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("static_files.root", "packages")?
            .set_default("static_files.index_files", vec!["index.html", "index.js"])?
            .set_default("preload.enabled", true)?
            .set_default("preload.extensions", vec!["js"])?
            .set_default("preload.follow_dynamic_imports", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.show_headers", false)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "modpreload")?
            .set_default("http.enable_cors", true)?
            .build()?;

        settings.try_deserialize()
    }

    /// Load the file named by `--config` and apply command-line overrides
    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut cfg = Self::load_from(&cli.config)?;
        if let Some(host) = &cli.host {
            cfg.server.host.clone_from(host);
        }
        if let Some(port) = cli.port {
            cfg.server.port = port;
        }
        if let Some(root) = &cli.root {
            cfg.static_files.root.clone_from(root);
        }
        Ok(cfg)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
pub mod test_support {
    use super::Config;

    /// Defaults only; the file name is one no test creates
    pub fn default_config() -> Config {
        Config::load_from("modpreload-test-no-such-config").expect("defaults must deserialize")
    }
}

//! Configuration management for the demo site.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The navigation menu comes from a TOML file when `PAGEFLOW_MENU_FILE` is set.

use pageflow_core::{Menu, MenuEntry, NavigationResolver};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while loading site configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The menu file could not be read.
    #[error("Failed to read menu file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The menu file is not valid TOML or has the wrong shape.
    #[error("Failed to parse menu file {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// The configured fallback names no menu entry.
    #[error("Fallback menu entry '{0}' is not in the menu")]
    UnknownFallback(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Page pipeline configuration
    pub site: SiteConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
}

/// Page pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site name shown by the layout
    pub name: String,
    /// TOML file with `[[menus]]` entries; the built-in menu when unset
    pub menu_file: Option<PathBuf>,
    /// Menu entry used when a page's key matches nothing; `none` disables it
    pub fallback_menu: Option<String>,
    /// Run templates on the request task instead of the blocking pool
    pub render_inline: bool,
    /// Abandon page rendering after this long
    pub request_timeout_ms: Option<u64>,
}

/// Shape of the menu file.
#[derive(Debug, Deserialize)]
struct MenuFile {
    menus: Vec<MenuEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                log_level: "info,pageflow=debug".to_string(),
            },
            site: SiteConfig {
                name: "Demo Application".to_string(),
                menu_file: None,
                fallback_menu: None,
                render_inline: false,
                request_timeout_ms: None,
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or(defaults.server.host),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.server.port),
                log_level: env::var("RUST_LOG").unwrap_or(defaults.server.log_level),
            },
            site: SiteConfig {
                name: env::var("PAGEFLOW_SITE_NAME").unwrap_or(defaults.site.name),
                menu_file: env::var("PAGEFLOW_MENU_FILE").ok().map(PathBuf::from),
                fallback_menu: env::var("PAGEFLOW_FALLBACK_MENU").ok(),
                render_inline: env::var("PAGEFLOW_RENDER_INLINE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.site.render_inline),
                request_timeout_ms: env::var("PAGEFLOW_REQUEST_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|ms| *ms > 0),
            },
        }
    }

    /// Socket address to bind.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl SiteConfig {
    /// Request timeout, if one is configured.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Load the menu.
    ///
    /// # Errors
    ///
    /// Returns an error if the menu file cannot be read or parsed.
    pub fn menu(&self) -> Result<Menu, ConfigError> {
        match &self.menu_file {
            Some(path) => load_menu(path),
            None => Ok(default_menu()),
        }
    }

    /// Build the navigation resolver over `menu` with the configured fallback.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownFallback`] if the fallback names no entry.
    pub fn resolver(&self, menu: Menu) -> Result<NavigationResolver, ConfigError> {
        let Some(name) = &self.fallback_menu else {
            return Ok(NavigationResolver::new(menu));
        };
        if name.eq_ignore_ascii_case("none") {
            return Ok(NavigationResolver::new(menu).without_fallback());
        }

        let fallback = menu
            .entries()
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| ConfigError::UnknownFallback(name.clone()))?;
        Ok(NavigationResolver::new(menu).with_fallback(fallback))
    }
}

/// The built-in Home/Login menu.
#[must_use]
pub fn default_menu() -> Menu {
    Menu::new([
        MenuEntry::new("Home", "/", "Home"),
        MenuEntry::new("Login", "/login", "Login"),
    ])
}

/// Parse a `[[menus]]` TOML document.
///
/// # Errors
///
/// Returns the TOML parse error.
pub fn parse_menu(text: &str) -> Result<Menu, toml::de::Error> {
    let file: MenuFile = toml::from_str(text)?;
    Ok(Menu::new(file.menus))
}

/// Read and parse a menu file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_menu(path: &Path) -> Result<Menu, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_menu(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

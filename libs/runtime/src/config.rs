use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::paths::home_dir::resolve_home_dir;

/// Main client configuration with strongly-typed global sections
/// and a flexible per-module configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Local client state (home directory, session file).
    pub client: ClientConfig,
    /// Remote API selection.
    pub api: ApiConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Directory containing per-module YAML files (optional).
    #[serde(default)]
    pub modules_dir: Option<String>,
    /// Per-module configuration bag: module_name → arbitrary JSON/YAML value.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub home_dir: String, // will be normalized to absolute path
    /// Session file holding the persisted tokens, relative to `home_dir`.
    #[serde(default = "default_session_file")]
    pub session_file: String,
}

/// Which backend the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Selects `url_dev` when `development`, `url` otherwise.
    pub environment: Environment,
    /// Production API base URL.
    pub url: String,
    /// Development API base URL.
    pub url_dev: String,
    /// Per-request timeout; 0 disables it.
    #[serde(default)]
    pub timeout_sec: u64,
}

impl ApiConfig {
    /// Base URL for the selected environment.
    pub fn base_url(&self) -> &str {
        match self.environment {
            Environment::Development => &self.url_dev,
            Environment::Production => &self.url,
        }
    }

    /// Parse and validate the selected base URL.
    pub fn parsed_base_url(&self) -> Result<url::Url> {
        let raw = self.base_url().trim();
        let url = url::Url::parse(raw)
            .with_context(|| format!("Invalid API base URL '{}'", raw))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => anyhow::bail!("Unsupported API URL scheme '{}' in '{}'", other, raw),
        }
    }
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    pub file: String,          // "logs/obras.log"; empty disables the file sink
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>, // How many rotated files to keep
    #[serde(default)]
    pub max_size_mb: Option<u64>, // Max size of the file in MB
}

fn default_session_file() -> String {
    "session.json".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            // Empty => $HOME/.obras (or %APPDATA%/.obras)
            home_dir: String::new(),
            session_file: default_session_file(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            url: "https://api.obras.example.com".to_string(),
            url_dev: "http://127.0.0.1:3000".to_string(),
            timeout_sec: 30,
        }
    }
}

/// Create a default logging configuration.
/// The console stays quiet (`warn`) so command output is readable; details go to the file.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "warn".to_string(),
            file: "logs/obras.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(10),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            api: ApiConfig::default(),
            logging: Some(default_logging_config()),
            modules_dir: None,
            modules: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    /// Also normalizes `client.home_dir` into an absolute path and creates the directory.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let path = config_path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Optional sections stay None unless YAML/ENV provide them.
        let base = AppConfig {
            logging: None,
            ..AppConfig::default()
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(path))
            // Example: APP__API__ENVIRONMENT=development maps to api.environment
            .merge(Env::prefixed("APP__").split("__"));

        let mut config: AppConfig = figment
            .extract()
            .with_context(|| format!("Failed to parse yaml config '{}'", path.display()))?;

        normalize_home_dir_inplace(&mut config.client)
            .context("Failed to resolve client.home_dir")?;

        if let Some(dir) = config.modules_dir.clone() {
            merge_module_files(&mut config.modules, dir)?;
        }

        Ok(config)
    }

    /// Load configuration from file or fall back to defaults (still honoring `APP__*` overrides).
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                use figment::{
                    providers::{Env, Serialized},
                    Figment,
                };

                let mut c: AppConfig = Figment::new()
                    .merge(Serialized::defaults(AppConfig::default()))
                    .merge(Env::prefixed("APP__").split("__"))
                    .extract()
                    .context("Failed to apply environment overrides")?;
                normalize_home_dir_inplace(&mut c.client)
                    .context("Failed to resolve client.home_dir (defaults)")?;
                Ok(c)
            }
        }
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Absolute path of the persisted session file.
    pub fn session_path(&self) -> PathBuf {
        let file = Path::new(&self.client.session_file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            Path::new(&self.client.home_dir).join(file)
        }
    }

    /// Typed view of one entry of the `modules` bag; missing entries yield `T::default()`.
    pub fn module_config<T>(&self, name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.modules.get(name) {
            Some(raw) => serde_json::from_value(raw.clone())
                .with_context(|| format!("Invalid configuration for module '{}'", name)),
            None => Ok(T::default()),
        }
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(url) = &args.api_url {
            match self.api.environment {
                Environment::Development => self.api.url_dev = url.clone(),
                Environment::Production => self.api.url = url.clone(),
            }
        }

        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            default_section.console_level = match args.verbose {
                0 => default_section.console_level.clone(), // keep
                1 => "info".to_string(),
                2 => "debug".to_string(),
                _ => "trace".to_string(),
            };
        }
    }
}

/// Command line arguments relevant to configuration.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub api_url: Option<String>,
    pub print_config: bool,
    pub verbose: u8,
}

const fn default_subdir() -> &'static str {
    ".obras"
}

/// Normalize `client.home_dir` and store the absolute path back.
fn normalize_home_dir_inplace(client: &mut ClientConfig) -> Result<()> {
    let opt = if client.home_dir.trim().is_empty() {
        None
    } else {
        Some(client.home_dir.clone())
    };

    let resolved: PathBuf = resolve_home_dir(opt, default_subdir(), /*create*/ true)
        .context("home_dir normalization failed")?;

    client.home_dir = resolved.to_string_lossy().to_string();
    Ok(())
}

fn merge_module_files(
    bag: &mut HashMap<String, serde_json::Value>,
    dir: impl AsRef<Path>,
) -> Result<()> {
    use std::fs;
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
            .unwrap_or(false);
        if !path.is_file() || !is_yaml {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read module config {}", path.display()))?;
        let val: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse yaml in {}", path.display()))?;
        bag.insert(name, serde_json::to_value(val)?);
    }
    Ok(())
}

//! Loader for search configuration with YAML + environment overlays.
//!
//! Sources merge in the order they are added, then `COPYVIO_`-prefixed
//! environment variables (`__` separates nesting, e.g.
//! `COPYVIO_SEARCH__CREDENTIALS__KEY`) override them. Finally every string
//! value has `${VAR}` placeholders expanded from the process environment.
//!
//! Expected shape:
//!
//! ```yaml
//! version: "1"
//! search:
//!   engine: "Yahoo! BOSS"
//!   credentials:
//!     key: "${BOSS_KEY}"
//!     secret: "${BOSS_SECRET}"
//! transport:          # optional
//!   user_agent: "copyvio-search/0.1.0"
//!   timeout_secs: 15
//! ```
use config::{Config, ConfigError, Environment, File};
use copyvio_common::{SearchSettings, TransportSettings};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "COPYVIO";

#[derive(Debug, Deserialize)]
pub struct CopyvioConfig {
    pub version: Option<String>,
    pub search: SearchSettings,
    #[serde(default)]
    pub transport: TransportSettings,
}

/// `<config dir>/copyvio/copyvio.yaml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("copyvio").join("copyvio.yaml"))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring.
pub struct CopyvioConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    files: Vec<(PathBuf, bool)>,
    inline: Vec<String>,
}

impl Default for CopyvioConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CopyvioConfigLoader {
    /// Empty loader; only environment overrides apply until sources are added.
    ///
    /// ```
    /// use copyvio_config::CopyvioConfigLoader;
    ///
    /// let config = CopyvioConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// version: "1"
    /// search:
    ///   engine: "Yahoo! BOSS"
    ///   credentials: { key: "k", secret: "s" }
    /// "#,
    ///     )
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.search.engine, "Yahoo! BOSS");
    /// assert_eq!(config.transport.timeout_secs, 15);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            files: Vec::new(),
            inline: Vec::new(),
        }
    }

    /// Loader pre-seeded with [`default_config_path`] as an optional file.
    pub fn from_default_location() -> Self {
        match default_config_path() {
            Some(path) => Self::new().with_optional_file(path),
            None => Self::new(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format follows the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// Attach a file that is skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.inline.push(yaml.to_string());
        self
    }

    /// Merge all sources and deserialize into [`CopyvioConfig`].
    ///
    /// ```
    /// use copyvio_config::CopyvioConfigLoader;
    ///
    /// temp_env::with_var("BOSS_SECRET", Some("from-env"), || {
    ///     let config = CopyvioConfigLoader::new()
    ///         .with_yaml_str(r#"
    /// search:
    ///   engine: "Yahoo! BOSS"
    ///   credentials:
    ///     key: "consumer"
    ///     secret: "${BOSS_SECRET}"
    /// "#)
    ///         .load()
    ///         .expect("valid configuration");
    ///
    ///     assert_eq!(config.search.credentials.secret, "from-env");
    /// });
    /// ```
    pub fn load(self) -> Result<CopyvioConfig, ConfigError> {
        let mut builder = self.builder;
        for (path, required) in &self.files {
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }
        for yaml in &self.inline {
            builder = builder.add_source(File::from_str(yaml, config::FileFormat::Yaml));
        }
        // Environment last so it overrides files and snippets.
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

use cadence_core::models::MaterializationConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_FILE: &str = "cadence.toml";

/// Which persistence backend holds the task collection
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    /// Task file (json) or database file (sqlite); defaults per backend
    pub data_path: Option<PathBuf>,
    /// JSON task file imported into an empty SQLite database on first open
    pub legacy_import: Option<PathBuf>,
    /// Fallback filter when RUST_LOG is unset
    pub log_level: String,
    pub recurrence: MaterializationConfig,
    /// Whether `list` and `day` show templates without --templates
    pub default_include_templates: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Json,
            data_path: None,
            legacy_import: None,
            log_level: "warn".to_string(),
            recurrence: MaterializationConfig::default(),
            default_include_templates: false,
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("CADENCE_").split("__"))
    }

    pub fn data_path(&self) -> PathBuf {
        self.data_path.clone().unwrap_or_else(|| match self.backend {
            Backend::Json => PathBuf::from("cadence.json"),
            Backend::Sqlite => PathBuf::from("cadence.db"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_sources() {
        Jail::expect_with(|_jail| {
            let config = Config::new()?;
            assert_eq!(config, Config::default());
            assert_eq!(config.data_path(), PathBuf::from("cadence.json"));
            assert_eq!(config.recurrence.horizon_days, 30);
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_precedence() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                    backend = "sqlite"
                    log_level = "info"

                    [recurrence]
                    horizon_days = 7
                "#,
            )?;
            jail.set_env("CADENCE_RECURRENCE__HORIZON_DAYS", "14");

            let config = Config::new()?;
            assert_eq!(config.backend, Backend::Sqlite);
            assert_eq!(config.log_level, "info");
            assert_eq!(config.recurrence.horizon_days, 14);
            assert_eq!(config.data_path(), PathBuf::from("cadence.db"));
            Ok(())
        });
    }

    #[test]
    fn test_explicit_data_path_wins() {
        Jail::expect_with(|jail| {
            jail.set_env("CADENCE_DATA_PATH", "planner/tasks.json");
            let config = Config::new()?;
            assert_eq!(config.data_path(), PathBuf::from("planner/tasks.json"));
            Ok(())
        });
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("CADENCE_BACKEND", "postgres");
            assert!(Config::new().is_err());
            Ok(())
        });
    }
}

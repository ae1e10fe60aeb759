//! Server configuration.
//!
//! Values come from an optional TOML file, then environment variables,
//! then command-line flags, each layer overriding the previous one.
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |---|---|
//! | `RISK_MAP_CONFIG` | Path of the TOML file (default `risk_map.toml`) |
//! | `SHEET_ID` | Spreadsheet id |
//! | `SHEET_NAME` | Worksheet title (default `Sheet1`) |
//! | `MAIN_FOLDER_ID` | Drive folder holding the month folders |
//! | `GOOGLE_ACCESS_TOKEN` | Ready-to-use OAuth bearer token |
//! | `GOOGLE_TOKEN_FILE` | Path to a cached authorized-user token JSON |
//! | `BIND_ADDR` | Listen address (default `127.0.0.1`) |
//! | `PORT` | Listen port (default `8080`) |
//! | `RISK_MAP_SEED_CSV` | Run against an in-memory store seeded from this CSV |
//! | `RISK_MAP_CACHE_TTL_SECS` | Dataset cache freshness window (default 300) |
//! | `RISK_MAP_WRITE_SPLIT_COORDINATES` | Also write latitude/longitude columns |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::TimeDelta;
use risk_map_dataset::DatasetError;
use risk_map_form::FormOptions;
use risk_map_map::MapOptions;
use risk_map_map::popup::PopupColumns;
use risk_map_sheets::google::{DriveClient, SheetsClient};
use risk_map_sheets::memory::{MemoryBlobStore, MemoryStore};
use risk_map_sheets::{BlobStore, CredentialError, StoreError, TabularStore, WriteMode};
use serde::Deserialize;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "risk_map.toml";

/// URL prefix under which the in-memory blob store serves files.
pub const MEMORY_BLOB_PREFIX: &str = "/blobs";

/// Errors raised while assembling the configuration or the backends.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`AppConfig`].
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// A setting had a value that could not be parsed.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Setting name.
        key: String,
        /// Offending value.
        value: String,
    },

    /// A required setting is absent.
    #[error("{key} is not set")]
    Missing {
        /// Setting name.
        key: String,
    },

    /// No usable credentials.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The seed CSV could not be loaded.
    #[error("Failed to load seed data: {0}")]
    Seed(#[from] DatasetError),

    /// The worksheet could not be opened.
    #[error("Failed to open worksheet: {0}")]
    Store(#[from] StoreError),
}

/// Map display settings, the `[map]` table of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Column holding a preferred per-row hex color.
    pub color_column: String,
    /// Explicit popup columns. Overrides `show_all_columns`.
    pub popup_columns: Option<Vec<String>>,
    /// List every non-blank column in popups, otherwise the first six.
    pub show_all_columns: bool,
    /// Popup width in pixels.
    pub popup_width: u32,
    /// Popup height in pixels.
    pub popup_height: u32,
    /// Attach the in-map legend.
    pub show_legend: bool,
    /// Initial zoom level.
    pub zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        let defaults = MapOptions::default();
        Self {
            color_column: defaults.color_column,
            popup_columns: None,
            show_all_columns: true,
            popup_width: defaults.popup_width,
            popup_height: defaults.popup_height,
            show_legend: defaults.show_legend,
            zoom: defaults.zoom,
        }
    }
}

impl MapConfig {
    /// Converts to the map builder's options.
    #[must_use]
    pub fn to_options(&self) -> MapOptions {
        let popup_columns = match &self.popup_columns {
            Some(columns) => PopupColumns::Only(columns.clone()),
            None if self.show_all_columns => PopupColumns::All,
            None => PopupColumns::First,
        };
        MapOptions {
            color_column: self.color_column.clone(),
            popup_columns,
            popup_width: self.popup_width,
            popup_height: self.popup_height,
            show_legend: self.show_legend,
            zoom: self.zoom,
            local_link_prefix: None,
        }
    }
}

/// Full server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Spreadsheet id.
    pub sheet_id: Option<String>,
    /// Worksheet title.
    pub sheet_name: String,
    /// Drive folder holding the month folders.
    pub main_folder_id: Option<String>,
    /// Static bearer token.
    pub google_access_token: Option<String>,
    /// Cached authorized-user token file.
    pub google_token_file: Option<PathBuf>,
    /// Listen address.
    pub bind_addr: String,
    /// Listen port.
    pub port: u16,
    /// Seed CSV for the in-memory backends.
    pub seed_csv: Option<PathBuf>,
    /// Dataset cache freshness window in seconds.
    pub cache_ttl_secs: u64,
    /// Also write latitude/longitude columns on submit.
    pub write_split_coordinates: bool,
    /// Map display settings.
    pub map: MapConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sheet_id: None,
            sheet_name: "Sheet1".to_string(),
            main_folder_id: None,
            google_access_token: None,
            google_token_file: None,
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            seed_csv: None,
            cache_ttl_secs: 300,
            write_split_coordinates: false,
            map: MapConfig::default(),
        }
    }
}

/// Flags given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Seed CSV path.
    pub seed: Option<PathBuf>,
    /// Listen port.
    pub port: Option<u16>,
    /// Listen address.
    pub bind: Option<String>,
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

impl AppConfig {
    /// Parses a TOML document. Absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document is malformed.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(s)?)
    }

    /// Reads the config file at `path`.
    ///
    /// A missing file yields the defaults unless `required` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Toml`] if it is malformed.
    pub fn from_file(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                log::info!("Loading config from {}", path.display());
                Self::from_toml_str(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                log::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unparseable number or
    /// flag.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| lookup(key).and_then(non_blank);

        if let Some(v) = get("SHEET_ID") {
            self.sheet_id = Some(v);
        }
        if let Some(v) = get("SHEET_NAME") {
            self.sheet_name = v;
        }
        if let Some(v) = get("MAIN_FOLDER_ID") {
            self.main_folder_id = Some(v);
        }
        if let Some(v) = get("GOOGLE_ACCESS_TOKEN") {
            self.google_access_token = Some(v);
        }
        if let Some(v) = get("GOOGLE_TOKEN_FILE") {
            self.google_token_file = Some(PathBuf::from(v));
        }
        if let Some(v) = get("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = get("PORT") {
            self.port = parse_number("PORT", &v)?;
        }
        if let Some(v) = get("RISK_MAP_SEED_CSV") {
            self.seed_csv = Some(PathBuf::from(v));
        }
        if let Some(v) = get("RISK_MAP_CACHE_TTL_SECS") {
            self.cache_ttl_secs = parse_number("RISK_MAP_CACHE_TTL_SECS", &v)?;
        }
        if let Some(v) = get("RISK_MAP_WRITE_SPLIT_COORDINATES") {
            self.write_split_coordinates = parse_bool("RISK_MAP_WRITE_SPLIT_COORDINATES", &v)?;
        }
        Ok(())
    }

    /// Applies command-line flags.
    pub fn apply_cli(&mut self, cli: CliOverrides) {
        if let Some(seed) = cli.seed {
            self.seed_csv = Some(seed);
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(bind) = cli.bind {
            self.bind_addr = bind;
        }
    }

    /// Loads the file named by `RISK_MAP_CONFIG` (or the default file),
    /// then applies the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file or an environment value is
    /// invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let explicit = std::env::var("RISK_MAP_CONFIG").ok().and_then(non_blank);
        let path = explicit
            .as_deref()
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);

        let mut config = Self::from_file(&path, explicit.is_some())?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Dataset cache freshness window.
    #[must_use]
    pub fn cache_ttl(&self) -> TimeDelta {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Settings for the form controller.
    #[must_use]
    pub fn form_options(&self) -> FormOptions {
        FormOptions {
            main_folder_id: self.main_folder_id.clone().unwrap_or_default(),
            write_split_coordinates: self.write_split_coordinates,
            write_mode: WriteMode::UserEntered,
            ..FormOptions::default()
        }
    }

    /// Settings for the map builder.
    ///
    /// In seed mode, uploads are served from [`MEMORY_BLOB_PREFIX`], so
    /// popups link those paths too.
    #[must_use]
    pub fn map_options(&self) -> MapOptions {
        let mut options = self.map.to_options();
        if self.seed_csv.is_some() {
            options.local_link_prefix = Some(format!("{MEMORY_BLOB_PREFIX}/"));
        }
        options
    }

    /// Builds the store and blob backends.
    ///
    /// With a seed CSV both backends are in memory. Otherwise the Google
    /// clients are built and the worksheet is opened once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the seed cannot be loaded, a required
    /// setting or credential is missing, or the worksheet cannot be opened.
    pub async fn build_backends(&self) -> Result<Backends, ConfigError> {
        if let Some(seed) = &self.seed_csv {
            log::info!("Using in-memory store seeded from {}", seed.display());
            let table = risk_map_dataset::seed::load_csv(seed)?;
            let blobs = Arc::new(MemoryBlobStore::new(MEMORY_BLOB_PREFIX));
            return Ok(Backends {
                store: Arc::new(MemoryStore::new(table)),
                blobs: blobs.clone(),
                memory_blobs: Some(blobs),
            });
        }

        let sheet_id = self.sheet_id.as_deref().ok_or_else(|| ConfigError::Missing {
            key: "SHEET_ID".to_string(),
        })?;
        if self.main_folder_id.is_none() {
            log::warn!("MAIN_FOLDER_ID is not set; documentation uploads will fail");
        }

        let credentials = risk_map_sheets::credentials::resolve(
            self.google_access_token.as_deref(),
            self.google_token_file.as_deref(),
        )?;

        log::info!("Opening worksheet '{}' in {sheet_id}", self.sheet_name);
        let worksheet = SheetsClient::new(credentials.clone())
            .open(sheet_id)
            .worksheet(&self.sheet_name)
            .await?;

        Ok(Backends {
            store: Arc::new(worksheet),
            blobs: Arc::new(DriveClient::new(credentials)),
            memory_blobs: None,
        })
    }
}

/// The collaborators a running server talks to.
pub struct Backends {
    /// Tabular store holding the dataset.
    pub store: Arc<dyn TabularStore>,
    /// Blob storage for documentation uploads.
    pub blobs: Arc<dyn BlobStore>,
    /// Set when blobs are held in memory and served by this server.
    pub memory_blobs: Option<Arc<MemoryBlobStore>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_application() {
        let config = AppConfig::default();
        assert_eq!(config.sheet_name, "Sheet1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_ttl(), TimeDelta::minutes(5));
        assert!(!config.write_split_coordinates);
        assert_eq!(config.map_options(), MapOptions::default());
    }

    #[test]
    fn toml_keeps_defaults_for_absent_keys() {
        let config = AppConfig::from_toml_str(
            r#"
            sheet_id = "abc"

            [map]
            zoom = 14
            show_all_columns = false
            "#,
        )
        .unwrap();

        assert_eq!(config.sheet_id.as_deref(), Some("abc"));
        assert_eq!(config.sheet_name, "Sheet1");
        assert_eq!(config.map.zoom, 14);
        assert_eq!(config.map_options().popup_columns, PopupColumns::First);
        assert_eq!(config.map.popup_width, 450);
    }

    #[test]
    fn explicit_popup_columns_win() {
        let config = AppConfig::from_toml_str(
            r#"
            [map]
            popup_columns = ["Alamat"]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.map_options().popup_columns,
            PopupColumns::Only(vec!["Alamat".to_string()])
        );
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(matches!(
            AppConfig::from_toml_str("port = \"eighty\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn env_overrides_file() {
        let mut config = AppConfig::from_toml_str("sheet_name = \"Data\"\nport = 9000").unwrap();
        config
            .apply_env(env(&[
                ("SHEET_NAME", "Observasi"),
                ("PORT", "3000"),
                ("SHEET_ID", "  "),
                ("RISK_MAP_WRITE_SPLIT_COORDINATES", "true"),
                ("RISK_MAP_CACHE_TTL_SECS", "60"),
            ]))
            .unwrap();

        assert_eq!(config.sheet_name, "Observasi");
        assert_eq!(config.port, 3000);
        assert_eq!(config.sheet_id, None);
        assert!(config.write_split_coordinates);
        assert_eq!(config.cache_ttl(), TimeDelta::seconds(60));
        assert!(config.form_options().write_split_coordinates);
    }

    #[test]
    fn invalid_port_is_reported() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PORT"));
    }

    #[test]
    fn cli_overrides_env() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("PORT", "3000")])).unwrap();
        config.apply_cli(CliOverrides {
            seed: Some(PathBuf::from("data.csv")),
            port: Some(4000),
            bind: None,
        });
        assert_eq!(config.port, 4000);
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.seed_csv, Some(PathBuf::from("data.csv")));
    }

    #[test]
    fn missing_optional_file_yields_defaults() {
        let path = std::env::temp_dir().join("risk_map_missing_config_for_test.toml");
        assert_eq!(AppConfig::from_file(&path, false).unwrap(), AppConfig::default());
        assert!(matches!(
            AppConfig::from_file(&path, true),
            Err(ConfigError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn missing_sheet_id_is_a_setup_error() {
        let config = AppConfig::default();
        let err = config.build_backends().await.err().unwrap();
        assert!(matches!(err, ConfigError::Missing { ref key } if key == "SHEET_ID"));
    }

    #[tokio::test]
    async fn missing_credentials_is_a_setup_error() {
        let config = AppConfig {
            sheet_id: Some("abc".to_string()),
            ..AppConfig::default()
        };
        let err = config.build_backends().await.err().unwrap();
        assert!(matches!(err, ConfigError::Credential(_)));
    }

    #[tokio::test]
    async fn seed_builds_memory_backends() {
        let path = std::env::temp_dir().join("risk_map_seed_config_test.csv");
        std::fs::write(&path, "Koordinat,Level Resiko\n\"-7.9, 112.6\",Low\n").unwrap();

        let config = AppConfig {
            seed_csv: Some(path.clone()),
            ..AppConfig::default()
        };
        let backends = config.build_backends().await.unwrap();
        let table = backends.store.read_all_records().await.unwrap();
        assert_eq!(table.headers, vec!["Koordinat", "Level Resiko"]);
        assert!(backends.memory_blobs.is_some());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn seed_mode_links_served_blobs() {
        assert_eq!(AppConfig::default().map_options().local_link_prefix, None);

        let config = AppConfig {
            seed_csv: Some(PathBuf::from("data.csv")),
            ..AppConfig::default()
        };
        assert_eq!(
            config.map_options().local_link_prefix.as_deref(),
            Some("/blobs/")
        );
    }
}

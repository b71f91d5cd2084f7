use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::model::GeoPoint;

/// Outbound HTTP policy shared by every upstream call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    /// Extra attempts after a connection-level failure. Status codes are never retried.
    pub retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            timeout_secs: 10,
            retries: 0,
        }
    }
}

/// Upstream URLs. Overridable so the pipeline can be pointed at a mirror or a mock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Page that hands out the `mfsession` cookie.
    pub session_portal: String,
    /// Coordinate nowcast; `?lat=..&lon=..` is appended.
    pub nowcast: String,
    /// Legacy municipality endpoint; `/<code>0` is appended.
    pub legacy_rain: String,
    /// Markup fragment endpoint; `/<code>` is appended.
    pub rain_fragment: String,
    /// Address API; `?q=postcode=<zip>` is appended.
    pub geocode: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            session_portal: "https://meteofrance.com/".to_string(),
            nowcast: "https://rpcache-aa.meteofrance.com/internet2018client/2.0/nowcast/rain"
                .to_string(),
            legacy_rain: "http://www.meteofrance.com/mf3-rpc-portlet/rest/pluie".to_string(),
            rain_fragment: "https://meteo.orange.fr/meteo/fragments/rain/city".to_string(),
            geocode: "https://api-adresse.data.gouv.fr/search/".to_string(),
        }
    }
}

impl EndpointConfig {
    /// Points every endpoint at `base`, keeping the upstream paths. Handy for mocks.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            session_portal: format!("{base}/"),
            nowcast: format!("{base}/internet2018client/2.0/nowcast/rain"),
            legacy_rain: format!("{base}/mf3-rpc-portlet/rest/pluie"),
            rain_fragment: format!("{base}/meteo/fragments/rain/city"),
            geocode: format!("{base}/search/"),
        }
    }
}

/// Default location used by the CLI when none is given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub zip_code: Option<String>,
    pub insee_code: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl LocationConfig {
    pub fn geo_point(&self) -> Option<GeoPoint> {
        Some(GeoPoint::new(self.lat?, self.lon?))
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [http]
/// timeout_secs = 10
///
/// [location]
/// zip_code = "75001"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub endpoints: EndpointConfig,
    pub location: LocationConfig,
}

impl Config {
    /// Load config from the platform config dir, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform config dir, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "rain-nowcast", "rain-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::model::Coordinates;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_base_url = "https://agridronex.example.com"
/// request_timeout_secs = 20
///
/// [location]
/// latitude = 19.076
/// longitude = 72.8777
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the backend serving `/api/...`.
    pub api_base_url: String,

    /// Base URL of a Nominatim-compatible geocoder.
    pub geocoder_url: String,

    /// Sent with every request; Nominatim rejects anonymous clients.
    pub user_agent: String,

    pub request_timeout_secs: u64,

    /// Stand-in for device geolocation. `None` means location is unavailable.
    pub location: Option<Coordinates>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            user_agent: format!("agridrone/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            location: None,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "agridrone", "agridrone-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_location(&mut self, coordinates: Coordinates) {
        self.location = Some(coordinates);
    }

    pub fn clear_location(&mut self) {
        self.location = None;
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("api_base_url", &self.api_base_url), ("geocoder_url", &self.geocoder_url)] {
            url::Url::parse(value)
                .with_context(|| format!("`{field}` is not a valid URL: {value}"))?;
        }

        if let Some(loc) = &self.location {
            if !(-90.0..=90.0).contains(&loc.latitude) || !(-180.0..=180.0).contains(&loc.longitude) {
                return Err(anyhow!(
                    "Configured location ({}, {}) is out of range.\n\
                     Hint: run `agridrone configure` and enter latitude/longitude in degrees.",
                    loc.latitude,
                    loc.longitude
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = Config::from_toml("").expect("empty config is valid");
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.request_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(cfg.user_agent.starts_with("agridrone/"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = Config::from_toml(
            r#"
            api_base_url = "https://farm.example.com/backend/"

            [location]
            latitude = 19.076
            longitude = 72.8777
            "#,
        )
        .expect("config must parse");

        assert_eq!(cfg.api_base_url, "https://farm.example.com/backend/");
        assert_eq!(cfg.geocoder_url, DEFAULT_GEOCODER_URL);
        assert_eq!(cfg.location, Some(Coordinates::new(19.076, 72.8777)));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = Config::from_toml(r#"api_base_url = "not a url""#).unwrap_err();
        assert!(format!("{err:#}").contains("api_base_url"));
    }

    #[test]
    fn out_of_range_location_is_rejected() {
        let err = Config::from_toml("[location]\nlatitude = 120.0\nlongitude = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let cfg = Config { request_timeout_secs: 0, ..Config::default() };
        assert_eq!(cfg.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut cfg = Config::default();
        cfg.set_location(Coordinates::new(-1.5, 36.8));
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), cfg);

        cfg.clear_location();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(!text.contains("[location]"));
    }
}

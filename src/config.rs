use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Backend base URL baked in at build time (`SERVIO_API_URL`), used when the
/// config file does not name one.
pub const DEFAULT_API_URL: &str = match option_env!("SERVIO_API_URL") {
    Some(url) => url,
    None => "https://api.servio.ng/api/v1",
};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend REST API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout for backend calls; none by default
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Platform flavour; decides whether location permission is requested explicitly
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub referral: ReferralConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    #[default]
    Desktop,
}

impl Platform {
    /// Android asks for location permission at runtime; the others grant it
    /// implicitly (or fail when the position is read).
    pub fn requires_runtime_permission(self) -> bool {
        matches!(self, Platform::Android)
    }
}

/// Free geocoding service (Nominatim-compatible, no API key)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default = "default_reverse_url")]
    pub reverse_url: String,
    #[serde(default = "default_search_url")]
    pub search_url: String,
    /// ISO country code searches are constrained to
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_geolocation_timeout_secs")]
    pub geolocation_timeout_secs: u64,
    /// Coordinates reported as the device position. Desktops have no GPS,
    /// so detection falls back to Lagos unless these are set.
    #[serde(default)]
    pub device_latitude: Option<f64>,
    #[serde(default)]
    pub device_longitude: Option<f64>,
}

/// OAuth client identifiers for Google sign-in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub web_client_id: Option<String>,
    #[serde(default)]
    pub ios_client_id: Option<String>,
}

impl GoogleConfig {
    /// iOS uses its own client id; every other platform uses the web one.
    pub fn client_id_for(&self, platform: Platform) -> Option<&str> {
        let id = match platform {
            Platform::Ios => self.ios_client_id.as_deref(),
            Platform::Android | Platform::Desktop => self.web_client_id.as_deref(),
        };
        id.filter(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralConfig {
    /// Codes shorter than this are not looked up
    #[serde(default = "default_referral_min_length")]
    pub min_length: usize,
    #[serde(default = "default_referral_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_reverse_url() -> String {
    "https://nominatim.openstreetmap.org/reverse".to_string()
}

fn default_search_url() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

fn default_country_code() -> String {
    "ng".to_string()
}

fn default_user_agent() -> String {
    format!("servio/{}", env!("CARGO_PKG_VERSION"))
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_search_limit() -> usize {
    8
}

fn default_geolocation_timeout_secs() -> u64 {
    15
}

fn default_referral_min_length() -> usize {
    4
}

fn default_referral_debounce_ms() -> u64 {
    500
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            reverse_url: default_reverse_url(),
            search_url: default_search_url(),
            country_code: default_country_code(),
            user_agent: default_user_agent(),
            search_debounce_ms: default_search_debounce_ms(),
            search_limit: default_search_limit(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            geolocation_timeout_secs: default_geolocation_timeout_secs(),
            device_latitude: None,
            device_longitude: None,
        }
    }
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            min_length: default_referral_min_length(),
            debounce_ms: default_referral_debounce_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: None,
            platform: Platform::default(),
            geocoding: GeocodingConfig::default(),
            location: LocationConfig::default(),
            google: GoogleConfig::default(),
            referral: ReferralConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or create the default one
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            let mut config: Config =
                toml::from_str(&content).with_context(|| "Failed to parse config file")?;

            // An empty string in the file means "use the built-in default"
            if config.api_base_url.trim().is_empty() {
                config.api_base_url = default_api_base_url();
            }
            config
        } else {
            let config = Self::default();
            config.save(config_path)?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// `SERVIO_API_URL` at runtime wins over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SERVIO_API_URL") {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
    }

    /// Save configuration to file with secure permissions
    pub fn save(&self, config_path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        // 600: the file may hold OAuth client ids
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(config_path)
                .with_context(|| format!("Failed to get file metadata: {:?}", config_path))?
                .permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(config_path, perms)
                .with_context(|| format!("Failed to set file permissions: {:?}", config_path))?;
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.location.geolocation_timeout_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.geocoding.search_debounce_ms)
    }

    pub fn referral_debounce(&self) -> Duration {
        Duration::from_millis(self.referral.debounce_ms)
    }

    pub fn google_client_id(&self) -> Option<&str> {
        self.google.client_id_for(self.platform)
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, File, Map};
use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;

/// Flat deployment variables and the setting each one overrides.
const FLAT_OVERRIDES: [(&str, &str); 4] = [
    ("SENSOR_INDEX", "purpleair.sensor_index"),
    ("BASE_URL", "purpleair.base_url"),
    ("API_KEY", "purpleair.api_key"),
    ("S3_BUCKET_NAME", "storage.bucket_name"),
];

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub purpleair: PurpleAirSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct PurpleAirSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub sensor_index: u64,
    pub base_url: String,
    pub api_key: Secret<String>,
    #[serde(default = "default_timeout_secs")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
}

impl PurpleAirSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Destination bucket. Only required once there is something to store.
    #[serde(default)]
    pub bucket_name: Option<String>,
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket_name: None,
            local_root: default_local_root(),
        }
    }
}

#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Local,
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_local_root() -> PathBuf {
    PathBuf::from("data-lake")
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir().map_err(|error| {
        ConfigError::Message(format!("Failed to determine the current directory: {}", error))
    })?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;

    build_configuration(&configuration_directory, &environment, None, |key| {
        std::env::var(key).ok()
    })
}

/// Layers the configuration files, the `APP_` prefixed variables and the flat
/// deployment variables, in increasing order of precedence.
///
/// `prefixed` replaces the process environment for the `APP_` layer when set,
/// and `lookup` resolves the flat variables.
pub fn build_configuration<F>(
    configuration_directory: &Path,
    environment: &Environment,
    prefixed: Option<Map<String, String>>,
    lookup: F,
) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Config::builder()
        .add_source(File::from(configuration_directory.join("base")).required(false))
        .add_source(
            File::from(configuration_directory.join(environment.as_str())).required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(prefixed),
        );

    for (variable, key) in FLAT_OVERRIDES {
        builder = builder.set_override_option(key, lookup(variable))?;
    }

    builder.build()?.try_deserialize()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}
impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}
impl TryFrom<String> for Environment {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

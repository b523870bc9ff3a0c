use config_rs::{Config, ConfigError, File, FileFormat};
use pwmi_devices::pca9685::Pca9685DeviceConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PwmiConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub device: Pca9685DeviceConfig,
}

impl PwmiConfig {
    pub fn load(cfg_name: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(cfg_name))
            .build()
            .and_then(|config| config.try_deserialize::<PwmiConfig>())
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .and_then(|config| config.try_deserialize::<PwmiConfig>())
    }

    ///Channel number for an argument that is either a channel number or the name of a configured output.
    pub fn resolve_channel(&self, key: &str) -> Option<usize> {
        key.parse::<usize>().ok().or_else(|| {
            self.device
                .outputs
                .get(key)
                .map(|output| output.channel)
        })
    }
}

use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::constants::DEFAULT_PRODUCT_ID;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub convert: ConvertConfig,
    pub logging: LoggingConfig,
}

/// Options handed to every conversion entry point.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertConfig {
    /// PRODID written on calendars created from scratch when the event has no `prodId`.
    pub product_id: String,
    /// Whether JSON output from the string entry points is pretty-printed.
    pub pretty_json: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            product_id: DEFAULT_PRODUCT_ID.to_string(),
            pretty_json: false,
        }
    }
}

impl ConvertConfig {
    /// ## Summary
    /// Checks that the conversion options can be used as-is.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidSetting` if the product id is blank or contains a line break.
    pub fn validate(&self) -> CoreResult<()> {
        if self.product_id.trim().is_empty() {
            return Err(CoreError::InvalidSetting {
                key: "convert.product_id",
                reason: "must not be empty".to_string(),
            });
        }
        if self.product_id.contains(['\r', '\n']) {
            return Err(CoreError::InvalidSetting {
                key: "convert.product_id",
                reason: "must be a single line".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file, environment variables and an optional
    /// `config.toml` into a `Settings`.
    ///
    /// ## Errors
    /// Returns an error if building the configuration, deserializing it, or validating
    /// the conversion options fails.
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("convert.product_id", DEFAULT_PRODUCT_ID)?
            .set_default("convert.pretty_json", false)?
            .set_default("logging.level", "info")?
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?;

        settings.convert.validate()?;
        tracing::debug!(product_id = %settings.convert.product_id, "Conversion settings loaded");

        Ok(settings)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn default_product_id_is_versioned() {
        let convert = ConvertConfig::default();
        assert!(convert.product_id.starts_with("-//jscal//jscal "));
        assert!(convert.product_id.ends_with("//EN"));
        assert!(convert.validate().is_ok());
    }

    #[test_log::test]
    fn blank_product_id_is_rejected() {
        let convert = ConvertConfig {
            product_id: "  ".to_string(),
            pretty_json: false,
        };
        assert!(matches!(
            convert.validate(),
            Err(CoreError::InvalidSetting { key: "convert.product_id", .. })
        ));
    }

    #[test_log::test]
    fn multiline_product_id_is_rejected() {
        let convert = ConvertConfig {
            product_id: "-//a//b\r\nX-INJECTED:1".to_string(),
            pretty_json: true,
        };
        assert!(convert.validate().is_err());
    }
}

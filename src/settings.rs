use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub uploads: UploadSettings,
    pub messaging: MessagingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool_size: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    pub dir: String,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessagingMode {
    /// Drive web.whatsapp.com through the local browser.
    Browser,
    /// Log the message instead of sending it.
    DryRun,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagingSettings {
    pub mode: MessagingMode,
    pub min_delay_seconds: u64,
    pub browser_command: String,
    pub submit_command: Option<String>,
    pub close_command: Option<String>,
}

impl Settings {
    /// Defaults, then `appsettings.*` if present, then `VINCI__SECTION__KEY` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder(Some("appsettings"))?.build()?.try_deserialize()
    }

    /// Defaults only; used by tests and as the base layer of [`Settings::load`].
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder(None)?.build()?.try_deserialize()
    }

    fn builder(
        file: Option<&str>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3001)?
            .set_default("database.url", "vinci_products.db")?
            .set_default("database.pool_size", 4)?
            .set_default("database.timeout_seconds", 30)?
            .set_default("uploads.dir", "uploads")?
            .set_default("uploads.max_dimension", 1920)?
            .set_default("uploads.jpeg_quality", 85)?
            .set_default("messaging.mode", "browser")?
            .set_default("messaging.min_delay_seconds", 15)?
            .set_default("messaging.browser_command", "xdg-open")?
            .set_default("messaging.submit_command", "xdotool key Return")?
            .set_default("messaging.close_command", "xdotool key ctrl+w")?;

        if let Some(name) = file {
            builder = builder
                .add_source(File::with_name(name).required(false))
                .add_source(Environment::with_prefix("VINCI").separator("__"));
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let settings = Settings::defaults().unwrap();
        assert_eq!(settings.server.port, 3001);
        assert_eq!(settings.uploads.max_dimension, 1920);
        assert_eq!(settings.uploads.jpeg_quality, 85);
        assert_eq!(settings.messaging.min_delay_seconds, 15);
        assert_eq!(settings.messaging.mode, MessagingMode::Browser);
    }
}

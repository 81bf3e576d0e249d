use crate::networking::client::PIPELINE_DEPTH;
use crate::types::StartPoint;
use serde::Deserialize;

/// Config file looked up when none is named on the command line.
pub const DEFAULT_CONFIG_NAME: &str = "config";
/// Environment variables with this prefix override the config file, e.g.
/// `OGMIOS_URL`.
pub const ENV_PREFIX: &str = "OGMIOS";
pub const DEFAULT_URL: &str = "ws://127.0.0.1:1337";

fn default_pipeline_depth() -> usize {
    PIPELINE_DEPTH
}

/// Everything a session needs to know before it connects.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub url: String,
    /// `None` streams from wherever the peer's cursor already is, without
    /// negotiating an intersection.
    #[serde(default)]
    pub start_point: Option<StartPoint>,
    #[serde(default = "default_pipeline_depth")]
    pub pipeline_depth: usize,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> ClientConfig {
        ClientConfig {
            url: url.into(),
            start_point: None,
            pipeline_depth: PIPELINE_DEPTH,
        }
    }

    pub fn with_start_point(mut self, start_point: Option<StartPoint>) -> Self {
        self.start_point = start_point;
        self
    }

    pub fn with_pipeline_depth(mut self, pipeline_depth: usize) -> Self {
        self.pipeline_depth = pipeline_depth;
        self
    }

    /// Reads the named config file, if it exists, then `OGMIOS_*`
    /// environment variables on top.
    pub fn load(config_name: &str) -> crate::Result<ClientConfig> {
        let mut settings = config::Config::default();
        settings
            .merge(config::File::with_name(config_name).required(false))?
            .merge(config::Environment::with_prefix(ENV_PREFIX))?;
        ClientConfig::from_settings(settings)
    }

    pub fn from_settings(mut settings: config::Config) -> crate::Result<ClientConfig> {
        settings.set_default("url", DEFAULT_URL)?;
        let config: ClientConfig = settings.try_into()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        let url = url::Url::parse(&self.url)?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(crate::Error::config(format!(
                "url must use ws:// or wss://, got {}",
                self.url
            )));
        }
        if self.pipeline_depth == 0 {
            return Err(crate::Error::config("pipeline_depth must be at least 1"));
        }
        Ok(())
    }
}

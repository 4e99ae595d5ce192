//! Connection and identity configuration.

use bookshift_parse::MasterKey;
use clap::Args;
use thiserror::Error;

/// Settings every command needs. Each can be given as a flag or through the
/// environment variable of the same name.
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    /// Parse Server URL
    #[arg(long, env = "PARSE_SERVER_URL")]
    pub server_url: Option<String>,

    /// Parse application id
    #[arg(long, env = "PARSE_APP_ID")]
    pub app_id: Option<String>,

    /// Parse master key
    #[arg(long, env = "PARSE_MASTER_KEY", hide_env_values = true)]
    pub master_key: Option<String>,

    /// Parse REST API key, for servers that require one
    #[arg(long, env = "PARSE_REST_API_KEY", hide_env_values = true)]
    pub rest_api_key: Option<String>,

    /// User id of the current uploader
    #[arg(long, env = "OLD_UPLOADER_ID")]
    pub old_uploader_id: Option<String>,

    /// User id of the uploader to transfer to
    #[arg(long, env = "NEW_UPLOADER_ID")]
    pub new_uploader_id: Option<String>,
}

/// Required settings that were not provided.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required configuration: {}", .missing.join(", "))]
pub struct ConfigError {
    pub missing: Vec<&'static str>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: String,
    pub app_id: String,
    pub master_key: MasterKey,
    pub rest_api_key: Option<String>,
    pub old_uploader_id: String,
    pub new_uploader_id: String,
}

impl Config {
    /// Validate the arguments, reporting every missing item at once.
    ///
    /// Empty values count as missing.
    pub fn from_args(args: ConnectionArgs) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut require = |value: Option<String>, name: &'static str| {
            let value = value.filter(|v| !v.trim().is_empty());
            if value.is_none() {
                missing.push(name);
            }
            value.unwrap_or_default()
        };

        let server_url = require(args.server_url, "PARSE_SERVER_URL");
        let app_id = require(args.app_id, "PARSE_APP_ID");
        let master_key = require(args.master_key, "PARSE_MASTER_KEY");
        let old_uploader_id = require(args.old_uploader_id, "OLD_UPLOADER_ID");
        let new_uploader_id = require(args.new_uploader_id, "NEW_UPLOADER_ID");

        if !missing.is_empty() {
            return Err(ConfigError { missing });
        }

        Ok(Self {
            server_url,
            app_id,
            master_key: MasterKey::new(master_key),
            rest_api_key: args.rest_api_key.filter(|k| !k.is_empty()),
            old_uploader_id,
            new_uploader_id,
        })
    }
}

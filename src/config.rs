// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

/// Value a deployment leaves in the runtime config when nothing was injected
pub const CLIENT_ID_PLACEHOLDER: &str = "__SPOTIFY_CLIENT_ID__";

/// Environment variable naming an optional runtime config file
pub const RUNTIME_ENV_VAR: &str = "SPOTICAST_RUNTIME_ENV";

const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    Development,
    Production,
    #[default]
    Local,
}

impl FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            "local" => Ok(Self::Local),
            _ => Err(ConfigError::InvalidAppEnv(s.to_string())),
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Local => "local",
        };
        f.write_str(s)
    }
}

/// Client-credentials pair for the Spotify accounts service
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl SpotifyCredentials {
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

// Keep the secret out of logs
impl fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Upstream endpoints, overridable for tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyEndpoints {
    pub token_url: Url,
    pub api_base: Url,
}

impl Default for SpotifyEndpoints {
    fn default() -> Self {
        Self {
            token_url: Url::parse(DEFAULT_TOKEN_URL).expect("valid token URL"),
            api_base: Url::parse(DEFAULT_API_BASE).expect("valid API base URL"),
        }
    }
}

/// Raw configuration values, from the process environment or a runtime file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EnvValues {
    #[serde(rename = "APP_ENV")]
    pub app_env: Option<String>,
    #[serde(rename = "SPOTIFY_CLIENT_ID")]
    pub client_id: Option<String>,
    #[serde(rename = "SPOTIFY_CLIENT_SECRET")]
    pub client_secret: Option<String>,
    #[serde(rename = "APP_URL")]
    pub app_url: Option<String>,
}

impl EnvValues {
    /// Read values from the process environment
    pub fn from_process() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            app_env: var("APP_ENV"),
            client_id: var("SPOTIFY_CLIENT_ID"),
            client_secret: var("SPOTIFY_CLIENT_SECRET"),
            app_url: var("APP_URL"),
        }
    }

    /// Read values from a JSON runtime config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::RuntimeConfigRead {
                path: path.to_path_buf(),
                source: e,
            })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::RuntimeConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Whether these values were actually injected rather than left as a template
    fn is_injected(&self) -> bool {
        self.client_id
            .as_deref()
            .is_some_and(|id| !id.is_empty() && id != CLIENT_ID_PLACEHOLDER)
    }
}

/// Resolved application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub app_env: AppEnv,
    pub credentials: SpotifyCredentials,
    pub app_url: Option<String>,
    pub endpoints: SpotifyEndpoints,
}

impl Environment {
    /// Resolve configuration from process values and an optional runtime override.
    ///
    /// The runtime values replace the process values as a whole, and only when
    /// they carry a real client id.
    pub fn resolve(process: EnvValues, runtime: Option<EnvValues>) -> Result<Self, ConfigError> {
        let effective = match runtime {
            Some(runtime) if runtime.is_injected() => runtime,
            _ => process,
        };

        let app_env = match effective.app_env.as_deref() {
            Some(value) if !value.is_empty() => value.parse()?,
            _ => AppEnv::default(),
        };

        Ok(Self {
            app_env,
            credentials: SpotifyCredentials {
                client_id: effective.client_id.unwrap_or_default(),
                client_secret: effective.client_secret.unwrap_or_default(),
            },
            app_url: effective.app_url.filter(|u| !u.is_empty()),
            endpoints: SpotifyEndpoints::default(),
        })
    }

    /// Load `.env`, the process environment and the runtime config file if any
    pub fn load(runtime_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenv::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }

        let runtime_path = runtime_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(RUNTIME_ENV_VAR).map(Into::into));

        let runtime = match runtime_path {
            Some(path) => Some(EnvValues::from_file(&path)?),
            None => None,
        };

        Self::resolve(EnvValues::from_process(), runtime)
    }

    /// Fail early when the client id or secret is missing
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.credentials.client_id.is_empty() {
            return Err(ConfigError::MissingValue("SPOTIFY_CLIENT_ID"));
        }
        if self.credentials.client_secret.is_empty() {
            return Err(ConfigError::MissingValue("SPOTIFY_CLIENT_SECRET"));
        }
        Ok(())
    }
}

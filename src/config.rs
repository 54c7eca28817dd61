use chrono::Duration;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Application configuration, derived from `Voting.toml` and `VOTING_*`
/// environment variables. Every value has a default, so the binary runs
/// against a local backend out of the box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    api_base_url: String,
    request_timeout: u64,
    confirmation_hold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            request_timeout: 10,
            confirmation_hold: 3,
        }
    }
}

impl Config {
    /// Load the config: defaults, then `Voting.toml`, then `VOTING_*`
    /// environment variables, later sources winning.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("Voting.toml"))
            .merge(Env::prefixed("VOTING_"))
    }

    /// Base URL of the election backend. Both adapters resolve their
    /// endpoints under it.
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Per-request timeout in seconds.
    /// Configured via `VOTING_REQUEST_TIMEOUT`.
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout)
    }

    /// Seconds the confirmation screen holds before the session resets for
    /// the next voter.
    /// Configured via `VOTING_CONFIRMATION_HOLD`.
    pub fn confirmation_hold(&self) -> Duration {
        Duration::seconds(self.confirmation_hold as i64)
    }

    /// Override the backend base URL, e.g. from a command-line flag.
    pub fn with_api_base_url(mut self, api_base_url: String) -> Self {
        self.api_base_url = api_base_url;
        self
    }
}

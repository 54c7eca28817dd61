//! The admin side of the backend: sign in for a bearer token, register a
//! voter. The token is a value handed to each call, never ambient state;
//! where it gets kept between calls is the caller's business.

use log::{info, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::RequestId;

/// Credentials for the admin sign-in endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

/// An opaque bearer token minted by the backend. The client never inspects
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminToken(String);

impl AdminToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

/// Outcome of registering a voter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub message: String,
    pub eligible_positions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    success: bool,
    message: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    success: bool,
    message: Option<String>,
    eligible_positions: Option<Vec<String>>,
}

/// Boundary adapter for the admin service.
pub struct AdminApi {
    http: reqwest::Client,
    base_url: String,
}

impl AdminApi {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url().trim_end_matches('/').to_string(),
        })
    }

    /// Exchange credentials for a bearer token.
    pub async fn login(&self, credentials: &AdminCredentials) -> Result<AdminToken> {
        let id = RequestId::next();
        info!("->req{id} POST /api/admin/login");
        let response = self
            .http
            .post(format!("{}/api/admin/login", self.base_url))
            .json(credentials)
            .send()
            .await
            .map_err(|err| {
                warn!("<-rsp{id} no response: {err}");
                Error::from(err)
            })?;
        let status = response.status();
        let body = response.bytes().await?;
        info!("<-rsp{id} {status} /api/admin/login");
        interpret_login(status, &body)
    }

    /// Register a voter by email, authenticated by the given token. The
    /// backend issues and delivers the voter's OTP; we only learn which
    /// positions they may vote for.
    pub async fn register_voter(&self, token: &AdminToken, email: &str) -> Result<Registration> {
        let id = RequestId::next();
        info!("->req{id} POST /api/admin/register-voter");
        let response = self
            .http
            .post(format!("{}/api/admin/register-voter", self.base_url))
            .bearer_auth(&token.0)
            .json(&RegisterRequest { email })
            .send()
            .await
            .map_err(|err| {
                warn!("<-rsp{id} no response: {err}");
                Error::from(err)
            })?;
        let status = response.status();
        let body = response.bytes().await?;
        info!("<-rsp{id} {status} /api/admin/register-voter");
        interpret_registration(status, &body)
    }
}

fn interpret_login(status: StatusCode, body: &[u8]) -> Result<AdminToken> {
    let response: LoginResponse = serde_json::from_slice(body)
        .map_err(|err| Error::Transport(format!("unparseable response ({status}): {err}")))?;
    if !response.success {
        return Err(Error::Rejection(
            response.message.unwrap_or_else(|| "Login failed".to_string()),
        ));
    }
    response
        .token
        .map(AdminToken)
        .ok_or_else(|| Error::Transport(format!("login response missing token ({status})")))
}

fn interpret_registration(status: StatusCode, body: &[u8]) -> Result<Registration> {
    let response: RegisterResponse = serde_json::from_slice(body)
        .map_err(|err| Error::Transport(format!("unparseable response ({status}): {err}")))?;
    if !response.success {
        return Err(Error::Rejection(
            response
                .message
                .unwrap_or_else(|| "Failed to register voter".to_string()),
        ));
    }
    Ok(Registration {
        message: response
            .message
            .unwrap_or_else(|| "Voter registered".to_string()),
        eligible_positions: response.eligible_positions.unwrap_or_default(),
    })
}

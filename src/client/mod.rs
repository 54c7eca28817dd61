//! The submission protocol adapter: the two request/response operations the
//! session performs against the voting backend, plus the admin boundary.
//!
//! Every operation distinguishes three outcomes: the server refused with a
//! reason ([`Error::Rejection`]), the server was unreachable or made no sense
//! ([`Error::Transport`]), or it worked.

pub mod admin;

use async_trait::async_trait;
use log::{info, warn};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::RequestId;
use crate::model::api::{
    PositionsRequest, PositionsResponse, SubmitRequest, SubmitResponse, VoteEntry,
};
use crate::model::ballot::Ballot;
use crate::model::otp::Code;

/// The backend as the session sees it: verify a code into a ballot, submit
/// the final votes. The OTP is the only authentication capability either
/// operation carries.
#[async_trait]
pub trait Backend {
    /// Request the ballot for the holder of this code.
    async fn positions(&self, otp: &Code) -> Result<Ballot>;

    /// Transmit the final non-abstention votes. Returns the server's
    /// confirmation message.
    async fn submit(&self, otp: &Code, votes: &[VoteEntry]) -> Result<String>;
}

/// [`Backend`] over HTTP, against the institutional voting API.
pub struct VotingApi {
    http: reqwest::Client,
    base_url: String,
}

impl VotingApi {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url().trim_end_matches('/').to_string(),
        })
    }

    /// POST a JSON body and return the status and raw response body.
    /// Bodies are interpreted by the caller: a non-2xx status can still
    /// carry a well-formed rejection.
    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<(StatusCode, Vec<u8>)> {
        let id = RequestId::next();
        info!("->req{id} POST {path}");
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|err| {
                warn!("<-rsp{id} no response: {err}");
                Error::from(err)
            })?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|err| {
            warn!("<-rsp{id} {status} body unreadable: {err}");
            Error::from(err)
        })?;
        info!("<-rsp{id} {status} {path}");
        Ok((status, bytes.to_vec()))
    }
}

#[async_trait]
impl Backend for VotingApi {
    async fn positions(&self, otp: &Code) -> Result<Ballot> {
        let (status, body) = self
            .post("/api/voting/positions", &PositionsRequest { otp })
            .await?;
        interpret_positions(status, &body)
    }

    async fn submit(&self, otp: &Code, votes: &[VoteEntry]) -> Result<String> {
        let (status, body) = self
            .post("/api/voting/submit", &SubmitRequest { otp, votes })
            .await?;
        interpret_submit(status, &body)
    }
}

/// Parse a response body, whatever the status; an unparseable body is a
/// transport failure no matter what the server meant by it.
fn parse_body<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|err| Error::Transport(format!("unparseable response ({status}): {err}")))
}

fn interpret_positions(status: StatusCode, body: &[u8]) -> Result<Ballot> {
    let response: PositionsResponse = parse_body(status, body)?;
    if !response.success {
        return Err(Error::Rejection(
            response.message.unwrap_or_else(|| "Invalid OTP".to_string()),
        ));
    }
    let data = response.data.ok_or_else(|| {
        Error::Transport(format!("positions response missing data ({status})"))
    })?;
    Ballot::new(data.positions)
}

fn interpret_submit(status: StatusCode, body: &[u8]) -> Result<String> {
    let response: SubmitResponse = parse_body(status, body)?;
    if !response.success {
        return Err(Error::Rejection(
            response
                .message
                .unwrap_or_else(|| "Failed to submit votes".to_string()),
        ));
    }
    Ok(response
        .message
        .unwrap_or_else(|| "Votes submitted successfully".to_string()))
}

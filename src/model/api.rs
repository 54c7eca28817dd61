//! Wire-compatible types.
//!
//! The types in this module are serialised exactly as the voting backend
//! expects, e.g.:
//!
//! - OTP codes are serialised as digit strings.
//! - Vote entries use camelCase field names.
//! - Candidate URLs keep their hyphenated names.

use serde::{Deserialize, Serialize};

use crate::model::ballot::{CandidateId, Position, PositionId};
use crate::model::otp::Code;

/// Request body for `POST /api/voting/positions`.
#[derive(Debug, Serialize)]
pub struct PositionsRequest<'a> {
    pub otp: &'a Code,
}

/// Response body for `POST /api/voting/positions`.
#[derive(Debug, Deserialize)]
pub struct PositionsResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<PositionsData>,
}

#[derive(Debug, Deserialize)]
pub struct PositionsData {
    pub positions: Vec<Position>,
}

/// One non-abstention vote as transmitted to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteEntry {
    pub position_id: PositionId,
    pub candidate_id: CandidateId,
}

/// Request body for `POST /api/voting/submit`.
#[derive(Debug, Serialize)]
pub struct SubmitRequest<'a> {
    pub otp: &'a Code,
    pub votes: &'a [VoteEntry],
}

/// Response body for `POST /api/voting/submit`.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: Option<String>,
}

//! The voting session: one voter's interaction from OTP entry to
//! confirmation, modelled as an explicit state machine.
//!
//! The machine itself performs no I/O. Network operations are dispatched by
//! [`driver::VotingSession`], which feeds their outcomes back in as events.

pub mod driver;
pub mod selection;

use crate::error::{Error, Result};
use crate::model::api::VoteEntry;
use crate::model::ballot::{Ballot, Choice, Position};
use crate::model::otp::{Code, CodeEntry};

use selection::Selections;

/// Lifecycle phase of a voting session.
///
/// The two request phases (`AwaitingVerification`, `Submitting`) each have
/// exactly one request outstanding; their trigger events are no-ops while in
/// them, which is what makes both operations single-flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// Collecting OTP digits.
    #[default]
    AwaitingOtp,
    /// A verification request is in flight.
    AwaitingVerification,
    /// Ballot received; the voter is paging through positions.
    Browsing,
    /// A submission request is in flight.
    Submitting,
    /// Votes accepted; the session resets after a short hold.
    Confirmed,
}

/// A message for the voter, surfaced next to the current phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A failure reason: the server's own words, or the generic
    /// connectivity message.
    Error(String),
    /// The server's confirmation message after a successful submission.
    Confirmation(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Self::Error(text) | Self::Confirmation(text) => text,
        }
    }
}

/// A single voter's session. Owns the entered code, the ballot, the recorded
/// choices and the cursor; nothing else holds a mutable copy of any of them.
#[derive(Debug, Default)]
pub struct Session {
    entry: CodeEntry,
    ballot: Option<Ballot>,
    selections: Selections,
    cursor: usize,
    phase: Phase,
    notice: Option<Notice>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn entry(&self) -> &CodeEntry {
        &self.entry
    }

    // ------ OTP entry ------

    /// Apply a keystroke to an OTP slot. Only accepted while collecting
    /// digits; the returned focus hint is for the front-end's caret.
    pub fn set_digit(&mut self, slot: usize, input: &str) -> Option<usize> {
        if self.phase() != Phase::AwaitingOtp {
            return None;
        }
        self.entry.set_digit(slot, input)
    }

    /// The voter asked to verify. Returns the code to dispatch, or `None`
    /// when nothing should happen: the code is incomplete, or a request is
    /// already in flight, or the session is past OTP entry.
    pub fn verify_requested(&mut self) -> Option<Code> {
        if self.phase() != Phase::AwaitingOtp {
            return None;
        }
        let code = self.entry.code()?;
        self.notice = None;
        self.set_phase(Phase::AwaitingVerification);
        Some(code)
    }

    /// Verification came back with a ballot. Stale selections from any
    /// earlier attempt are dropped and browsing starts at the first position.
    pub fn verify_succeeded(&mut self, ballot: Ballot) {
        if self.phase() != Phase::AwaitingVerification {
            return;
        }
        self.selections.clear();
        self.cursor = 0;
        self.ballot = Some(ballot);
        self.notice = None;
        self.set_phase(Phase::Browsing);
    }

    /// Verification failed. The entered digits stay so the voter can retry
    /// or correct them.
    pub fn verify_failed(&mut self, err: &Error) {
        if self.phase() != Phase::AwaitingVerification {
            return;
        }
        self.notice = Some(Notice::Error(err.user_message().to_string()));
        self.set_phase(Phase::AwaitingOtp);
    }

    // ------ browsing ------

    pub fn ballot(&self) -> Option<&Ballot> {
        self.ballot.as_ref()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The position under the cursor, while a ballot is held.
    pub fn current_position(&self) -> Option<&Position> {
        self.ballot.as_ref()?.position(self.cursor)
    }

    /// The positions within `radius` of the cursor, for carousel-style
    /// presentation. The cursor's own position is always included.
    pub fn window(&self, radius: usize) -> &[Position] {
        let Some(ballot) = self.ballot.as_ref() else {
            return &[];
        };
        let start = self.cursor.saturating_sub(radius);
        let end = (self.cursor + radius).min(ballot.last_index());
        &ballot.positions()[start..=end]
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    /// The recorded choice for the position under the cursor, if any.
    pub fn current_choice(&self) -> Option<&Choice> {
        let position = self.current_position()?;
        self.selections.choice_for(&position.id)
    }

    /// Record a choice for the position under the cursor. A candidate choice
    /// must name a candidate of that position; NOTA is always valid. The
    /// cursor does not move. Ignored outside browsing.
    pub fn record_choice(&mut self, choice: Choice) -> Result<()> {
        if self.phase() != Phase::Browsing {
            return Ok(());
        }
        // Browsing implies a ballot, but stay total anyway.
        let Some(position) = self.current_position() else {
            return Ok(());
        };
        if let Choice::Candidate(candidate_id) = &choice {
            if position.candidate(candidate_id).is_none() {
                return Err(Error::Validation(format!(
                    "no candidate '{}' for position '{}'",
                    candidate_id, position.id
                )));
            }
        }
        let position_id = position.id.clone();
        self.selections.record(&position_id, choice);
        Ok(())
    }

    fn current_decided(&self) -> bool {
        self.current_position()
            .map(|position| self.selections.has_choice(&position.id))
            .unwrap_or(false)
    }

    /// `Next` is available once the current position is decided (a candidate
    /// or NOTA both count) and there are positions left.
    pub fn can_advance(&self) -> bool {
        match (self.phase(), self.ballot.as_ref()) {
            (Phase::Browsing, Some(ballot)) => {
                self.current_decided() && self.cursor < ballot.last_index()
            }
            _ => false,
        }
    }

    /// `Previous` only needs somewhere to go back to.
    pub fn can_retreat(&self) -> bool {
        self.phase() == Phase::Browsing && self.cursor > 0
    }

    /// `Submit` replaces `Next` on the last position, under the same
    /// decided-current gate.
    pub fn can_submit(&self) -> bool {
        match (self.phase(), self.ballot.as_ref()) {
            (Phase::Browsing, Some(ballot)) => {
                self.current_decided() && self.cursor == ballot.last_index()
            }
            _ => false,
        }
    }

    /// Move to the next position. Returns whether the cursor moved.
    pub fn advance(&mut self) -> bool {
        if !self.can_advance() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Move back one position. Returns whether the cursor moved.
    pub fn retreat(&mut self) -> bool {
        if !self.can_retreat() {
            return false;
        }
        self.cursor -= 1;
        true
    }

    // ------ submission ------

    /// The voter asked to submit. Returns the code and the non-abstention
    /// payload to dispatch, or `None` when the gate fails or a submission is
    /// already in flight.
    pub fn submit_requested(&mut self) -> Option<(Code, Vec<VoteEntry>)> {
        if !self.can_submit() {
            return None;
        }
        let code = self.entry.code()?;
        let ballot = self.ballot.as_ref()?;
        let payload = self.selections.to_payload(ballot);
        self.notice = None;
        self.set_phase(Phase::Submitting);
        Some((code, payload))
    }

    /// The backend accepted the votes.
    pub fn submit_succeeded(&mut self, message: String) {
        if self.phase() != Phase::Submitting {
            return;
        }
        self.notice = Some(Notice::Confirmation(message));
        self.set_phase(Phase::Confirmed);
    }

    /// The backend refused, or never answered. Browsing resumes at the same
    /// cursor with every recorded choice intact; the voter decides whether
    /// to resubmit.
    pub fn submit_failed(&mut self, err: &Error) {
        if self.phase() != Phase::Submitting {
            return;
        }
        self.notice = Some(Notice::Error(err.user_message().to_string()));
        self.set_phase(Phase::Browsing);
    }

    /// Wipe everything and await the next voter.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

use std::collections::HashMap;

use crate::model::api::VoteEntry;
use crate::model::ballot::{Ballot, Choice, PositionId};

/// The voter's recorded choices, at most one per position.
///
/// Recording a choice for a position that already has one replaces it; a
/// position simply has no entry until the voter decides. Abstentions are
/// recorded like any other choice but never leave the client.
#[derive(Debug, Clone, Default)]
pub struct Selections {
    chosen: HashMap<PositionId, Choice>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the voter's choice for a position, replacing any earlier one.
    pub fn record(&mut self, position_id: &str, choice: Choice) {
        self.chosen.insert(position_id.to_string(), choice);
    }

    pub fn choice_for(&self, position_id: &str) -> Option<&Choice> {
        self.chosen.get(position_id)
    }

    /// True iff the voter has decided this position (a candidate or NOTA).
    pub fn has_choice(&self, position_id: &str) -> bool {
        self.chosen.contains_key(position_id)
    }

    pub fn clear(&mut self) {
        self.chosen.clear();
    }

    /// Derive the outbound payload: walk the ballot in order and emit one
    /// entry per chosen candidate. Abstentions are omitted entirely.
    pub fn to_payload(&self, ballot: &Ballot) -> Vec<VoteEntry> {
        ballot
            .positions()
            .iter()
            .filter_map(|position| match self.chosen.get(&position.id) {
                Some(Choice::Candidate(candidate_id)) => Some(VoteEntry {
                    position_id: position.id.clone(),
                    candidate_id: candidate_id.clone(),
                }),
                Some(Choice::Nota) | None => None,
            })
            .collect()
    }
}

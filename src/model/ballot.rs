use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type PositionId = String;
pub type CandidateId = String;

/// Sentinel the ballot world uses for an explicit abstention.
pub const NOTA: &str = "NOTA";

/// A candidate standing for a single position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Candidate unique ID (within its position).
    pub id: CandidateId,
    /// Candidate display name.
    pub name: String,
    #[serde(rename = "photo-url")]
    pub photo_url: String,
    #[serde(rename = "manifesto-url", skip_serializing_if = "Option::is_none")]
    pub manifesto_url: Option<String>,
}

/// A single position up for election, with its ordered candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Position unique ID.
    pub id: PositionId,
    /// Position display name.
    pub name: String,
    /// Candidates standing for this position.
    pub candidates: Vec<Candidate>,
}

impl Position {
    /// Look up a candidate of this position by ID.
    pub fn candidate(&self, candidate_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == candidate_id)
    }
}

/// The full ordered set of positions for one voting session.
///
/// Validated on construction and read-only afterwards; the session never
/// mutates a ballot once the backend has issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    positions: Vec<Position>,
}

impl Ballot {
    /// Validate a server-issued sequence of positions: at least one position,
    /// each with at least one candidate, all IDs unique at their level.
    pub fn new(positions: Vec<Position>) -> Result<Self> {
        if positions.is_empty() {
            return Err(Error::Validation(
                "ballot contains no positions".to_string(),
            ));
        }
        for (index, position) in positions.iter().enumerate() {
            if positions[..index].iter().any(|p| p.id == position.id) {
                return Err(Error::Validation(format!(
                    "duplicate position ID '{}'",
                    position.id
                )));
            }
            if position.candidates.is_empty() {
                return Err(Error::Validation(format!(
                    "position '{}' has no candidates",
                    position.id
                )));
            }
            for (c_index, candidate) in position.candidates.iter().enumerate() {
                if position.candidates[..c_index]
                    .iter()
                    .any(|c| c.id == candidate.id)
                {
                    return Err(Error::Validation(format!(
                        "duplicate candidate ID '{}' for position '{}'",
                        candidate.id, position.id
                    )));
                }
            }
        }
        Ok(Self { positions })
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position(&self, index: usize) -> Option<&Position> {
        self.positions.get(index)
    }

    /// Number of positions; never zero.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn last_index(&self) -> usize {
        self.positions.len() - 1
    }
}

/// The voter's recorded choice for one position: a specific candidate, or an
/// explicit abstention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Candidate(CandidateId),
    Nota,
}

impl Choice {
    pub fn is_nota(&self) -> bool {
        matches!(self, Self::Nota)
    }
}

impl Display for Choice {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Candidate(id) => write!(formatter, "{id}"),
            Self::Nota => write!(formatter, "{NOTA}"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ballot_is_rejected() {
        assert!(matches!(Ballot::new(vec![]), Err(Error::Validation(_))));
    }

    #[test]
    fn position_without_candidates_is_rejected() {
        let positions = vec![Position {
            id: "P1".to_string(),
            name: "General Secretary".to_string(),
            candidates: vec![],
        }];
        assert!(matches!(
            Ballot::new(positions),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut positions = Ballot::example().positions.clone();
        positions[1].id = positions[0].id.clone();
        assert!(matches!(
            Ballot::new(positions),
            Err(Error::Validation(_))
        ));

        let mut positions = Ballot::example().positions.clone();
        let dup = positions[0].candidates[0].clone();
        positions[0].candidates.push(dup);
        assert!(matches!(
            Ballot::new(positions),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn candidate_lookup() {
        let ballot = Ballot::example();
        let first = ballot.position(0).unwrap();
        assert_eq!("Asha Rao", first.candidate("A").unwrap().name);
        assert!(first.candidate("C").is_none());
    }

    #[test]
    fn wire_field_names_round_trip() {
        let json = serde_json::json!({
            "id": "A",
            "name": "Asha Rao",
            "photo-url": "https://elections.example.org/photos/A.jpg",
            "manifesto-url": "https://elections.example.org/manifestos/A.pdf",
        });
        let candidate: Candidate = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(
            Some("https://elections.example.org/manifestos/A.pdf"),
            candidate.manifesto_url.as_deref()
        );
        assert_eq!(json, serde_json::to_value(&candidate).unwrap());
    }

    #[test]
    fn manifesto_is_optional() {
        let json = serde_json::json!({
            "id": "B",
            "name": "Bala Iyer",
            "photo-url": "https://elections.example.org/photos/B.jpg",
        });
        let candidate: Candidate = serde_json::from_value(json).unwrap();
        assert_eq!(None, candidate.manifesto_url);
    }
}

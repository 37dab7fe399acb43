use crate::models::{TeamId, TeamRoster, VoteEvent};

pub const MAX_TEAM_ID_LENGTH: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing team in vote")]
    MissingTeam,
    #[error("Team id exceeds maximum length of {MAX_TEAM_ID_LENGTH}")]
    TeamIdTooLong,
    #[error("Unknown team: {0}")]
    UnknownTeam(String),
    #[error("Malformed vote payload: {0}")]
    MalformedPayload(String),
    #[error("Failed to encode vote: {0}")]
    Encode(String),
}

/// Resolves a submitted team id against the roster.
pub fn validate_team(raw: &str, roster: &TeamRoster) -> Result<TeamId, ValidationError> {
    let id = check_team_id(raw)?;
    roster
        .find(id)
        .cloned()
        .ok_or_else(|| ValidationError::UnknownTeam(id.to_string()))
}

/// Shape check only, no roster membership.
pub fn parse_team(raw: &str) -> Result<TeamId, ValidationError> {
    check_team_id(raw).map(TeamId::new)
}

fn check_team_id(raw: &str) -> Result<&str, ValidationError> {
    let id = raw.trim();
    if id.is_empty() { return Err(ValidationError::MissingTeam); }
    if id.len() > MAX_TEAM_ID_LENGTH { return Err(ValidationError::TeamIdTooLong); }
    Ok(id)
}

/// Compact JSON, `{"team":"7"}`. This is the format the queue consumer parses.
pub fn encode_vote(vote: &VoteEvent) -> Result<Vec<u8>, ValidationError> {
    serde_json::to_vec(vote).map_err(|e| ValidationError::Encode(e.to_string()))
}

pub fn decode_vote(payload: &[u8]) -> Result<VoteEvent, ValidationError> {
    serde_json::from_slice(payload).map_err(|e| ValidationError::MalformedPayload(e.to_string()))
}

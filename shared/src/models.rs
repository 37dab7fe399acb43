use serde::{Serialize, Deserialize, Serializer, ser::SerializeMap};
use std::fmt;

/// Prefix of every counter key in the tally store, e.g. `team3`.
pub const COUNTER_KEY_PREFIX: &str = "team";

/// Opaque identifier of a competing team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(String);

impl TeamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the consumer keeps this team's count.
    pub fn counter_key(&self) -> String {
        format!("{COUNTER_KEY_PREFIX}{}", self.0)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, read-only list of the teams competing for this process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamRoster(Vec<TeamId>);

impl TeamRoster {
    /// Roster `1..=count`, the numbering used by the voting pages.
    pub fn sequential(count: u32) -> Self {
        Self((1..=count).map(|n| TeamId::new(n.to_string())).collect())
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(TeamId::new).collect())
    }

    pub fn find(&self, id: &str) -> Option<&TeamId> {
        self.0.iter().find(|team| team.as_str() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TeamId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single vote as it travels through the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEvent {
    pub team: TeamId,
}

impl VoteEvent {
    pub fn new(team: TeamId) -> Self {
        Self { team }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyEntry {
    pub key: String,
    pub count: u64,
}

/// Per-team counts in roster order. Serializes as a JSON object whose
/// keys keep that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallyResult {
    entries: Vec<TallyEntry>,
}

impl TallyResult {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    pub fn push(&mut self, team: &TeamId, count: Option<u64>) {
        self.entries.push(TallyEntry {
            key: team.counter_key(),
            count: count.unwrap_or(0),
        });
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries.iter().find(|e| e.key == key).map(|e| e.count)
    }

    pub fn entries(&self) -> &[TallyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }
}

impl Serialize for TallyResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key, &entry.count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterResponse {
    pub teams_competing: TeamRoster,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub last_vote: TeamId,
    pub teams_competing: TeamRoster,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyResponse {
    pub team_votes_total: TallyResult,
}

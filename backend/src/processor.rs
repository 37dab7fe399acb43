use tracing::{debug, info, instrument};
use vote_shared::{encode_vote, parse_team, validate_team, TallyResult, TeamId, TeamRoster, VoteEvent};

use crate::error::ApiError;
use crate::queue::VotePublisher;
use crate::store::CounterReader;

pub struct VoteProcessor;

impl VoteProcessor {
    /// Publishes one vote and returns the team it was cast for. Returns once
    /// the broker has the message; the tally catches up when the consumer
    /// gets to it.
    #[instrument(skip(publisher, roster))]
    pub async fn submit_vote(
        publisher: &dyn VotePublisher,
        roster: &TeamRoster,
        raw_team: &str,
        validate: bool,
    ) -> Result<TeamId, ApiError> {
        let team = if validate {
            validate_team(raw_team, roster)?
        } else {
            parse_team(raw_team)?
        };

        let payload = encode_vote(&VoteEvent::new(team.clone()))?;
        publisher.queue_message(&payload).await?;

        info!("Vote queued for team {}", team);
        Ok(team)
    }

    /// Reads one counter per roster entry, in roster order. Any store
    /// failure fails the whole tally.
    pub async fn tally(store: &dyn CounterReader, roster: &TeamRoster) -> Result<TallyResult, ApiError> {
        let mut result = TallyResult::with_capacity(roster.len());

        for team in roster.iter() {
            let count = store.get_key(&team.counter_key()).await?;
            result.push(team, count.map(|n| u64::try_from(n).unwrap_or(0)));
        }

        debug!("Tally read for {} teams, {} votes", result.len(), result.total());
        Ok(result)
    }
}

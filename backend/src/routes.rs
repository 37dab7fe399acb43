use std::sync::Arc;

use rocket::form::{Form, FromForm};
use rocket::serde::json::Json;
use rocket::{get, post, State};
use tracing::{error, instrument};
use vote_shared::{RosterResponse, TallyResponse, TeamRoster, VoteResponse};

use crate::error::{ApiError, RegistryError};
use crate::processor::VoteProcessor;
use crate::queue::{QueueProducer, VotePublisher};
use crate::registry::{ExtensionRegistry, QUEUE_EXTENSION, STORE_EXTENSION};
use crate::store::{CounterReader, CounterStore};

/// Everything a request needs, resolved once at boot and injected into
/// Rocket's managed state.
pub struct AppState {
    pub roster: TeamRoster,
    pub publisher: Arc<dyn VotePublisher>,
    pub store: Arc<dyn CounterReader>,
    pub validate_votes: bool,
}

impl AppState {
    pub fn new(
        roster: TeamRoster,
        publisher: Arc<dyn VotePublisher>,
        store: Arc<dyn CounterReader>,
        validate_votes: bool,
    ) -> Self {
        Self { roster, publisher, store, validate_votes }
    }

    pub fn from_registry(
        registry: &ExtensionRegistry,
        roster: TeamRoster,
        validate_votes: bool,
    ) -> Result<Self, RegistryError> {
        let publisher = registry.get::<QueueProducer>(QUEUE_EXTENSION)?;
        let store = registry.get::<CounterStore>(STORE_EXTENSION)?;
        Ok(Self::new(roster, publisher, store, validate_votes))
    }
}

#[derive(Debug, FromForm)]
pub struct VoteForm {
    pub vote: Option<String>,
}

#[get("/")]
pub async fn teams(state: &State<AppState>) -> Json<RosterResponse> {
    Json(RosterResponse {
        teams_competing: state.roster.clone(),
    })
}

#[instrument(skip(state, form))]
#[post("/", data = "<form>")]
pub async fn place_vote(state: &State<AppState>, form: Form<VoteForm>) -> Result<Json<VoteResponse>, ApiError> {
    let raw_team = form.into_inner().vote.unwrap_or_default();

    let last_vote = VoteProcessor::submit_vote(
        state.publisher.as_ref(),
        &state.roster,
        &raw_team,
        state.validate_votes,
    )
    .await
    .map_err(|e| {
        error!("Vote submission failed: {}", e);
        e
    })?;

    Ok(Json(VoteResponse {
        last_vote,
        teams_competing: state.roster.clone(),
    }))
}

#[get("/votes")]
pub async fn votes(state: &State<AppState>) -> Result<Json<TallyResponse>, ApiError> {
    VoteProcessor::tally(state.store.as_ref(), &state.roster)
        .await
        .map(|team_votes_total| Json(TallyResponse { team_votes_total }))
        .map_err(|e| {
            error!("Tally failed: {}", e);
            e
        })
}

#[get("/health")]
pub async fn health() -> &'static str {
    "ok"
}

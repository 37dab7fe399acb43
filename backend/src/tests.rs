#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use rocket::figment::{providers::Serialized, Figment};
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::Value;
    use vote_shared::{decode_vote, TeamId, TeamRoster};

    use crate::bootstrap::{build_registry, build_rocket, prepare, start, startup_signal};
    use crate::config::AppConfig;
    use crate::error::{ApiError, BootError, PublishError, RegistryError, SignalError, StartupError, StoreError};
    use crate::processor::VoteProcessor;
    use crate::queue::{QueueProducer, VotePublisher};
    use crate::registry::{Extension, ExtensionRegistry, Lifecycle, QUEUE_EXTENSION, STORE_EXTENSION};
    use crate::routes::AppState;
    use crate::signal::{StartProducers, StartupHook, StartupSignal};
    use crate::store::{CounterReader, CounterStore};

    const UNREACHABLE: &str = "redis://127.0.0.1:1/";

    #[derive(Default)]
    struct MemoryQueue {
        messages: Mutex<Vec<Vec<u8>>>,
        failing: bool,
    }

    impl MemoryQueue {
        fn failing() -> Self {
            Self { failing: true, ..Self::default() }
        }

        fn drain(&self) -> Vec<Vec<u8>> {
            std::mem::take(&mut *self.messages.lock().unwrap())
        }

        fn len(&self) -> usize {
            self.messages.lock().unwrap().len()
        }
    }

    #[rocket::async_trait]
    impl VotePublisher for MemoryQueue {
        async fn queue_message(&self, payload: &[u8]) -> Result<(), PublishError> {
            if self.failing {
                return Err(PublishError::Rejected("broker down".into()));
            }
            self.messages.lock().unwrap().push(payload.to_vec());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        counters: Mutex<HashMap<String, i64>>,
        failing: bool,
    }

    impl MemoryStore {
        fn incr(&self, key: &str) {
            *self.counters.lock().unwrap().entry(key.to_string()).or_insert(0) += 1;
        }
    }

    #[rocket::async_trait]
    impl CounterReader for MemoryStore {
        async fn get_key(&self, key: &str) -> Result<Option<i64>, StoreError> {
            if self.failing {
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            Ok(self.counters.lock().unwrap().get(key).copied())
        }
    }

    /// Stands in for the consumer process: one increment per message.
    fn consume(messages: Vec<Vec<u8>>, store: &MemoryStore) {
        for message in messages {
            let vote = decode_vote(&message).unwrap();
            store.incr(&vote.team.counter_key());
        }
    }

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
        fail: bool,
    }

    #[rocket::async_trait]
    impl Lifecycle for Recorder {
        async fn start(&self) -> Result<(), StartupError> {
            self.log.lock().unwrap().push(format!("start:{}", self.name));
            if self.fail {
                return Err(StartupError::Connect { extension: "recorder", reason: "refused".into() });
            }
            Ok(())
        }
    }

    impl Extension for Recorder {
        fn lifecycle(&self) -> Option<&dyn Lifecycle> {
            Some(self)
        }
    }

    struct Passive;

    impl Extension for Passive {}

    struct LogHook {
        name: &'static str,
        log: Log,
    }

    #[rocket::async_trait]
    impl StartupHook for LogHook {
        fn name(&self) -> &str {
            self.name
        }

        async fn on_start(&self, registry: &ExtensionRegistry) -> Result<(), StartupError> {
            self.log.lock().unwrap().push(format!("hook:{}:{}", self.name, registry.len()));
            Ok(())
        }
    }

    fn recorder(name: &'static str, log: &Log) -> Arc<Recorder> {
        Arc::new(Recorder { name, log: log.clone(), fail: false })
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    fn test_config(broker_url: &str) -> AppConfig {
        AppConfig {
            broker_url: broker_url.into(),
            store_url: UNREACHABLE.into(),
            io_timeout_ms: 300,
            ..AppConfig::default()
        }
    }

    async fn client(queue: Arc<MemoryQueue>, store: Arc<MemoryStore>, validate: bool) -> Client {
        let state = AppState::new(TeamRoster::sequential(14), queue, store, validate);
        Client::tracked(build_rocket(rocket::Config::figment(), state)).await.unwrap()
    }

    #[test]
    fn test_registry_get_returns_registered_instance() {
        let log = Log::default();
        let mut registry = ExtensionRegistry::new();
        let instance = recorder("queue", &log);
        registry.register("queue", instance.clone()).unwrap();

        let fetched = registry.get::<Recorder>("queue").unwrap();
        assert!(Arc::ptr_eq(&instance, &fetched));
        assert!(registry.contains("queue"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_errors() {
        let log = Log::default();
        let mut registry = ExtensionRegistry::new();
        registry.register("queue", recorder("queue", &log)).unwrap();

        assert!(matches!(registry.get::<Recorder>("missing"), Err(RegistryError::NotFound(n)) if n == "missing"));
        assert_eq!(
            registry.register("queue", recorder("again", &log)).unwrap_err(),
            RegistryError::AlreadyRegistered("queue".into())
        );
        assert!(matches!(registry.get::<Passive>("queue"), Err(RegistryError::TypeMismatch(_))));
    }

    #[test]
    fn test_build_registry_holds_both_extensions() {
        let registry = build_registry(&AppConfig::default()).unwrap();
        let producer = registry.get::<QueueProducer>(QUEUE_EXTENSION).unwrap();
        let store = registry.get::<CounterStore>(STORE_EXTENSION).unwrap();
        assert_eq!(producer.queue_name(), "votes");
        assert!(!producer.is_connected());
        assert!(!store.is_connected());
    }

    #[tokio::test]
    async fn test_signal_starts_extensions_in_registration_order() {
        let log = Log::default();
        let mut registry = ExtensionRegistry::new();
        registry.register("queue", recorder("queue", &log)).unwrap();
        registry.register("passive", Arc::new(Passive)).unwrap();
        registry.register("store", recorder("store", &log)).unwrap();

        let mut signal = StartupSignal::new();
        signal.connect(LogHook { name: "first", log: log.clone() }).unwrap();
        signal.connect(StartProducers).unwrap();
        signal.connect(LogHook { name: "last", log: log.clone() }).unwrap();

        signal.fire(&registry).await.unwrap();

        assert_eq!(
            entries(&log),
            vec!["hook:first:3", "start:queue", "start:store", "hook:last:3"]
        );
        assert!(signal.has_fired());
    }

    #[tokio::test]
    async fn test_signal_fires_once() {
        let log = Log::default();
        let mut registry = ExtensionRegistry::new();
        registry.register("queue", recorder("queue", &log)).unwrap();

        let mut signal = startup_signal().unwrap();
        signal.fire(&registry).await.unwrap();

        assert!(matches!(signal.fire(&registry).await, Err(SignalError::InvalidState)));
        assert!(matches!(signal.connect(StartProducers), Err(SignalError::InvalidState)));
        assert_eq!(entries(&log), vec!["start:queue"]);
    }

    #[tokio::test]
    async fn test_failed_start_aborts_boot() {
        let log = Log::default();
        let mut registry = ExtensionRegistry::new();
        registry.register("queue", Arc::new(Recorder { name: "queue", log: log.clone(), fail: true })).unwrap();
        registry.register("store", recorder("store", &log)).unwrap();

        let signal = startup_signal().unwrap();
        let result = start(registry, &signal).await;

        assert!(matches!(result, Err(BootError::Startup(StartupError::Connect { .. }))));
        assert_eq!(entries(&log), vec!["start:queue"]);
    }

    #[tokio::test]
    async fn test_queue_message_before_start_fails() {
        let producer = QueueProducer::new(UNREACHABLE, "votes", Duration::from_millis(300));
        assert!(matches!(producer.queue_message(br#"{"team":"1"}"#).await, Err(PublishError::NotConnected)));

        let store = CounterStore::new(UNREACHABLE, Duration::from_millis(300));
        assert!(matches!(store.get_key("team1").await, Err(StoreError::NotConnected)));
    }

    #[tokio::test]
    async fn test_producer_start_against_dead_broker() {
        let producer = QueueProducer::new(UNREACHABLE, "votes", Duration::from_millis(300));
        let result = producer.start().await;

        assert!(matches!(result, Err(StartupError::Connect { .. } | StartupError::Timeout { .. })));
        assert!(!producer.is_connected());
    }

    #[tokio::test]
    async fn test_producer_rejects_bad_url() {
        let producer = QueueProducer::new("not a url", "votes", Duration::from_millis(300));
        assert!(matches!(producer.start().await, Err(StartupError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_boot_aborts_when_broker_is_down() {
        let figment = Figment::from(rocket::Config::default())
            .merge(Serialized::defaults(test_config(UNREACHABLE)));

        let result = prepare(figment).await;
        assert!(matches!(result, Err(BootError::Startup(_))));
    }

    #[tokio::test]
    async fn test_boot_rejects_empty_roster() {
        let config = AppConfig { team_count: 0, ..test_config(UNREACHABLE) };
        let figment = Figment::from(rocket::Config::default()).merge(Serialized::defaults(config));

        assert!(matches!(prepare(figment).await, Err(BootError::Config(_))));
    }

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::load(&Figment::from(Serialized::defaults(AppConfig::default()))).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.roster(), TeamRoster::sequential(14));
        assert_eq!(config.io_timeout(), Duration::from_secs(2));
        assert!(config.validate_votes);
    }

    #[tokio::test]
    async fn test_submit_vote_publishes_once() {
        let queue = MemoryQueue::default();
        let roster = TeamRoster::sequential(14);

        let team = VoteProcessor::submit_vote(&queue, &roster, "7", true).await.unwrap();

        assert_eq!(team, TeamId::new("7"));
        let messages = queue.drain();
        assert_eq!(messages.len(), 1);
        assert_eq!(decode_vote(&messages[0]).unwrap().team, TeamId::new("7"));
    }

    #[tokio::test]
    async fn test_submit_vote_rejects_unknown_team() {
        let queue = MemoryQueue::default();
        let roster = TeamRoster::sequential(14);

        for raw in ["15", "", "seven"] {
            let err = VoteProcessor::submit_vote(&queue, &roster, raw, true).await.unwrap_err();
            assert!(matches!(err, ApiError::InvalidVote(_)));
            assert_eq!(err.status(), Status::BadRequest);
        }
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn test_permissive_mode_publishes_unknown_team() {
        let queue = MemoryQueue::default();
        let roster = TeamRoster::sequential(14);

        VoteProcessor::submit_vote(&queue, &roster, "99", false).await.unwrap();
        assert!(VoteProcessor::submit_vote(&queue, &roster, " ", false).await.is_err());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_is_service_unavailable() {
        let queue = MemoryQueue::failing();
        let err = VoteProcessor::submit_vote(&queue, &TeamRoster::sequential(14), "3", true)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Publish(PublishError::Rejected(_))));
        assert_eq!(err.status(), Status::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_tally_before_any_consumption_is_zero() {
        let store = MemoryStore::default();
        let roster = TeamRoster::sequential(14);

        for team in roster.iter() {
            assert_eq!(store.get_key(&team.counter_key()).await.unwrap(), None);
        }

        let tally = VoteProcessor::tally(&store, &roster).await.unwrap();
        assert_eq!(tally.len(), 14);
        assert_eq!(tally.total(), 0);
        let keys: Vec<_> = tally.entries().iter().map(|e| e.key.clone()).collect();
        let expected: Vec<_> = (1..=14).map(|n| format!("team{n}")).collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_vote_reaches_tally_after_consumption() {
        let queue = MemoryQueue::default();
        let store = MemoryStore::default();
        let roster = TeamRoster::sequential(14);

        VoteProcessor::submit_vote(&queue, &roster, "7", true).await.unwrap();
        let before = VoteProcessor::tally(&store, &roster).await.unwrap();
        assert_eq!(before.get("team7"), Some(0));

        consume(queue.drain(), &store);

        let after = VoteProcessor::tally(&store, &roster).await.unwrap();
        for entry in after.entries() {
            let expected = if entry.key == "team7" { 1 } else { 0 };
            assert_eq!(entry.count, expected, "{}", entry.key);
        }
    }

    #[tokio::test]
    async fn test_redelivery_is_counted_by_consumer() {
        let queue = MemoryQueue::default();
        let store = MemoryStore::default();
        let roster = TeamRoster::sequential(14);

        VoteProcessor::submit_vote(&queue, &roster, "2", true).await.unwrap();
        let messages = queue.drain();
        consume(messages.clone(), &store);
        consume(messages, &store);

        let tally = VoteProcessor::tally(&store, &roster).await.unwrap();
        assert_eq!(tally.get("team2"), Some(2));
    }

    #[tokio::test]
    async fn test_tally_fails_when_store_is_down() {
        let store = MemoryStore { failing: true, ..MemoryStore::default() };
        let err = VoteProcessor::tally(&store, &TeamRoster::sequential(14)).await.unwrap_err();

        assert!(matches!(err, ApiError::Store(StoreError::Unavailable(_))));
        assert_eq!(err.status(), Status::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_concurrent_votes_all_published() {
        let queue = Arc::new(MemoryQueue::default());
        let roster = Arc::new(TeamRoster::sequential(14));

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let queue = queue.clone();
                let roster = roster.clone();
                tokio::spawn(async move {
                    let team = (i % 14 + 1).to_string();
                    VoteProcessor::submit_vote(queue.as_ref(), &roster, &team, true).await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(queue.len(), 50);
    }

    #[rocket::async_test]
    async fn test_http_roster() {
        let client = client(Arc::default(), Arc::default(), true).await;
        let response = client.get("/").dispatch().await;

        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        let teams = body["teamsCompeting"].as_array().unwrap();
        assert_eq!(teams.len(), 14);
        assert_eq!(teams[0], "1");
    }

    #[rocket::async_test]
    async fn test_http_vote_then_tally() {
        let queue = Arc::new(MemoryQueue::default());
        let store = Arc::new(MemoryStore::default());
        let client = client(queue.clone(), store.clone(), true).await;

        let response = client
            .post("/")
            .header(ContentType::Form)
            .body("vote=7")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["lastVote"], "7");

        consume(queue.drain(), &store);

        let response = client.get("/votes").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        let totals = body["teamVotesTotal"].as_object().unwrap();
        assert_eq!(totals.len(), 14);
        assert_eq!(totals["team7"], 1);
        assert_eq!(totals["team1"], 0);
        assert_eq!(totals["team14"], 0);
    }

    #[rocket::async_test]
    async fn test_http_invalid_vote_is_bad_request() {
        let queue = Arc::new(MemoryQueue::default());
        let client = client(queue.clone(), Arc::default(), true).await;

        for body in ["vote=42", "vote=", "other=1"] {
            let response = client
                .post("/")
                .header(ContentType::Form)
                .body(body)
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::BadRequest, "{body}");
            let json: Value = response.into_json().await.unwrap();
            assert_eq!(json["code"], "invalidInput");
        }
        assert_eq!(queue.len(), 0);
    }

    #[rocket::async_test]
    async fn test_http_backend_failures_are_503() {
        let client = client(
            Arc::new(MemoryQueue::failing()),
            Arc::new(MemoryStore { failing: true, ..MemoryStore::default() }),
            true,
        )
        .await;

        let response = client
            .post("/")
            .header(ContentType::Form)
            .body("vote=1")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::ServiceUnavailable);

        let response = client.get("/votes").dispatch().await;
        assert_eq!(response.status(), Status::ServiceUnavailable);

        let response = client.get("/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[rocket::async_test]
    async fn test_http_unknown_route_uses_catcher() {
        let client = client(Arc::default(), Arc::default(), true).await;
        let response = client.get("/nowhere").dispatch().await;

        assert_eq!(response.status(), Status::NotFound);
        let json: Value = response.into_json().await.unwrap();
        assert_eq!(json["status"], 404);
    }
}

//! Integration tests for the request client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pokevault_fetch::testing::MockTransport;
use pokevault_fetch::{
    DefaultStrategy, ErrorKind, ErrorPresenter, ExecuteFn, OptimizationConfig,
    OptimizationStrategy, OptimizingExecutor, PipelineSettings, ReferenceFlattener, RequestBody,
    RequestClient, RequestError, RequestHints, RequestOptions, TransportResponse,
};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize, PartialEq)]
struct Card {
    id: String,
    name: String,
}

#[derive(Default)]
struct RecordingPresenter {
    seen: Mutex<Vec<(ErrorKind, Option<String>)>>,
}

impl RecordingPresenter {
    fn seen(&self) -> Vec<(ErrorKind, Option<String>)> {
        self.seen.lock().unwrap().clone()
    }
}

impl ErrorPresenter for RecordingPresenter {
    fn present(&self, error: &RequestError, message: Option<&str>) {
        self.seen
            .lock()
            .unwrap()
            .push((error.kind(), message.map(str::to_string)));
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn client_with(mock: &Arc<MockTransport>, presenter: &Arc<RecordingPresenter>) -> RequestClient {
    RequestClient::builder(mock.clone())
        .presenter(presenter.clone())
        .build()
}

#[tokio::test]
async fn test_fetch_returns_envelope_data() {
    init_tracing();
    let mock = MockTransport::always(TransportResponse::envelope(
        200,
        json!({"id": "base1-4", "name": "Charizard"}),
    ))
    .shared();
    let client = RequestClient::new(mock.clone());

    let card: Card = client
        .fetch_by_id("/cards/", " base1-4 ", RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(
        card,
        Card {
            id: "base1-4".into(),
            name: "Charizard".into()
        }
    );
    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::GET);
    assert_eq!(requests[0].path, "/cards/base1-4");
}

#[tokio::test]
async fn test_identifier_writes_target_exact_path() {
    let mock = MockTransport::echo().shared();
    let client = RequestClient::builder(mock.clone())
        .normalizer(Arc::new(ReferenceFlattener::default()))
        .build();
    let body = json!({"card": {"id": "base1-4", "name": "Charizard"}, "price": 420});
    let flattened = json!({"card": "base1-4", "price": 420});

    let created: Value = client
        .create_at_id("/sales/", " s-1 ", &body, RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(created, flattened);

    let replaced: Value = client
        .replace_by_id("/sales/", "s-1", &body, RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(replaced, flattened);

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[1].method, Method::PUT);
    for request in &requests {
        assert_eq!(request.path, "/sales/s-1");
        assert_eq!(request.body, Some(RequestBody::Json(flattened.clone())));
    }
}

#[tokio::test]
async fn test_invalid_identifiers_never_reach_transport() {
    let mock = MockTransport::echo().shared();
    let presenter = Arc::new(RecordingPresenter::default());
    let client = client_with(&mock, &presenter);

    let long = "x".repeat(101);
    for raw in ["", "   ", "null", " undefined ", "[object Object]", long.as_str()] {
        let err = client
            .fetch_by_id::<Value, _>("/cards", raw, RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{raw:?}");

        let err = client
            .replace_by_id::<Value, _, _>("/cards", raw, &json!({}), RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = client
            .remove_by_id("/cards", raw, RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = client
            .fetch_batched::<Value, _>("/cards", raw, RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    let missing: Option<&str> = None;
    let err = client
        .create_at_id::<Value, _, _>("/cards", &missing, &json!({}), RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(mock.call_count(), 0);
    assert!(presenter.seen().is_empty());
}

#[tokio::test]
async fn test_remove_results() {
    let mock = MockTransport::always(TransportResponse::empty(204)).shared();
    let client = RequestClient::new(mock.clone());
    let removed = client
        .remove_by_id("/cards", "base1-4", RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(removed, None);
    assert_eq!(mock.requests()[0].method, Method::DELETE);

    let mock = MockTransport::always(TransportResponse::envelope(200, Value::Null)).shared();
    let removed = RequestClient::new(mock)
        .remove("/cards/base1-4", RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(removed, None);

    let mock = MockTransport::always(TransportResponse::new(200, "OK")).shared();
    let removed = RequestClient::new(mock)
        .remove("/cards/base1-4", RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(removed, Some(json!("OK")));
}

#[tokio::test]
async fn test_non_success_status_is_transport_error() {
    init_tracing();
    let mock = MockTransport::always(TransportResponse::new(
        404,
        r#"{"success":false,"message":"card not found"}"#,
    ))
    .shared();
    let presenter = Arc::new(RecordingPresenter::default());
    let client = client_with(&mock, &presenter);

    let err = client
        .fetch::<Value>(
            "/cards/missing",
            RequestOptions::new().error_message("Could not load card"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.status(), Some(404));
    assert!(matches!(
        err,
        RequestError::Transport { ref message, .. } if message == "card not found"
    ));
    assert_eq!(
        presenter.seen(),
        vec![(ErrorKind::Transport, Some("Could not load card".to_string()))]
    );

    let err = client
        .fetch::<Value>("/cards/missing", RequestOptions::new().suppress_error_toast())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(presenter.seen().len(), 1);
}

#[tokio::test]
async fn test_transform_errors() {
    let mock = MockTransport::always(TransportResponse::new(
        200,
        r#"{"success":false,"data":null}"#,
    ))
    .shared();
    let err = RequestClient::new(mock)
        .fetch::<Value>("/cards", RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transform);

    let mock = MockTransport::always(TransportResponse::new(200, "<html></html>")).shared();
    let err = RequestClient::new(mock)
        .fetch::<Value>("/cards", RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transform);

    let mock =
        MockTransport::always(TransportResponse::envelope(200, json!("not a card"))).shared();
    let err = RequestClient::new(mock)
        .fetch::<Card>("/cards/base1-4", RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transform);
}

#[tokio::test]
async fn test_normalizer_applies_to_json_only() {
    let mock = MockTransport::echo().shared();
    let client = RequestClient::builder(mock.clone())
        .normalizer(Arc::new(ReferenceFlattener::default()))
        .build();

    let sent: Value = client
        .create(
            "/sales",
            &json!({"card": {"id": "base1-4", "name": "Charizard"}, "price": 420}),
            RequestOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(sent, json!({"card": "base1-4", "price": 420}));

    let image = vec![0x89, b'P', b'N', b'G'];
    let _: Value = client
        .upload("/cards/base1-4/images", image.clone(), "image/png", RequestOptions::new())
        .await
        .unwrap();

    let requests = mock.requests();
    assert_eq!(requests[1].method, Method::POST);
    assert_eq!(
        requests[1].body,
        Some(RequestBody::Binary {
            bytes: image,
            content_type: "image/png".into()
        })
    );
}

#[tokio::test]
async fn test_transport_options_pass_through() {
    let mock = MockTransport::echo().shared();
    let client = RequestClient::new(mock.clone());

    let _: Value = client
        .fetch(
            "/cards/search",
            RequestOptions::new()
                .query("q", "mew")
                .header("x-collection", "main"),
        )
        .await
        .unwrap();

    let request = &mock.requests()[0];
    assert_eq!(request.query, vec![("q".to_string(), "mew".to_string())]);
    assert_eq!(request.headers.get("x-collection").unwrap(), "main");
}

struct CountingStrategy {
    calls: AtomicUsize,
}

#[async_trait]
impl OptimizationStrategy for CountingStrategy {
    fn name(&self) -> &str {
        "counting"
    }

    async fn optimize(
        &self,
        execute: ExecuteFn,
        _hints: &RequestHints,
        _config: &OptimizationConfig,
    ) -> Result<TransportResponse, RequestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        execute().await
    }
}

#[tokio::test]
async fn test_custom_strategy_wraps_every_call() {
    let mock = MockTransport::echo().shared();
    let strategy = Arc::new(CountingStrategy {
        calls: AtomicUsize::new(0),
    });
    let client = RequestClient::builder(mock.clone())
        .strategy(strategy.clone())
        .build();
    assert_eq!(client.strategy_name(), "counting");

    let _: Value = client.fetch("/cards", RequestOptions::new()).await.unwrap();
    let _: Value = client
        .replace("/cards/c1", &json!({"name": "Mew"}), RequestOptions::new())
        .await
        .unwrap();
    client.remove("/cards/c1", RequestOptions::new()).await.unwrap();

    assert_eq!(strategy.calls.load(Ordering::SeqCst), 3);
    assert_eq!(mock.call_count(), 3);
}

#[derive(Default)]
struct RecordingExecutor {
    seen: Mutex<Vec<(Method, bool, bool)>>,
}

#[async_trait]
impl OptimizingExecutor for RecordingExecutor {
    async fn execute(
        &self,
        execute: ExecuteFn,
        hints: &RequestHints,
        config: &OptimizationConfig,
    ) -> Result<TransportResponse, RequestError> {
        self.seen.lock().unwrap().push((
            hints.method.clone(),
            config.enable_cache,
            config.enable_deduplication,
        ));
        execute().await
    }
}

#[tokio::test]
async fn test_executor_receives_verb_defaults() {
    let mock = MockTransport::echo().shared();
    let executor = Arc::new(RecordingExecutor::default());
    let client = RequestClient::builder(mock.clone())
        .strategy(Arc::new(DefaultStrategy::with_executor(executor.clone())))
        .build();

    let _: Value = client.fetch("/cards", RequestOptions::new()).await.unwrap();
    let _: Value = client
        .create("/cards", &json!({"name": "Mew"}), RequestOptions::new())
        .await
        .unwrap();
    client.remove("/cards/c1", RequestOptions::new()).await.unwrap();
    let _: Value = client
        .fetch("/cards", RequestOptions::new().cache(false).dedupe(false))
        .await
        .unwrap();

    assert_eq!(
        *executor.seen.lock().unwrap(),
        vec![(Method::GET, true, true), (Method::POST, false, true)]
    );
    assert_eq!(mock.call_count(), 4);
}

#[test]
fn test_client_from_default_settings() {
    let client = RequestClient::from_settings(&PipelineSettings::default()).unwrap();
    assert_eq!(client.strategy_name(), "default");
    assert_eq!(client.batch_processor_count(), 0);
}

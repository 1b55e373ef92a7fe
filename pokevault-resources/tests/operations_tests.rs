//! Integration tests for generated resource operations.

use std::sync::Arc;

use chrono::NaiveDate;
use pokevault_fetch::testing::MockTransport;
use pokevault_fetch::{ErrorKind, RequestBody, RequestClient, RequestOptions, TransportResponse};
use pokevault_resources::{
    CanonicalId, Capability, ExportFormat, ExportRequest, ResourceCatalog, ResourceDescriptor,
    ResourceFeatures, ResourceKind, ResourceOperations, SaleDetails, create_operations,
};
use reqwest::Method;
use serde_json::{Value, json};

fn cards(client: &RequestClient) -> ResourceOperations {
    create_operations(
        client,
        ResourceDescriptor::new("/cards", "card"),
        ResourceFeatures::all(),
    )
}

fn calls(mock: &MockTransport) -> Vec<(Method, String)> {
    mock.requests()
        .into_iter()
        .map(|r| (r.method, r.path))
        .collect()
}

#[tokio::test]
async fn test_get_by_id_composes_exact_path() {
    let mock = MockTransport::echo().shared();
    let client = RequestClient::new(mock.clone());
    let ops = cards(&client);

    let _: Value = ops.get_by_id("abc123", RequestOptions::new()).await.unwrap();
    assert_eq!(calls(&mock), vec![(Method::GET, "/cards/abc123".to_string())]);

    let err = ops
        .get_by_id::<Value, _>("", RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_path_conventions() {
    let mock = MockTransport::echo().shared();
    let client = RequestClient::new(mock.clone());
    let ops = cards(&client);
    let body = json!({"name": "Blastoise"});

    let _: Value = ops.get_all(&[("page", "2")], RequestOptions::new()).await.unwrap();
    let _: Value = ops.create(&body, RequestOptions::new()).await.unwrap();
    let _: Value = ops.update("c1", &body, RequestOptions::new()).await.unwrap();
    ops.remove("c1", RequestOptions::new()).await.unwrap();
    let _: Value = ops
        .search("charizard", &[("set", "base1")], RequestOptions::new())
        .await
        .unwrap();
    let _: Value = ops
        .bulk_create(&[body.clone(), body.clone()], RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(
        calls(&mock),
        vec![
            (Method::GET, "/cards".to_string()),
            (Method::POST, "/cards".to_string()),
            (Method::PUT, "/cards/c1".to_string()),
            (Method::DELETE, "/cards/c1".to_string()),
            (Method::GET, "/cards/search".to_string()),
            (Method::POST, "/cards/bulk".to_string()),
        ]
    );

    let requests = mock.requests();
    assert_eq!(requests[0].query, vec![("page".to_string(), "2".to_string())]);
    assert_eq!(
        requests[4].query,
        vec![
            ("q".to_string(), "charizard".to_string()),
            ("set".to_string(), "base1".to_string())
        ]
    );
    assert_eq!(
        requests[5].body,
        Some(RequestBody::Json(json!({"items": [body.clone(), body]})))
    );
}

#[tokio::test]
async fn test_optional_operations() {
    let mock = MockTransport::echo().shared();
    let client = RequestClient::new(mock.clone());
    let ops = cards(&client);
    assert_eq!(ops.capabilities(), Capability::ALL.to_vec());

    let sale = SaleDetails {
        price: 420.0,
        sold_on: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        platform: None,
        buyer: Some("b-77".into()),
    };
    let echoed: Value = ops
        .mark_sold()
        .unwrap()
        .run("c1", &sale, RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(echoed["soldOn"], "2024-05-01");

    let export = ExportRequest {
        ids: vec!["c1".into(), "c2".into()],
        format: ExportFormat::Csv,
    };
    let _: Value = ops
        .export()
        .unwrap()
        .run(&export, RequestOptions::new())
        .await
        .unwrap();

    let _: Value = ops
        .batch()
        .unwrap()
        .run("reprice", &json!({"ids": ["c1"]}), RequestOptions::new())
        .await
        .unwrap();

    let err = ops
        .batch()
        .unwrap()
        .run::<Value, _>("[object Object]", &json!({}), RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(
        calls(&mock),
        vec![
            (Method::POST, "/cards/c1/mark-sold".to_string()),
            (Method::POST, "/cards/export".to_string()),
            (Method::POST, "/cards/batch/reprice".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_two_factory_calls_compose_identical_paths() {
    let mock = MockTransport::echo().shared();
    let client = RequestClient::new(mock.clone());
    let descriptor = ResourceDescriptor::new("/auctions", "auction");

    let first = create_operations(&client, descriptor.clone(), ResourceFeatures::none());
    let second = create_operations(&client, descriptor, ResourceFeatures::none());

    let _: Value = first.get_by_id("a-9", RequestOptions::new()).await.unwrap();
    let _: Value = second.get_by_id("a-9", RequestOptions::new()).await.unwrap();
    first.remove("a-9", RequestOptions::new()).await.unwrap();
    second.remove("a-9", RequestOptions::new()).await.unwrap();

    let calls = calls(&mock);
    assert_eq!(calls[0], calls[1]);
    assert_eq!(calls[2], calls[3]);
    assert!(second.export().is_none());
}

#[tokio::test]
async fn test_mapping_applies_to_listed_keys() {
    let mock = MockTransport::always(TransportResponse::envelope(
        200,
        json!({
            "_id": "g1",
            "card": {"_id": "c1", "name": "Lugia"},
            "gradeHistory": [{"_id": "h1", "grade": 9}]
        }),
    ))
    .shared();
    let client = RequestClient::new(mock);

    let descriptor = ResourceDescriptor::new("/graded-cards", "graded card");
    let ops = ResourceOperations::builder(&client, descriptor)
        .mapping(Arc::new(CanonicalId::new("_id").nested(["card"])))
        .build();

    let graded: Value = ops.get_by_id("g1", RequestOptions::new()).await.unwrap();
    assert_eq!(graded["id"], "g1");
    assert_eq!(graded["card"]["id"], "c1");
    assert!(graded["gradeHistory"][0].get("id").is_none());
}

#[tokio::test]
async fn test_catalog_operations() {
    let mock = MockTransport::echo().shared();
    let client = RequestClient::new(mock.clone());

    let auctions = ResourceCatalog::operations(&client, ResourceKind::Auctions).unwrap();
    assert_eq!(auctions.capabilities(), vec![Capability::BatchOperations]);
    assert!(auctions.mark_sold().is_none());

    let sales = ResourceCatalog::operations(&client, ResourceKind::Sales).unwrap();
    let _: Value = sales.get_by_id("s1", RequestOptions::new()).await.unwrap();
    assert_eq!(calls(&mock), vec![(Method::GET, "/sales/s1".to_string())]);
}

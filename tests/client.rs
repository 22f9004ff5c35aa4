//! Tests for the HTTP client, run against a local stub server.

use jaqpot::{
    prediction::Values,
    resource::{Dataset, Id, Model, Task},
    Client, Error,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::str::FromStr;

const TOKEN: &str = "secret-token";

fn client_for(server: &ServerGuard) -> Client {
    Client::new(&server.url()).unwrap()
}

fn bearer() -> String {
    format!("Bearer {}", TOKEN)
}

fn model_json() -> String {
    json!({
        "_id": "m1",
        "additionalInfo": {
            "independentFeatures": { "uri:a": "temp", "uri:b": "ph" }
        }
    })
    .to_string()
}

#[tokio::test]
async fn fetches_models_with_bearer_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/jaqpot/services/model/m1")
        .match_header("authorization", bearer().as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(model_json())
        .create_async()
        .await;

    let model = client_for(&server)
        .get_model(&Id::from_str("m1").unwrap(), TOKEN)
        .await
        .unwrap();
    assert_eq!(model.slash_id.unwrap().as_str(), "m1");
    mock.assert_async().await;
}

#[tokio::test]
async fn error_reports_surface_the_service_message() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/jaqpot/services/model/missing")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code": "NotFound", "message": "Model not found", "httpStatus": 404}"#)
        .create_async()
        .await;

    let err = client_for(&server)
        .get_model(&Id::from_str("missing").unwrap(), TOKEN)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Model not found");
    let report = err.service_report().unwrap();
    assert_eq!(report.code.as_deref(), Some("NotFound"));
    assert_eq!(report.http_status, Some(404));
}

#[tokio::test]
async fn other_error_bodies_keep_status_and_body() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/jaqpot/services/task/t1")
        .with_status(502)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let err = client_for(&server)
        .get_task(&Id::from_str("t1").unwrap(), TOKEN)
        .await
        .unwrap_err();
    match err {
        Error::UnexpectedHttpStatus { status, body, .. } => {
            assert_eq!(status.as_u16(), 502);
            assert_eq!(body, "upstream unavailable");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn malformed_bodies_are_decode_errors() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/jaqpot/services/model/m1")
        .with_status(200)
        .with_body("{not json")
        .create_async()
        .await;

    let err = client_for(&server)
        .get_model(&Id::from_str("m1").unwrap(), TOKEN)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CouldNotAccessUrl { .. }), "{:?}", err);
    assert!(matches!(err.original_jaqpot_error(), Error::Other { .. }));
}

#[tokio::test]
async fn posted_datasets_are_identified_by_location() {
    let mut server = Server::new_async().await;
    let location = format!("{}/jaqpot/services/dataset/in1", server.url());
    let mock = server
        .mock("POST", "/jaqpot/services/dataset/")
        .match_header("authorization", bearer().as_str())
        .match_body(Matcher::PartialJson(json!({
            "features": [ { "key": "0", "name": "temp" } ],
            "totalRows": 1
        })))
        .with_status(201)
        .with_header("location", &location)
        .create_async()
        .await;

    let dataset: Dataset = serde_json::from_value(json!({
        "features": [ { "key": "0", "name": "temp" } ],
        "dataEntry": [ { "entryId": { "name": "0" }, "values": { "0": 20 } } ],
        "totalRows": 1
    }))
    .unwrap();
    let id = client_for(&server).post_dataset(&dataset, TOKEN).await.unwrap();
    assert_eq!(id.as_str(), "in1");
    mock.assert_async().await;
}

#[tokio::test]
async fn posted_datasets_need_a_location() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/jaqpot/services/dataset/")
        .with_status(201)
        .create_async()
        .await;

    let err = client_for(&server)
        .post_dataset(&Dataset::default(), TOKEN)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingHeader { .. }), "{:?}", err);
}

#[tokio::test]
async fn predictions_are_submitted_as_forms() {
    let mut server = Server::new_async().await;
    let dataset_uri = format!("{}/jaqpot/services/dataset/in1", server.url());
    let mock = server
        .mock("POST", "/jaqpot/services/model/m1")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("dataset_uri".into(), dataset_uri),
            Matcher::UrlEncoded("visible".into(), "true".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"_id": "t1", "hasStatus": "QUEUED"}"#)
        .create_async()
        .await;

    let task: Task = client_for(&server)
        .submit_prediction(
            &Id::from_str("m1").unwrap(),
            &Id::from_str("in1").unwrap(),
            TOKEN,
        )
        .await
        .unwrap();
    assert_eq!(task.task_id().unwrap().as_str(), "t1");
    mock.assert_async().await;
}

#[tokio::test]
async fn datasets_are_fetched_with_their_rows() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/jaqpot/services/dataset/d1")
        .match_query(Matcher::UrlEncoded("dataEntries".into(), "true".into()))
        .with_status(200)
        .with_body(r#"{"_id": "d1", "dataEntry": [{"values": {"0": 1}}]}"#)
        .create_async()
        .await;

    let dataset = client_for(&server)
        .get_dataset(&Id::from_str("d1").unwrap(), TOKEN)
        .await
        .unwrap();
    assert_eq!(dataset.data_entry.len(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn model_listings_read_the_total_header() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/jaqpot/services/model/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("organization".into(), "euclia".into()),
            Matcher::UrlEncoded("tag".into(), "qsar".into()),
            Matcher::UrlEncoded("min".into(), "0".into()),
            Matcher::UrlEncoded("max".into(), "2".into()),
        ]))
        .with_status(200)
        .with_header("Total", "42")
        .with_body(r#"[{"_id": "m1"}, {"_id": "m2"}]"#)
        .create_async()
        .await;

    let models = client_for(&server)
        .get_orgs_models_by_tag("euclia", "qsar", 0, 2, TOKEN)
        .await
        .unwrap();
    assert_eq!(models.total, 42);
    assert_eq!(models.models.len(), 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn model_listings_without_total_count_the_page() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/jaqpot/services/model/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("min".into(), "0".into()),
            Matcher::UrlEncoded("max".into(), "10".into()),
        ]))
        .with_status(200)
        .with_body(r#"[{"_id": "m1"}, {"_id": "m2"}, {"_id": "m3"}]"#)
        .create_async()
        .await;

    let models = client_for(&server).get_my_models(0, 10, TOKEN).await.unwrap();
    assert_eq!(models.total, 3);
}

/// Serve every step of a prediction. `submit_status` lets a test make the
/// prediction request fail.
async fn predict_against(server: &mut ServerGuard, submit_status: usize) -> Vec<mockito::Mock> {
    let location = format!("{}/jaqpot/services/dataset/in1", server.url());
    let submit_body = if submit_status == 200 {
        r#"{"_id": "t1", "hasStatus": "QUEUED"}"#
    } else {
        r#"{"code": "BadRequest", "message": "Dataset has no rows the model accepts"}"#
    };
    vec![
        server
            .mock("GET", "/jaqpot/services/model/m1")
            .with_status(200)
            .with_body(model_json())
            .create_async()
            .await,
        server
            .mock("POST", "/jaqpot/services/dataset/")
            .with_status(201)
            .with_header("location", &location)
            .create_async()
            .await,
        server
            .mock("POST", "/jaqpot/services/model/m1")
            .with_status(submit_status)
            .with_body(submit_body)
            .create_async()
            .await,
        server
            .mock("GET", "/jaqpot/services/task/t1")
            .with_status(200)
            .with_body(
                r#"{"_id": "t1", "hasStatus": "COMPLETED", "percentageCompleted": 100,
                    "result": "dataset/out1"}"#,
            )
            .expect(if submit_status == 200 { 1 } else { 0 })
            .create_async()
            .await,
        server
            .mock("GET", "/jaqpot/services/dataset/out1")
            .match_query(Matcher::UrlEncoded("dataEntries".into(), "true".into()))
            .with_status(200)
            .with_body(
                json!({
                    "_id": "out1",
                    "features": [
                        { "key": "0", "name": "temp" },
                        { "key": "1", "name": "ph" },
                        { "key": "2", "name": "solubility", "category": "PREDICTED" }
                    ],
                    "dataEntry": [
                        { "entryId": { "name": "0", "URI": "" },
                          "values": { "0": 20, "1": 7, "2": 5.5 } }
                    ]
                })
                .to_string(),
            )
            .expect(if submit_status == 200 { 1 } else { 0 })
            .create_async()
            .await,
    ]
}

fn rows() -> Vec<Values> {
    vec![serde_json::from_value(json!({ "temp": 20, "ph": 7 })).unwrap()]
}

#[tokio::test]
async fn predicts_over_http() {
    let mut server = Server::new_async().await;
    let mocks = predict_against(&mut server, 200).await;

    let model: Id<Model> = Id::from_str("m1").unwrap();
    let prediction = client_for(&server)
        .predict(&model, &rows(), TOKEN)
        .await
        .unwrap();
    assert_eq!(prediction.dataset_id.as_str(), "out1");
    assert_eq!(json!(prediction.data), json!([{ "temp": 20, "ph": 7 }]));
    assert_eq!(json!(prediction.predictions), json!([{ "solubility": 5.5 }]));
    for mock in &mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn rejected_predictions_stop_before_polling() {
    let mut server = Server::new_async().await;
    let mocks = predict_against(&mut server, 400).await;

    let model: Id<Model> = Id::from_str("m1").unwrap();
    let err = client_for(&server)
        .predict(&model, &rows(), TOKEN)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Dataset has no rows the model accepts");
    // The task and result mocks expect no calls.
    for mock in &mocks {
        mock.assert_async().await;
    }
}

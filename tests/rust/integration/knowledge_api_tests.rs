use axum::http::StatusCode;
use serde_json::{json, Value};

use super::common::TestApp;

async fn created(app: &TestApp, token: &str, uri: &str, body: Value) -> Value {
    let (status, body) = app.post(uri, token, body).await;
    assert_eq!(status, StatusCode::CREATED, "{} failed: {}", uri, body);
    body
}

#[tokio::test]
async fn conditions_and_recommendations_are_trimmed_and_unique() {
    let app = TestApp::new().await;
    let alice = app.farmer("alice").await;

    let health = created(&app, &alice, "/api/v1/patient-healths/", json!({"description": "  Diabetes "})).await;
    assert_eq!(health["description"], "Diabetes");
    let (status, body) = app
        .post("/api/v1/patient-healths/", &alice, json!({"description": "Diabetes"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["description"].is_array());
    let (status, body) = app
        .post("/api/v1/patient-healths/", &alice, json!({"description": "   "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["description"][0], "Description cannot be empty.");

    let reco = created(
        &app,
        &alice,
        "/api/v1/recommendations/",
        json!({"description": "Lower the brooder heat", "reco_type": "Temperature"}),
    )
    .await;
    assert_eq!(reco["context"], "Any");
    created(
        &app,
        &alice,
        "/api/v1/recommendations/",
        json!({"description": "Check the airflow", "reco_type": "Respiration", "context": "Home"}),
    )
    .await;

    let (_, listed) = app.get("/api/v1/recommendations/?context=Home", &alice).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["description"], "Check the airflow");
    let (_, listed) = app.get("/api/v1/recommendations/?reco_type=Heart", &alice).await;
    assert!(listed.as_array().unwrap().is_empty());

    let exception = json!({
        "recommendation_id": reco["id"],
        "patient_health_id": health["id"],
    });
    let body = created(&app, &alice, "/api/v1/exception-diseases/", exception.clone()).await;
    assert_eq!(body["recommendation"]["description"], "Lower the brooder heat");
    assert_eq!(body["patient_health"]["description"], "Diabetes");
    let (status, body) = app.post("/api/v1/exception-diseases/", &alice, exception).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"][0], "This exception already exists.");
}

#[tokio::test]
async fn medications_are_numbered_per_anomaly() {
    let app = TestApp::new().await;
    let alice = app.farmer("alice").await;

    let ids = json!({"hr_id": 1, "sp_id": 2, "pr_id": 3, "bt_id": -4, "resp_id": 5});
    let (status, body) = app.post("/api/v1/anomalies/", &alice, ids).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["bt_id"][0], "ID must be a positive integer.");

    let anomaly = created(
        &app,
        &alice,
        "/api/v1/anomalies/",
        json!({"hr_id": 1, "sp_id": 2, "pr_id": 3, "bt_id": 4, "resp_id": 5}),
    )
    .await;
    assert_eq!(anomaly["status"], true);

    let mut recos = Vec::new();
    for (description, kind) in [("Cool the house", "Temperature"), ("Add oxygen", "Spo2")] {
        let reco = created(
            &app,
            &alice,
            "/api/v1/recommendations/",
            json!({"description": description, "reco_type": kind}),
        )
        .await;
        recos.push(reco["id"].clone());
    }

    let first = created(
        &app,
        &alice,
        "/api/v1/medications/",
        json!({"anomaly_id": anomaly["id"], "recommendation_id": recos[0], "sequence_no": 7}),
    )
    .await;
    assert_eq!(first["sequence_no"], 1);
    assert_eq!(first["user"]["username"], "alice");
    assert_eq!(first["anomaly"]["hr_id"], 1);

    let second = created(
        &app,
        &alice,
        "/api/v1/medications/",
        json!({"anomaly_id": anomaly["id"], "recommendation_id": recos[1], "notes": "after meals"}),
    )
    .await;
    assert_eq!(second["sequence_no"], 2);

    let (status, body) = app
        .post(
            "/api/v1/medications/",
            &alice,
            json!({"anomaly_id": anomaly["id"], "recommendation_id": recos[0]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array());

    let (status, body) = app
        .request(
            "PATCH",
            &format!("/api/v1/medications/{}/", second["id"]),
            Some(alice.as_str()),
            Some(json!({"sequence_no": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["sequence_no"].is_array());

    let (status, _) = app
        .request("DELETE", &format!("/api/v1/recommendations/{}/", recos[0]), Some(alice.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request("DELETE", &format!("/api/v1/anomalies/{}/", anomaly["id"]), Some(alice.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, listed) = app.get("/api/v1/medications/", &alice).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn knowledge_base_requires_a_token() {
    let app = TestApp::new().await;
    let (status, _) = app.request("GET", "/api/v1/anomalies/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

use axum::http::StatusCode;
use serde_json::json;

use super::common::{TestApp, PASSWORD};

fn farm(name: &str) -> serde_json::Value {
    json!({"farmName": name, "location": "Arusha", "farmSize": "Small"})
}

#[tokio::test]
async fn farms_are_scoped_to_members() {
    let app = TestApp::new().await;
    let alice = app.farmer("alice").await;
    let bob = app.farmer("bob").await;

    let (status, created) = app.post("/api/v1/farms/", &alice, farm("Green Acres")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["myRole"], "OWNER");
    assert_eq!(created["total_devices"], 0);
    let id = created["farmID"].as_i64().unwrap();

    let (_, mine) = app.get("/api/v1/farms/", &alice).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    let (_, theirs) = app.get("/api/v1/farms/", &bob).await;
    assert!(theirs.as_array().unwrap().is_empty());

    let (status, _) = app.get(&format!("/api/v1/farms/{}/", id), &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/api/v1/farms/{}/statistics/", id), &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, stats) = app.get(&format!("/api/v1/farms/{}/statistics/", id), &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["your_role"], "OWNER");
    assert_eq!(stats["total_devices"], 0);
}

#[tokio::test]
async fn farm_requires_name_and_size() {
    let app = TestApp::new().await;
    let alice = app.farmer("alice").await;
    let (status, body) = app
        .post("/api/v1/farms/", &alice, json!({"farmName": "  ", "location": "Moshi"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["farmName"].is_array());
    assert_eq!(body["farmSize"][0], "Farm size is required.");
}

#[tokio::test]
async fn devices_need_an_id_and_count_towards_statistics() {
    let app = TestApp::new().await;
    let alice = app.farmer("alice").await;
    let (_, created) = app.post("/api/v1/farms/", &alice, farm("Green Acres")).await;
    let farm_id = created["farmID"].as_i64().unwrap();

    let (status, body) = app
        .post("/api/v1/devices/", &alice, json!({"farmID": farm_id, "device_id": "   "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["device_id"][0], "Device ID cannot be empty.");

    let (status, device) = app
        .post(
            "/api/v1/devices/",
            &alice,
            json!({"farmID": farm_id, "device_id": " SK-001 ", "name": "Brooder"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(device["device_id"], "SK-001");
    assert_eq!(device["cell_no"], "none");

    let (_, stats) = app
        .get(&format!("/api/v1/farms/{}/statistics/", farm_id), &alice)
        .await;
    assert_eq!(stats["total_devices"], 1);
    assert_eq!(stats["active_devices"], 1);
}

#[tokio::test]
async fn my_farm_requires_a_profile() {
    let app = TestApp::new().await;
    app.register("carol").await;
    let carol = app.login("carol", PASSWORD).await;
    let (status, body) = app.get("/api/v1/farmers/my_farm/", &carol).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "User is not a farmer");

    let alice = app.farmer("alice").await;
    let (status, body) = app.get("/api/v1/farmers/my_farm/", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["farmerName"], "alice");
    assert_eq!(body["subscription_status"], "Basic");

    let (status, _) = app
        .post("/api/v1/farmers/", &alice, json!({"farmerName": "again"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reference_data_is_admin_writable() {
    let app = TestApp::new().await;
    let alice = app.farmer("alice").await;
    let admin = app.admin_token().await;

    let (status, _) = app
        .post("/api/v1/breed-types/", &alice, json!({"breedType": "Broiler"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post("/api/v1/breed-types/", &admin, json!({"breedType": "Broiler"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .post("/api/v1/breed-types/", &admin, json!({"breedType": "Broiler"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["breedType"].is_array());

    let (_, listed) = app.get("/api/v1/breed-types/", &alice).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn temperature_readings_are_range_checked() {
    let app = TestApp::new().await;
    let alice = app.farmer("alice").await;
    let admin = app.admin_token().await;

    let (_, sensor) = app
        .post(
            "/api/v1/sensor-types/",
            &admin,
            json!({"sensorTypeName": "Temperature", "measurementUnit": "C"}),
        )
        .await;
    let sensor_id = sensor["sensorTypeID"].as_i64().unwrap();
    let (_, created) = app.post("/api/v1/farms/", &alice, farm("Green Acres")).await;
    let (status, device) = app
        .post(
            "/api/v1/devices/",
            &alice,
            json!({"farmID": created["farmID"], "device_id": "SK-001", "name": "Brooder sensor"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", device);
    let device_id = device["deviceID"].as_i64().unwrap();

    let reading = |value: f64| json!({"deviceID": device_id, "sensor_typeID": sensor_id, "value": value});
    let (status, body) = app.post("/api/v1/readings/", &alice, reading(150.0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["value"].is_array());

    let (status, _) = app.post("/api/v1/readings/", &alice, reading(31.5)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.post("/api/v1/readings/", &alice, reading(33.0)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, readings) = app
        .get(&format!("/api/v1/readings/?device={}", device_id), &alice)
        .await;
    let readings = readings.as_array().unwrap();
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0]["value"], 33.0);
    assert_eq!(readings[0]["sensor_type_detail"]["total_readings"], 2);
}

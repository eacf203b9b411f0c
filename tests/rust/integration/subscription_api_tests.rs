use axum::http::StatusCode;
use serde_json::{json, Value};

use super::common::TestApp;

async fn subscribe(app: &TestApp, token: &str, plan: i64) -> Value {
    let (status, body) = app
        .post(
            "/api/v1/farmer-subscriptions/",
            token,
            json!({"subscription_type_id": plan, "duration_months": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "subscribe failed: {}", body);
    body
}

async fn allocate(app: &TestApp, token: &str, sub: i64, resource: i64) -> (StatusCode, Value) {
    app.post(
        &format!("/api/v1/farmer-subscriptions/{}/resources/", sub),
        token,
        json!({"resourceID": resource}),
    )
    .await
}

#[tokio::test]
async fn status_lists_plans_until_subscribed() {
    let app = TestApp::new().await;
    app.seed_plans().await;
    let alice = app.farmer("alice").await;

    let (status, body) = app.get("/api/v1/subscription-status/", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_active_subscription"], false);
    let plans = body["available_subscriptions"].as_array().unwrap();
    assert_eq!(plans.len(), 3);
    assert_eq!(plans[0]["name"], "Starter");

    let starter = app.plan_id("Starter").await;
    let created = subscribe(&app, &alice, starter).await;
    assert_eq!(created["status"], "ACTIVE");
    assert_eq!(created["utilization"]["hardware"]["limit"], 1);

    let (_, body) = app.get("/api/v1/subscription-status/", &alice).await;
    assert_eq!(body["has_active_subscription"], true);
    assert_eq!(
        body["subscription"]["farmerSubscriptionID"],
        created["farmerSubscriptionID"]
    );

    let (_, profile) = app.get("/api/v1/farmers/my_farm/", &alice).await;
    assert_eq!(profile["subscription_status"], "Starter");
}

#[tokio::test]
async fn duration_is_bounded() {
    let app = TestApp::new().await;
    app.seed_plans().await;
    let alice = app.farmer("alice").await;
    let starter = app.plan_id("Starter").await;
    let (status, body) = app
        .post(
            "/api/v1/farmer-subscriptions/",
            &alice,
            json!({"subscription_type_id": starter, "duration_months": 13}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["duration_months"][0], "Duration must be between 1 and 12 months");
}

#[tokio::test]
async fn allocations_respect_plan_limits() {
    let app = TestApp::new().await;
    app.seed_plans().await;
    let alice = app.farmer("alice").await;
    let sub = subscribe(&app, &alice, app.plan_id("Starter").await).await;
    let sub = sub["farmerSubscriptionID"].as_i64().unwrap();

    let device = app.resource_id("Smart Device").await;
    let analytics = app.resource_id("Advanced Analytics").await;
    let prediction = app.resource_id("Prediction Engine").await;

    let (status, allocation) = allocate(&app, &alice, sub, device).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = allocate(&app, &alice, sub, analytics).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = allocate(&app, &alice, sub, prediction).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "subscription_limit_exceeded");

    let (status, _) = allocate(&app, &alice, sub, device).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, usage) = app
        .get(&format!("/api/v1/farmer-subscriptions/{}/utilization/", sub), &alice)
        .await;
    assert_eq!(usage["hardware"]["used"], 1);
    assert_eq!(usage["software"]["available"], 0);

    let (status, _) = app
        .request(
            "DELETE",
            &format!(
                "/api/v1/farmer-subscriptions/{}/resources/{}/",
                sub, allocation["farmerSubscriptionResourceID"]
            ),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, usage) = app
        .get(&format!("/api/v1/farmer-subscriptions/{}/utilization/", sub), &alice)
        .await;
    assert_eq!(usage["hardware"]["used"], 0);
}

#[tokio::test]
async fn upgrade_moves_to_a_new_subscription() {
    let app = TestApp::new().await;
    app.seed_plans().await;
    let alice = app.farmer("alice").await;
    let sub = subscribe(&app, &alice, app.plan_id("Starter").await).await;
    let old = sub["farmerSubscriptionID"].as_i64().unwrap();
    allocate(&app, &alice, old, app.resource_id("Smart Device").await).await;

    let pro = app.plan_id("Pro").await;
    let (status, upgraded) = app
        .post(
            &format!("/api/v1/farmer-subscriptions/{}/upgrade/", old),
            &alice,
            json!({"new_subscription_type_id": pro}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", upgraded);
    assert_ne!(upgraded["farmerSubscriptionID"], old);
    assert_eq!(upgraded["status"], "ACTIVE");
    assert_eq!(upgraded["subscription_type"]["name"], "Pro");
    assert_eq!(upgraded["utilization"]["hardware"]["used"], 1);

    let (_, previous) = app
        .get(&format!("/api/v1/farmer-subscriptions/{}/", old), &alice)
        .await;
    assert_eq!(previous["status"], "CANCELLED");
    assert_eq!(previous["notes"], "Upgraded to Pro");

    let new_id = upgraded["farmerSubscriptionID"].as_i64().unwrap();
    let (status, body) = app
        .post(
            &format!("/api/v1/farmer-subscriptions/{}/upgrade/", new_id),
            &alice,
            json!({"new_subscription_type_id": app.plan_id("Starter").await}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "New subscription type must be of a higher tier");
}

#[tokio::test]
async fn subscriptions_are_private_to_their_farmer() {
    let app = TestApp::new().await;
    app.seed_plans().await;
    let alice = app.farmer("alice").await;
    let bob = app.farmer("bob").await;
    let sub = subscribe(&app, &alice, app.plan_id("Starter").await).await;
    let id = sub["farmerSubscriptionID"].as_i64().unwrap();

    let (status, _) = app
        .get(&format!("/api/v1/farmer-subscriptions/{}/", id), &bob)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = allocate(&app, &bob, id, app.resource_id("Smart Device").await).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, listed) = app.get("/api/v1/farmer-subscriptions/", &bob).await;
    assert!(listed.as_array().unwrap().is_empty());

    let admin = app.admin_token().await;
    let (_, listed) = app.get("/api/v1/farmer-subscriptions/", &admin).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let (status, _) = app.get("/api/v1/resources/my_resources/", &admin).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cancel_turns_off_renewal() {
    let app = TestApp::new().await;
    app.seed_plans().await;
    let alice = app.farmer("alice").await;
    let sub = subscribe(&app, &alice, app.plan_id("Starter").await).await;
    let id = sub["farmerSubscriptionID"].as_i64().unwrap();
    assert_eq!(sub["auto_renew"], true);

    let (status, body) = app
        .post(&format!("/api/v1/farmer-subscriptions/{}/cancel/", id), &alice, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["detail"],
        "Subscription will be cancelled at the end of the billing period"
    );

    let (_, detail) = app
        .get(&format!("/api/v1/farmer-subscriptions/{}/", id), &alice)
        .await;
    assert_eq!(detail["status"], "ACTIVE");
    assert_eq!(detail["auto_renew"], false);
}

#[tokio::test]
async fn dashboard_counts_active_subscriptions() {
    let app = TestApp::new().await;
    app.seed_plans().await;
    let alice = app.farmer("alice").await;
    subscribe(&app, &alice, app.plan_id("Starter").await).await;

    let (status, stats) = app.get("/api/v1/dashboard/stats/", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalUsers"], 2);
    assert_eq!(stats["totalFarmers"], 1);
    assert_eq!(stats["activeSubscriptions"], 1);
    assert_eq!(stats["systemHealth"], 95);
}

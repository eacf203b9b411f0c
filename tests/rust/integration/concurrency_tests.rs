use std::sync::Arc;

use chrono::Utc;

use smart_kuku::models::subscriptions::{
    Resource, ResourceCategory, ResourceType, SubscriptionStatus,
};
use smart_kuku::models::Money;
use smart_kuku::store::{Store, StoreError};
use smart_kuku::subscriptions::{
    allocate_resource, create_subscription, upgrade_subscription, utilization, NewSubscription,
    SubscriptionError,
};

use super::common::TestApp;

fn device(name: &str) -> Resource {
    let now = Utc::now();
    Resource {
        id: 0,
        name: name.to_string(),
        resource_type: ResourceType::Hardware,
        category: ResourceCategory::Thermal,
        unit_cost: Money::ZERO,
        status: true,
        is_basic: false,
        description: String::new(),
        created_at: now,
        updated_at: now,
    }
}

/// Seeded store with farmer `alice` on the Starter plan (one hardware slot).
async fn starter_subscription() -> (Arc<Store>, i64) {
    let app = TestApp::new().await;
    app.seed_plans().await;
    app.farmer("alice").await;
    let starter = app.plan_id("Starter").await;
    let store = app.store.clone();
    let sub = store
        .write(|t| {
            let farmer = t
                .farmers
                .find(|f| f.farmer_name == "alice")
                .map(|f| f.id)
                .ok_or(StoreError::NotFound { kind: "farmer", id: 0 })?;
            create_subscription(
                t,
                NewSubscription {
                    farmer,
                    subscription_type: starter,
                    duration_months: 1,
                    auto_renew: false,
                },
                Utc::now(),
            )
        })
        .await
        .unwrap();
    (store, sub.id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_allocations_cannot_exceed_the_plan() {
    let (store, sub) = starter_subscription().await;
    let devices = store
        .write(|t| {
            Ok::<_, StoreError>([t.insert(device("Brooder A")).id, t.insert(device("Brooder B")).id])
        })
        .await
        .unwrap();

    let tasks: Vec<_> = devices
        .into_iter()
        .map(|resource| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .write(|t| allocate_resource(t, sub, resource, 1, Utc::now()))
                    .await
            })
        })
        .collect();
    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(SubscriptionError::LimitExceeded(_)))));

    let hardware = store
        .read(|t| t.subscriptions.get(sub).map(|s| utilization(t, s).hardware))
        .await
        .unwrap();
    assert_eq!(hardware.used, 1);
    assert!(hardware.used <= hardware.limit);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_upgrades_start_one_subscription() {
    let (store, sub) = starter_subscription().await;
    let pro = store
        .read(|t| t.subscription_types.find(|p| p.name == "Pro").map(|p| p.id))
        .await
        .unwrap();

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .write(|t| upgrade_subscription(t, sub, pro, Utc::now()))
                    .await
            })
        })
        .collect();
    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(SubscriptionError::Inactive))));

    let active = store
        .read(|t| t.subscriptions.count(|s| s.status == SubscriptionStatus::Active))
        .await;
    assert_eq!(active, 1);
}

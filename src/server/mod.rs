use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use crate::auth::TokenService;
use crate::config::ServerConfig;
use crate::models::accounts::Farmer;
use crate::models::batches::{ActivitySchedule, Batch, BatchActivity, BatchFeeding};
use crate::models::breeds::{
    ActivityType, Breed, BreedActivity, BreedCondition, BreedFeeding, BreedGrowth, BreedType,
    ConditionType, FoodType,
};
use crate::models::farms::{Device, Farm};
use crate::models::knowledge::{
    Anomaly, ExceptionDisease, Medication, PatientHealth, Recommendation,
};
use crate::models::sensors::{Reading, SensorType};
use crate::models::subscriptions::{Payment, Resource, SubscriptionType};
use crate::setup::{ensure_default_admin, AdminCredentials};
use crate::store::{Store, StoreError};
use crate::subscriptions::check_subscription_status;
use errors::ApiError;
use handlers::{accounts, dashboard, farms, subscriptions};

pub mod crud;
pub mod errors;
pub mod extract;
pub mod handlers;

pub struct AppState {
    pub store: Arc<Store>,
    pub tokens: TokenService,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(store: Arc<Store>, config: ServerConfig) -> Self {
        Self {
            tokens: TokenService::from_config(&config),
            store,
            config,
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

fn token_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/token/", post(accounts::obtain_token))
        .route("/token/refresh/", post(accounts::refresh_token))
}

fn api_routes() -> Router<Arc<AppState>> {
    let router = token_routes()
        .route("/users/", get(accounts::list_users).post(accounts::register))
        .route("/users/me/", get(accounts::me))
        .route(
            "/users/{id}/",
            get(accounts::get_user)
                .put(accounts::update_user)
                .patch(accounts::patch_user)
                .delete(accounts::delete_user),
        )
        .route("/farmers/my_farm/", get(accounts::my_farm))
        .route("/farms/{id}/statistics/", get(farms::farm_statistics))
        .route("/resources/my_resources/", get(subscriptions::my_resources))
        .route(
            "/farmer-subscriptions/",
            get(subscriptions::list_subscriptions).post(subscriptions::create_subscription),
        )
        .route("/farmer-subscriptions/{id}/", get(subscriptions::get_subscription))
        .route(
            "/farmer-subscriptions/{id}/utilization/",
            get(subscriptions::subscription_utilization),
        )
        .route(
            "/farmer-subscriptions/{id}/upgrade/",
            post(subscriptions::upgrade_subscription),
        )
        .route(
            "/farmer-subscriptions/{id}/cancel/",
            post(subscriptions::cancel_subscription),
        )
        .route(
            "/farmer-subscriptions/{id}/resources/",
            get(subscriptions::list_allocations).post(subscriptions::add_allocation),
        )
        .route(
            "/farmer-subscriptions/{id}/resources/{allocation_id}/",
            delete(subscriptions::remove_allocation),
        )
        .route("/subscription-status/", get(subscriptions::subscription_status))
        .route("/dashboard/stats/", get(dashboard::dashboard_stats));

    let router = crud::routes::<Farmer>(router, "farmers");
    let router = crud::routes::<Farm>(router, "farms");
    let router = crud::routes::<Device>(router, "devices");
    let router = crud::routes::<BreedType>(router, "breed-types");
    let router = crud::routes::<Breed>(router, "breeds");
    let router = crud::routes::<ActivityType>(router, "activity-types");
    let router = crud::routes::<BreedActivity>(router, "breed-activities");
    let router = crud::routes::<ConditionType>(router, "condition-types");
    let router = crud::routes::<BreedCondition>(router, "breed-conditions");
    let router = crud::routes::<FoodType>(router, "food-types");
    let router = crud::routes::<BreedFeeding>(router, "breed-feedings");
    let router = crud::routes::<BreedGrowth>(router, "breed-growths");
    let router = crud::routes::<Batch>(router, "batches");
    let router = crud::routes::<ActivitySchedule>(router, "activity-schedules");
    let router = crud::routes::<BatchActivity>(router, "batch-activities");
    let router = crud::routes::<BatchFeeding>(router, "batch-feedings");
    let router = crud::routes::<SensorType>(router, "sensor-types");
    let router = crud::routes::<Reading>(router, "readings");
    let router = crud::routes::<SubscriptionType>(router, "subscription-types");
    let router = crud::routes::<Resource>(router, "resources");
    let router = crud::routes::<Payment>(router, "payments");
    let router = crud::routes::<PatientHealth>(router, "patient-healths");
    let router = crud::routes::<Recommendation>(router, "recommendations");
    let router = crud::routes::<ExceptionDisease>(router, "exception-diseases");
    let router = crud::routes::<Anomaly>(router, "anomalies");
    crud::routes::<Medication>(router, "medications")
}

/// The complete application: API under `/api/v1`, token aliases under `/api`,
/// and the health probe.
pub fn build_app(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let body_limit = state.config.max_body_bytes;
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .nest("/api", token_routes())
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

/// Periodically run the subscription status sweep against the store.
fn spawn_subscription_checks(store: Arc<Store>, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let result = store
                .write(|t| Ok::<_, StoreError>(check_subscription_status(t, Utc::now())))
                .await;
            match result {
                Ok(report) => log::info!(
                    "Subscription check: {} expired, {} suspended, {} renewed",
                    report.expired,
                    report.suspended,
                    report.renewed
                ),
                Err(e) => log::error!("Subscription check failed: {}", e),
            }
        }
    });
}

pub async fn run_with_config(config: ServerConfig) -> anyhow::Result<()> {
    log::info!(
        "Server configuration: http={}, data_file={}",
        config.bind_address(),
        config.data_file
    );
    if config.uses_dev_secret() {
        log::warn!("Using the development JWT secret; set SMART_KUKU_JWT_SECRET in production");
    }

    if let Some(dir) = Path::new(&config.data_file).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating data directory {}", dir.display()))?;
        }
    }
    let store = Arc::new(
        Store::open(&config.data_file)
            .with_context(|| format!("opening data file {}", config.data_file))?,
    );

    let creds = AdminCredentials::from_env();
    let now = Utc::now();
    store
        .write(|t| ensure_default_admin(t, &creds, now))
        .await
        .context("provisioning the default admin")?;

    if config.subscription_check_secs > 0 {
        log::info!(
            "Checking subscriptions every {} seconds",
            config.subscription_check_secs
        );
        spawn_subscription_checks(
            store.clone(),
            Duration::from_secs(config.subscription_check_secs),
        );
    }

    let bind_address = config.bind_address();
    let app = build_app(Arc::new(AppState::new(store, config)));

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding HTTP listener to {}", bind_address))?;
    log::info!("Smart Kuku API listening on http://{}", bind_address);

    let http_server = axum::serve(listener, app);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).context("registering SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt()).context("registering SIGINT handler")?;

        tokio::select! {
            result = http_server => result.context("HTTP server error")?,
            _ = sigterm.recv() => log::info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => log::info!("Received SIGINT, shutting down..."),
        }
    }

    #[cfg(windows)]
    {
        tokio::select! {
            result = http_server => result.context("HTTP server error")?,
            _ = tokio::signal::ctrl_c() => log::info!("Received shutdown signal, shutting down..."),
        }
    }

    log::info!("Server stopped");
    Ok(())
}

//! Tokens, user accounts and farmer profiles.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::auth::{hash_password, verify_password, AuthError, TokenKind};
use crate::models::accounts::{Farmer, FarmerInput, Role, User};
use crate::models::farms::summarize_sizes;
use crate::models::validation::FieldErrors;
use crate::server::crud::{self, Crud, Ctx};
use crate::server::errors::ApiError;
use crate::server::extract::{Caller, Payload};
use crate::server::AppState;
use crate::store::Tables;
use crate::subscriptions::active_subscription_for;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
    pub username: String,
    pub role: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub redirect: &'static str,
}

/// Exchange credentials for an access/refresh pair.
pub async fn obtain_token(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    if request.username.is_empty() {
        errors.add("username", "This field is required.");
    }
    if request.password.is_empty() {
        errors.add("password", "This field is required.");
    }
    errors.into_result()?;

    let user = state
        .store
        .read(|t| t.user_by_username(&request.username).cloned())
        .await
        .filter(|u| verify_password(&request.password, &u.password_hash))
        .ok_or(AuthError::InvalidCredentials)?;
    if !user.is_active {
        return Err(AuthError::InvalidCredentials.into());
    }

    let pair = state.tokens.issue_pair(&user)?;
    let now = Utc::now();
    state
        .store
        .write(|t| {
            if let Some(u) = t.users.get_mut(user.id) {
                u.last_login = Some(now);
            }
            Ok::<_, ApiError>(())
        })
        .await?;

    let role = user.role.as_str().to_lowercase();
    log::info!("Issued tokens for {}", user.username);
    Ok(Json(TokenResponse {
        access: pair.access,
        refresh: pair.refresh,
        redirect: if role == "admin" { "/admin" } else { "/dashboard" },
        username: user.username,
        role,
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<RefreshRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.refresh.is_empty() {
        return Err(ApiError::field("refresh", "This field is required."));
    }
    let claims = state.tokens.verify(&request.refresh, TokenKind::Refresh)?;
    let user = state
        .store
        .read(|t| t.users.get(claims.user_id).filter(|u| u.is_active).cloned())
        .await
        .ok_or(AuthError::InvalidCredentials)?;
    let access = state.tokens.issue_access(&user)?;
    Ok(Json(json!({ "access": access })))
}

/// Public shape of a user; the password hash never leaves the store.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub role_display: &'static str,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub profile_image: String,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            role: u.role,
            role_display: u.role.display(),
            is_active: u.is_active,
            is_staff: u.is_staff,
            is_superuser: u.is_superuser,
            profile_image: u.profile_image.clone(),
            date_joined: u.date_joined,
            last_login: u.last_login,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 150, message = "Username cannot be blank."))]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "First name cannot be blank."))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Last name cannot be blank."))]
    pub last_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

fn parse_role(role: Option<&str>, errors: &mut FieldErrors) -> Role {
    match role.map(str::parse::<Role>) {
        None => Role::default(),
        Some(Ok(role)) => role,
        Some(Err(message)) => {
            errors.add("role", message);
            Role::default()
        }
    }
}

fn check_user_unique(t: &Tables, username: &str, email: &str, except: Option<i64>, errors: &mut FieldErrors) {
    let others = || t.users.iter().filter(move |u| Some(u.id) != except);
    if others().any(|u| u.username == username) {
        errors.add("username", "A user with that username already exists.");
    }
    if !email.is_empty() && others().any(|u| u.email.eq_ignore_ascii_case(email)) {
        errors.add("email", "A user with that email already exists.");
    }
}

/// Self-registration; no authentication required.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<RegisterRequest>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let mut errors = FieldErrors::new();
    if let Err(e) = request.validate() {
        errors.merge(e.into());
    }
    let role = parse_role(request.role.as_deref(), &mut errors);
    errors.into_result()?;

    let password_hash = hash_password(&request.password)?;
    let email = request.email.to_lowercase();
    let now = Utc::now();
    let user = state
        .store
        .write(|t| {
            let mut errors = FieldErrors::new();
            check_user_unique(t, &request.username, &email, None, &mut errors);
            errors.into_result()?;

            let mut user = User::new(&request.username, &email, now);
            user.first_name = request.first_name.clone();
            user.last_name = request.last_name.clone();
            user.role = role;
            user.password_hash = password_hash;
            Ok::<_, ApiError>(t.insert(user))
        })
        .await?;
    log::info!("Registered user {} ({})", user.username, user.role);
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<UserView>>, ApiError> {
    caller.require_admin()?;
    let users = state
        .store
        .read(|t| t.users.iter().map(UserView::from).collect())
        .await;
    Ok(Json(users))
}

pub async fn me(caller: Caller) -> Json<UserView> {
    Json(UserView::from(&caller.user))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<UserView>, ApiError> {
    state
        .store
        .read(|t| t.users.get(id).map(UserView::from))
        .await
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// Fields an administrator may change; `password` is optional.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 150, message = "Username cannot be blank."))]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 8, message = "Ensure this field has at least 8 characters."))]
    pub password: Option<String>,
}

fn active() -> bool {
    true
}

impl UserUpdate {
    fn from_user(u: &User) -> Self {
        Self {
            username: u.username.clone(),
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            role: Some(u.role.as_str().to_string()),
            is_active: u.is_active,
            is_staff: u.is_staff,
            is_superuser: u.is_superuser,
            password: None,
        }
    }
}

async fn save_user(
    state: &AppState,
    caller: Caller,
    id: i64,
    body: Value,
    partial: bool,
) -> Result<Json<UserView>, ApiError> {
    caller.require_admin()?;
    let current = state
        .store
        .read(|t| t.users.get(id).cloned())
        .await
        .ok_or(ApiError::NotFound)?;

    let body = if partial {
        let base = serde_json::to_value(UserUpdate::from_user(&current))
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        crud::merge(base, body)
    } else {
        body
    };
    let update: UserUpdate =
        serde_json::from_value(body).map_err(|e| ApiError::non_field(e.to_string()))?;
    let mut errors = FieldErrors::new();
    if let Err(e) = update.validate() {
        errors.merge(e.into());
    }
    let role = parse_role(update.role.as_deref(), &mut errors);
    errors.into_result()?;

    let password_hash = update.password.as_deref().map(hash_password).transpose()?;
    let email = update.email.to_lowercase();
    let user = state
        .store
        .write(|t| {
            let mut errors = FieldErrors::new();
            check_user_unique(t, &update.username, &email, Some(id), &mut errors);
            errors.into_result()?;

            let user = t.users.require_mut(id)?;
            user.username = update.username.clone();
            user.email = email.clone();
            user.first_name = update.first_name.clone();
            user.last_name = update.last_name.clone();
            user.role = role;
            user.is_active = update.is_active;
            user.is_staff = update.is_staff;
            user.is_superuser = update.is_superuser;
            if let Some(hash) = password_hash {
                user.password_hash = hash;
            }
            Ok::<_, ApiError>(user.clone())
        })
        .await?;
    log::info!("Updated user {}", user.username);
    Ok(Json(UserView::from(&user)))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    Payload(body): Payload<Value>,
) -> Result<Json<UserView>, ApiError> {
    save_user(&state, caller, id, body, false).await
}

pub async fn patch_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    Payload(body): Payload<Value>,
) -> Result<Json<UserView>, ApiError> {
    save_user(&state, caller, id, body, true).await
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    caller.require_admin()?;
    state
        .store
        .write(|t| t.delete::<User>(id).map_err(ApiError::from))
        .await?;
    log::info!("Deleted user {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Farmer profile with the aggregate fields shown on profile pages.
pub fn render_farmer(farmer: &Farmer, t: &Tables, today: chrono::NaiveDate) -> Value {
    let farm_ids: Vec<i64> = t
        .memberships
        .iter()
        .filter(|m| m.farmer == farmer.id)
        .map(|m| m.farm)
        .collect();
    let farm_sizes = summarize_sizes(
        farm_ids
            .iter()
            .filter_map(|id| t.farms.get(*id))
            .map(|f| f.farm_size.as_str()),
    );
    let total_batches = t
        .batches
        .count(|b| b.farm.is_some_and(|f| farm_ids.contains(&f)));
    let plan = active_subscription_for(t, farmer.id, today)
        .and_then(|s| s.subscription_type)
        .and_then(|id| t.subscription_types.get(id))
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "Basic".to_string());
    let experience_years = ((today - farmer.created_date).num_days() / 365).max(1);

    let mut value = serde_json::to_value(farmer).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.insert(
            "user".into(),
            t.users
                .get(farmer.user)
                .map(|u| json!(UserView::from(u)))
                .unwrap_or(Value::Null),
        );
        map.insert("phone_number".into(), json!(farmer.phone));
        map.insert("country".into(), json!("Tanzania"));
        map.insert("experience_years".into(), json!(experience_years));
        map.insert("farm_size".into(), json!(farm_sizes));
        map.insert("is_verified".into(), json!(true));
        map.insert("subscription_status".into(), json!(plan));
        map.insert("total_farms".into(), json!(farm_ids.len()));
        map.insert("total_batches".into(), json!(total_batches));
    }
    value
}

impl Crud for Farmer {
    type Input = FarmerInput;

    fn to_input(&self) -> FarmerInput {
        Farmer::to_input(self)
    }

    fn build(input: FarmerInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let caller = ctx.caller;
        let user = match (input.user, current) {
            (Some(user), _) if user != caller.user.id && !caller.is_admin() => {
                return Err(ApiError::forbidden());
            }
            (Some(user), _) => user,
            (None, Some(current)) => current.user,
            (None, None) => caller.user.id,
        };
        if !ctx.tables.users.contains(user) {
            return Err(ApiError::field("user", format!("Invalid pk \"{}\" - object does not exist.", user)));
        }
        let taken = ctx
            .tables
            .farmers
            .any(|f| f.user == user && Some(f.id) != current.map(|c| c.id));
        if taken {
            return Err(ApiError::BadRequest("User already has a farmer profile".to_string()));
        }
        Ok(Farmer {
            id: current.map_or(0, |c| c.id),
            user,
            farmer_name: input.farmer_name,
            address: input.address,
            email: input.email,
            phone: input.phone,
            created_date: current.map_or(ctx.now.date_naive(), |c| c.created_date),
        })
    }

    fn render(&self, ctx: &Ctx) -> Value {
        render_farmer(self, ctx.tables, ctx.now.date_naive())
    }
}

/// The caller's own farmer profile.
pub async fn my_farm(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Value>, ApiError> {
    let farmer = caller
        .farmer
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("User is not a farmer".to_string()))?;
    let today = Utc::now().date_naive();
    Ok(Json(
        state.store.read(|t| render_farmer(farmer, t, today)).await,
    ))
}

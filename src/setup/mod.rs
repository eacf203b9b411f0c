//! Development environment provisioning.
//!
//! `run` performs the steps in order and stops at the first failure, with one
//! exception: creating the admin account may fail (typically because it
//! already exists), which is logged and ignored before the account is promoted
//! and its password reset. Running it again on a prepared directory is a no-op
//! apart from the password reset.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub mod seed;

use crate::auth::{hash_password, AuthError};
use crate::config::{ConfigError, ServerConfig};
use crate::models::accounts::{Role, User};
use crate::store::{snapshot, StoreError, Tables};

pub const ENV_FILE: &str = ".env";
pub const ENV_TEMPLATE: &str = ".env.example";

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Neither .env nor .env.example found in {0}")]
    MissingEnvTemplate(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to load {path}: {source}")]
    Dotenv {
        path: PathBuf,
        source: dotenvy::Error,
    },

    #[error("User '{0}' already exists")]
    AdminExists(String),

    #[error("Admin account '{0}' is missing after provisioning")]
    AdminMissing(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

fn io_error(path: &Path, source: std::io::Error) -> SetupError {
    SetupError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
    Performed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupReport {
    pub env_file: StepOutcome,
    pub data_dir: StepOutcome,
    /// Performed when a new snapshot was created, skipped when one was validated
    pub migrate: StepOutcome,
    pub admin: AdminOutcome,
    pub data_file: PathBuf,
}

/// Admin account provisioned by `setup` and on server start.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn from_env() -> Self {
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
        Self {
            username: var("ADMIN_USERNAME", "admin"),
            email: var("ADMIN_EMAIL", "admin@example.com"),
            password: var("ADMIN_PASSWORD", "admin123"),
        }
    }
}

/// Copy `.env.example` to `.env` unless `.env` already exists.
pub fn ensure_env_file(root: &Path) -> Result<StepOutcome, SetupError> {
    let env_file = root.join(ENV_FILE);
    if env_file.exists() {
        log::info!("{} already exists, leaving it untouched", env_file.display());
        return Ok(StepOutcome::Skipped);
    }
    let template = root.join(ENV_TEMPLATE);
    if !template.exists() {
        return Err(SetupError::MissingEnvTemplate(root.to_path_buf()));
    }
    fs::copy(&template, &env_file).map_err(|e| io_error(&env_file, e))?;
    log::info!("Created {} from {}", env_file.display(), template.display());
    Ok(StepOutcome::Performed)
}

/// Export the variables of `.env` into the process environment.
/// Variables that are already set keep their value.
pub fn load_env(root: &Path) -> Result<(), SetupError> {
    let path = root.join(ENV_FILE);
    dotenvy::from_path(&path).map_err(|source| SetupError::Dotenv { path, source })
}

pub fn ensure_data_dir(data_file: &Path) -> Result<StepOutcome, SetupError> {
    let Some(dir) = data_file.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(StepOutcome::Skipped);
    };
    if dir.is_dir() {
        return Ok(StepOutcome::Skipped);
    }
    fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
    log::info!("Created data directory {}", dir.display());
    Ok(StepOutcome::Performed)
}

/// Bring the snapshot at `data_file` to the current layout.
///
/// A missing snapshot is created empty; an existing one must load cleanly and
/// is written back in the current format.
pub fn migrate(data_file: &Path) -> Result<(Tables, StepOutcome), SetupError> {
    if data_file.exists() {
        let tables = snapshot::load(data_file)?;
        snapshot::save(data_file, &tables)?;
        log::info!("Validated snapshot {}", data_file.display());
        Ok((tables, StepOutcome::Skipped))
    } else {
        let tables = Tables::default();
        snapshot::save(data_file, &tables)?;
        log::info!("Created snapshot {}", data_file.display());
        Ok((tables, StepOutcome::Performed))
    }
}

/// Create the superuser. Fails when the username is taken.
pub fn create_admin(
    t: &mut Tables,
    creds: &AdminCredentials,
    now: DateTime<Utc>,
) -> Result<i64, SetupError> {
    if t.user_by_username(&creds.username).is_some() {
        return Err(SetupError::AdminExists(creds.username.clone()));
    }
    let mut user = User::new(&creds.username, &creds.email, now);
    user.password_hash = hash_password(&creds.password)?;
    promote(&mut user);
    Ok(t.insert(user).id)
}

fn promote(user: &mut User) {
    user.role = Role::Admin;
    user.is_staff = true;
    user.is_superuser = true;
    user.is_active = true;
}

/// Create the admin if needed, then promote it and set its password.
pub fn provision_admin(
    t: &mut Tables,
    creds: &AdminCredentials,
    now: DateTime<Utc>,
) -> Result<AdminOutcome, SetupError> {
    let outcome = match create_admin(t, creds, now) {
        Ok(_) => AdminOutcome::Created,
        Err(e) => {
            log::warn!("Admin creation skipped: {}", e);
            AdminOutcome::Updated
        }
    };
    let password_hash = hash_password(&creds.password)?;
    let user = t
        .users
        .iter_mut()
        .find(|u| u.username == creds.username)
        .ok_or_else(|| SetupError::AdminMissing(creds.username.clone()))?;
    promote(user);
    user.password_hash = password_hash;
    log::info!("Admin account '{}' is ready", creds.username);
    Ok(outcome)
}

/// Server start variant: create and promote the admin, but leave the password
/// of an existing account alone.
pub fn ensure_default_admin(
    t: &mut Tables,
    creds: &AdminCredentials,
    now: DateTime<Utc>,
) -> Result<AdminOutcome, SetupError> {
    let existing = t.user_by_username(&creds.username).map(|u| u.id);
    match existing {
        Some(id) => {
            let user = t.users.require_mut(id)?;
            if !(user.is_staff && user.is_superuser && user.role == Role::Admin) {
                promote(user);
                log::info!("Promoted '{}' to administrator", creds.username);
            }
            Ok(AdminOutcome::Updated)
        }
        None => {
            create_admin(t, creds, now)?;
            log::info!("Created default admin '{}'", creds.username);
            Ok(AdminOutcome::Created)
        }
    }
}

/// Run every setup step against the project directory `root`.
///
/// `data_file` overrides the snapshot location from the environment; relative
/// paths are resolved against `root`.
pub fn run(root: &Path, data_file: Option<&Path>) -> Result<SetupReport, SetupError> {
    log::info!("Setting up Smart Kuku in {}", root.display());
    let env_file = ensure_env_file(root)?;
    load_env(root)?;

    let data_file = match data_file {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(ServerConfig::from_env()?.data_file),
    };
    let data_file = if data_file.is_relative() {
        root.join(data_file)
    } else {
        data_file
    };

    let data_dir = ensure_data_dir(&data_file)?;
    let (mut tables, migrate) = migrate(&data_file)?;

    let creds = AdminCredentials::from_env();
    let admin = provision_admin(&mut tables, &creds, Utc::now())?;
    snapshot::save(&data_file, &tables)?;

    log::info!("Setup complete");
    Ok(SetupReport {
        env_file,
        data_dir,
        migrate,
        admin,
        data_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;

    fn creds(password: &str) -> AdminCredentials {
        AdminCredentials {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn env_file_copied_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(ENV_TEMPLATE), "ADMIN_PASSWORD=secret\n").unwrap();
        assert_eq!(ensure_env_file(dir.path()).unwrap(), StepOutcome::Performed);
        fs::write(dir.path().join(ENV_FILE), "EDITED=1\n").unwrap();
        assert_eq!(ensure_env_file(dir.path()).unwrap(), StepOutcome::Skipped);
        assert_eq!(fs::read_to_string(dir.path().join(ENV_FILE)).unwrap(), "EDITED=1\n");
    }

    #[test]
    fn missing_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ensure_env_file(dir.path()),
            Err(SetupError::MissingEnvTemplate(_))
        ));
    }

    #[test]
    fn provisioning_resets_existing_admin() {
        let mut t = Tables::default();
        let mut existing = User::new("admin", "old@example.com", Utc::now());
        existing.password_hash = hash_password("old-password").unwrap();
        t.insert(existing);

        let outcome = provision_admin(&mut t, &creds("new-password"), Utc::now()).unwrap();
        assert_eq!(outcome, AdminOutcome::Updated);
        let admin = t.user_by_username("admin").unwrap();
        assert!(admin.is_admin());
        assert_eq!(admin.role, Role::Admin);
        assert!(verify_password("new-password", &admin.password_hash));
        assert_eq!(t.users.len(), 1);
    }

    #[test]
    fn default_admin_keeps_password() {
        let mut t = Tables::default();
        assert_eq!(
            ensure_default_admin(&mut t, &creds("first"), Utc::now()).unwrap(),
            AdminOutcome::Created
        );
        ensure_default_admin(&mut t, &creds("second"), Utc::now()).unwrap();
        let admin = t.user_by_username("admin").unwrap();
        assert!(verify_password("first", &admin.password_hash));
    }

    #[test]
    fn migrate_creates_then_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("kuku.json");
        assert_eq!(ensure_data_dir(&path).unwrap(), StepOutcome::Performed);
        assert_eq!(ensure_data_dir(&path).unwrap(), StepOutcome::Skipped);
        assert_eq!(migrate(&path).unwrap().1, StepOutcome::Performed);
        assert_eq!(migrate(&path).unwrap().1, StepOutcome::Skipped);
    }
}

use tracing::{info, warn};

use crate::db;
use crate::error::AppError;
use crate::models::user::{NewUser, User};
use crate::state::AppState;

const MAX_USERNAME_LEN: usize = 50;
const MAX_FULL_NAME_LEN: usize = 100;

pub async fn register(state: &AppState, payload: NewUser) -> Result<User, AppError> {
    let username = payload.username.trim();

    if username.is_empty() {
        return Err(AppError::BadRequest("username cannot be empty".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::BadRequest(format!(
            "username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    if payload.password.is_empty() {
        return Err(AppError::BadRequest("password cannot be empty".to_string()));
    }
    if payload.full_name.chars().count() > MAX_FULL_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "full_name must be at most {MAX_FULL_NAME_LEN} characters"
        )));
    }

    if db::users::find_by_username(&state.db, username).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "username {username} is already registered"
        )));
    }

    let hashed = state.passwords.hash(&payload.password).await?;
    let user = db::users::insert(&state.db, username, &hashed, payload.full_name.trim()).await?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Returns a signed access token. Unknown users and wrong passwords produce
/// the same error.
pub async fn login(state: &AppState, username: &str, password: &str) -> Result<String, AppError> {
    let user = db::users::find_by_username(&state.db, username.trim()).await?;

    let verified = match &user {
        Some(user) => state.passwords.verify(password, &user.hashed_password).await?,
        None => false,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            state
                .metrics
                .login_attempts_total
                .with_label_values(&["failure"])
                .inc();
            warn!(username = %username, "login failed");
            return Err(AppError::InvalidCredentials);
        }
    };

    let token = state.tokens.issue(&user.username)?;
    state
        .metrics
        .login_attempts_total
        .with_label_values(&["success"])
        .inc();

    Ok(token)
}

pub async fn authenticate(state: &AppState, token: &str) -> Result<User, AppError> {
    let claims = state.tokens.verify(token)?;

    match db::users::find_by_username(&state.db, &claims.sub).await? {
        Some(user) if user.is_active => Ok(user),
        _ => Err(AppError::Unauthorized),
    }
}

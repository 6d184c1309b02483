use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use crate::engine::accounts;
use crate::error::AppError;
use crate::models::user::NewUser;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/", post(create_user))
}

#[derive(Serialize)]
pub struct UserCreatedResponse {
    pub msg: &'static str,
    pub id: i64,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewUser>,
) -> Result<Json<UserCreatedResponse>, AppError> {
    let user = accounts::register(&state, payload).await?;

    Ok(Json(UserCreatedResponse {
        msg: "user created",
        id: user.id,
    }))
}

use tracing::info;

use crate::db;
use crate::error::AppError;
use crate::models::package::{NewPackage, Package};
use crate::models::user::User;
use crate::state::AppState;

const MAX_TRACKING_LEN: usize = 50;

pub async fn create_package(state: &AppState, payload: NewPackage) -> Result<Package, AppError> {
    let tracking_number = payload.tracking_number.trim();

    if tracking_number.is_empty() {
        return Err(AppError::BadRequest("tracking cannot be empty".to_string()));
    }
    if tracking_number.chars().count() > MAX_TRACKING_LEN {
        return Err(AppError::BadRequest(format!(
            "tracking must be at most {MAX_TRACKING_LEN} characters"
        )));
    }
    if payload.destination_address.trim().is_empty() {
        return Err(AppError::BadRequest("address cannot be empty".to_string()));
    }

    let agent = db::users::find_by_username(&state.db, payload.agent_username.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("agent not found".to_string()))?;

    let package = db::packages::insert(
        &state.db,
        tracking_number,
        payload.destination_address.trim(),
        payload.destination,
        agent.id,
    )
    .await?;

    state.metrics.packages_created_total.inc();
    info!(
        package_id = package.id,
        tracking_number = %package.tracking_number,
        agent_id = agent.id,
        "package assigned"
    );

    Ok(package)
}

/// Pending packages of `agent`, oldest first.
pub async fn list_assigned(state: &AppState, agent: &User) -> Result<Vec<Package>, AppError> {
    db::packages::list_pending_for_agent(&state.db, agent.id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::accounts;
    use crate::models::location::GeoPoint;
    use crate::models::package::PackageStatus;
    use crate::models::user::NewUser;
    use crate::state::test_support;

    async fn agent(state: &AppState, username: &str) -> User {
        accounts::register(
            state,
            NewUser {
                username: username.to_string(),
                password: "pw".to_string(),
                full_name: username.to_uppercase(),
            },
        )
        .await
        .unwrap()
    }

    fn package_for(tracking: &str, agent_username: &str) -> NewPackage {
        NewPackage {
            tracking_number: tracking.to_string(),
            destination_address: "Av. Reforma 222".to_string(),
            destination: GeoPoint { lat: 0.0, lng: 0.0 },
            agent_username: agent_username.to_string(),
        }
    }

    #[tokio::test]
    async fn unknown_agent_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_support::state(dir.path()).await;

        let err = create_package(&state, package_for("TRK1", "ghost"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn new_package_starts_pending_without_proof() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_support::state(dir.path()).await;
        let agent1 = agent(&state, "agent1").await;

        let package = create_package(&state, package_for("TRK1", "agent1"))
            .await
            .unwrap();

        assert_eq!(package.status, PackageStatus::Pending);
        assert_eq!(package.assigned_agent_id, Some(agent1.id));
        assert!(package.proof.is_none());
    }

    #[tokio::test]
    async fn duplicate_tracking_number_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_support::state(dir.path()).await;
        agent(&state, "agent1").await;

        create_package(&state, package_for("TRK1", "agent1"))
            .await
            .unwrap();
        let err = create_package(&state, package_for("TRK1", "agent1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_only_returns_own_packages_in_id_order() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_support::state(dir.path()).await;
        let agent1 = agent(&state, "agent1").await;
        let agent2 = agent(&state, "agent2").await;

        for tracking in ["TRK3", "TRK1", "TRK2"] {
            create_package(&state, package_for(tracking, "agent1"))
                .await
                .unwrap();
        }
        create_package(&state, package_for("OTHER", "agent2"))
            .await
            .unwrap();

        let mine = list_assigned(&state, &agent1).await.unwrap();
        let tracking: Vec<_> = mine.iter().map(|p| p.tracking_number.as_str()).collect();
        assert_eq!(tracking, vec!["TRK3", "TRK1", "TRK2"]);
        assert!(mine.windows(2).all(|pair| pair[0].id < pair[1].id));

        let theirs = list_assigned(&state, &agent2).await.unwrap();
        assert_eq!(theirs.len(), 1);
        assert_eq!(theirs[0].tracking_number, "OTHER");
    }
}

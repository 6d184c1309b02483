use crate::error::AppError;

/// bcrypt wrapper. Hashing is CPU-bound, so both directions run on the
/// blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_owned();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|err| AppError::Internal(format!("hashing task failed: {err}")))?
            .map_err(|err| AppError::Internal(format!("failed to hash password: {err}")))
    }

    /// A malformed stored hash verifies as `false` rather than erroring.
    pub async fn verify(&self, password: &str, hashed: &str) -> Result<bool, AppError> {
        let password = password.to_owned();
        let hashed = hashed.to_owned();

        let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed))
            .await
            .map_err(|err| AppError::Internal(format!("verify task failed: {err}")))?;

        match outcome {
            Ok(matches) => Ok(matches),
            Err(err) => {
                tracing::warn!(error = %err, "stored password hash is unreadable");
                Ok(false)
            }
        }
    }
}

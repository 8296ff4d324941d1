//! `SeaORM` implementation of the `TokenService` trait.

use crate::db::Store;
use crate::services::token_service::{MODE_READ, MODE_SCAN, TokenError, TokenService};
use async_trait::async_trait;

pub struct SeaOrmTokenService {
    store: Store,
}

impl SeaOrmTokenService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TokenService for SeaOrmTokenService {
    async fn login(
        &self,
        username: &str,
        password: &str,
        mode: Option<String>,
    ) -> Result<String, TokenError> {
        let is_valid = self.store.verify_user_password(username, password).await?;

        if !is_valid {
            return Err(TokenError::InvalidCredentials);
        }

        let user = self
            .store
            .get_user_by_name(username)
            .await?
            .ok_or(TokenError::InvalidCredentials)?;

        // Last writer wins: a concurrent status poll may race this write.
        self.store.set_user_mode(user.id, mode).await?;

        Ok(user.token)
    }

    async fn poll_status(&self, token: &str) -> Result<String, TokenError> {
        let user = self
            .store
            .get_user_by_token(token)
            .await?
            .ok_or(TokenError::InvalidToken)?;

        let new_mode = if user.mode.as_deref() == Some(MODE_SCAN) {
            MODE_READ
        } else {
            MODE_SCAN
        };

        self.store
            .set_user_mode(user.id, Some(new_mode.to_string()))
            .await?;

        Ok(new_mode.to_string())
    }
}

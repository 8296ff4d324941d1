use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::users;

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub token: String,
    pub notes: Option<String>,
    pub mode: Option<String>,
    pub expired_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            token: model.token,
            notes: model.notes,
            mode: model.mode,
            expired_at: model.expired_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Fields accepted when creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub password: String,
    pub notes: Option<String>,
    pub expired_at: Option<String>,
}

/// Fields accepted when editing a user. `password` is re-hashed only when
/// non-blank; `expired_at` replaces the stored expiry only when the outer
/// Option is present.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub notes: Option<String>,
    pub password: Option<String>,
    pub expired_at: Option<Option<String>>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create a user with a freshly generated token and hashed password.
    pub async fn create(&self, input: NewUser, security: &SecurityConfig) -> Result<User> {
        if self.get_by_name(&input.name).await?.is_some() {
            anyhow::bail!("User name already taken: {}", input.name);
        }

        let password = input.password;
        let security = security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            name: Set(input.name),
            password_hash: Set(password_hash),
            token: Set(generate_token()),
            notes: Set(input.notes),
            mode: Set(None),
            expired_at: Set(input.expired_at),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(User::from(model))
    }

    /// Apply an edit. The token is regenerated on every edit so previously
    /// issued credentials stop working once the account is touched.
    pub async fn update(
        &self,
        id: i32,
        input: UserUpdate,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        let Some(user) = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?
        else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        active.name = Set(input.name);
        active.notes = Set(input.notes);

        if let Some(password) = input.password.filter(|p| !p.trim().is_empty()) {
            let security = security.clone();
            let new_hash = task::spawn_blocking(move || hash_password(&password, &security))
                .await
                .context("Password hashing task panicked")??;
            active.password_hash = Set(new_hash);
        }

        if let Some(expired_at) = input.expired_at {
            active.expired_at = Set(expired_at);
        }

        active.token = Set(generate_token());
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update user")?;

        Ok(Some(User::from(model)))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query user by name")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Token.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query user by token")?;

        Ok(user.map(User::from))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn remove(&self, id: i32) -> Result<bool> {
        let Some(user) = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for deletion")?
        else {
            return Ok(false);
        };

        user.delete(&self.conn)
            .await
            .context("Failed to delete user")?;
        Ok(true)
    }

    /// Verify password for a user
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_password(&self, name: &str, password: &str) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let password_hash = user.password_hash;
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    /// Overwrite the mode tag. Last writer wins.
    pub async fn set_mode(&self, id: i32, mode: Option<String>) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for mode update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: users::ActiveModel = user.into();
        active.mode = Set(mode);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Delete every user whose expiry has passed, as one batch.
    /// Returns the number of rows removed.
    pub async fn delete_expired(&self, now: &str) -> Result<u64> {
        let result = users::Entity::delete_many()
            .filter(users::Column::ExpiredAt.is_not_null())
            .filter(users::Column::ExpiredAt.lte(now))
            .exec(&self.conn)
            .await
            .context("Failed to delete expired users")?;

        Ok(result.rows_affected)
    }
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Generate a fresh access token (uuid v4).
#[must_use]
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

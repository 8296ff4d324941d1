use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;

pub mod migrator;
pub mod repositories;

pub use repositories::admin::Admin;
pub use repositories::user::{NewUser, User, UserUpdate};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn admin_repo(&self) -> repositories::admin::AdminRepository {
        repositories::admin::AdminRepository::new(self.conn.clone())
    }

    // ========== User Repository Methods ==========

    pub async fn create_user(&self, input: NewUser, security: &SecurityConfig) -> Result<User> {
        self.user_repo().create(input, security).await
    }

    pub async fn update_user(
        &self,
        id: i32,
        input: UserUpdate,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        self.user_repo().update(id, input, security).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        self.user_repo().get_by_name(name).await
    }

    pub async fn get_user_by_token(&self, token: &str) -> Result<Option<User>> {
        self.user_repo().get_by_token(token).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn remove_user(&self, id: i32) -> Result<bool> {
        self.user_repo().remove(id).await
    }

    pub async fn verify_user_password(&self, name: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(name, password).await
    }

    pub async fn set_user_mode(&self, id: i32, mode: Option<String>) -> Result<()> {
        self.user_repo().set_mode(id, mode).await
    }

    pub async fn delete_expired_users(&self, now: &str) -> Result<u64> {
        self.user_repo().delete_expired(now).await
    }

    // ========== Admin Repository Methods ==========

    pub async fn get_admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        self.admin_repo().get_by_username(username).await
    }

    pub async fn verify_admin_password(&self, username: &str, password: &str) -> Result<bool> {
        self.admin_repo().verify_password(username, password).await
    }

    pub async fn update_admin_password(
        &self,
        username: &str,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<()> {
        self.admin_repo()
            .update_password(username, new_password, security)
            .await
    }

    pub async fn reset_admin(
        &self,
        username: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<()> {
        self.admin_repo().reset(username, password, security).await
    }
}

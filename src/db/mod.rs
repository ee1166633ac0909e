use anyhow::Result;
use sea_orm::prelude::DateTimeUtc;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::payments;

pub mod migrator;
pub mod repositories;

pub use repositories::apikey::ApiKeyOwner;
pub use repositories::user::Account;

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

    fn apikey_repo(&self) -> repositories::apikey::ApiKeyRepository {
        repositories::apikey::ApiKeyRepository::new(self.conn.clone())
    }

    fn payment_repo(&self) -> repositories::payment::PaymentRepository {
        repositories::payment::PaymentRepository::new(self.conn.clone())
    }

    // ========== User Repository Methods ==========

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_username_with_hash(
        &self,
        username: &str,
    ) -> Result<Option<(Account, String)>> {
        self.user_repo().get_by_username_with_hash(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Account> {
        self.user_repo()
            .create(username, email, password_hash)
            .await
    }

    pub async fn set_user_disabled(&self, id: i32, disabled: bool) -> Result<()> {
        self.user_repo().set_disabled(id, disabled).await
    }

    pub async fn update_user_password(&self, id: i32, new_hash: &str) -> Result<()> {
        self.user_repo().update_password(id, new_hash).await
    }

    // ========== API Key Repository Methods ==========

    pub async fn create_api_key(
        &self,
        user_id: i32,
        hashed_key: &str,
        key_prefix: &str,
    ) -> Result<()> {
        self.apikey_repo()
            .create(user_id, hashed_key, key_prefix)
            .await
    }

    pub async fn find_api_keys_by_prefix(&self, prefix: &str) -> Result<Vec<ApiKeyOwner>> {
        self.apikey_repo().find_by_prefix(prefix).await
    }

    // ========== Payment Repository Methods ==========

    pub async fn create_payment(
        &self,
        date: DateTimeUtc,
        document: Option<String>,
        beneficiary: &str,
        amount: f64,
    ) -> Result<payments::Model> {
        self.payment_repo()
            .create(date, document, beneficiary, amount)
            .await
    }

    pub async fn list_payments(&self, skip: u64, limit: u64) -> Result<Vec<payments::Model>> {
        self.payment_repo().list(skip, limit).await
    }

    pub async fn list_all_payments(&self) -> Result<Vec<payments::Model>> {
        self.payment_repo().list_all().await
    }

    pub async fn list_payments_between(
        &self,
        start: DateTimeUtc,
        end: DateTimeUtc,
    ) -> Result<Vec<payments::Model>> {
        self.payment_repo().list_between(start, end).await
    }
}

use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{api_keys, users};

use super::user::Account;

/// A stored key candidate joined with its owning account.
#[derive(Debug, Clone)]
pub struct ApiKeyOwner {
    pub hashed_key: String,
    pub account: Account,
}

pub struct ApiKeyRepository {
    conn: DatabaseConnection,
}

impl ApiKeyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Store a new hashed key for a user
    pub async fn create(&self, user_id: i32, hashed_key: &str, key_prefix: &str) -> Result<()> {
        let active = api_keys::ActiveModel {
            user_id: Set(user_id),
            hashed_key: Set(hashed_key.to_string()),
            key_prefix: Set(key_prefix.to_string()),
            is_active: Set(true),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert API key")?;

        Ok(())
    }

    /// All keys sharing a prefix, each joined with its owner.
    /// Rows whose owner is missing are skipped.
    pub async fn find_by_prefix(&self, prefix: &str) -> Result<Vec<ApiKeyOwner>> {
        let rows = api_keys::Entity::find()
            .filter(api_keys::Column::KeyPrefix.eq(prefix))
            .find_also_related(users::Entity)
            .all(&self.conn)
            .await
            .context("Failed to query API keys by prefix")?;

        Ok(rows
            .into_iter()
            .filter_map(|(key, user)| {
                user.map(|u| ApiKeyOwner {
                    hashed_key: key.hashed_key,
                    account: Account::from(u),
                })
            })
            .collect())
    }
}

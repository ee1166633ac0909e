use anyhow::{Context, Result};
use sea_orm::prelude::DateTimeUtc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::payments;

pub struct PaymentRepository {
    conn: DatabaseConnection,
}

impl PaymentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a payment row
    pub async fn create(
        &self,
        date: DateTimeUtc,
        document: Option<String>,
        beneficiary: &str,
        amount: f64,
    ) -> Result<payments::Model> {
        let active = payments::ActiveModel {
            date: Set(date),
            document: Set(document),
            beneficiary: Set(beneficiary.to_string()),
            amount: Set(amount),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert payment")?;

        Ok(model)
    }

    /// One page of payments in insertion order
    pub async fn list(&self, skip: u64, limit: u64) -> Result<Vec<payments::Model>> {
        let page = payments::Entity::find()
            .order_by_asc(payments::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query payments page")?;

        Ok(page)
    }

    /// Every payment, unpaginated
    pub async fn list_all(&self) -> Result<Vec<payments::Model>> {
        let rows = payments::Entity::find()
            .order_by_asc(payments::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query all payments")?;

        Ok(rows)
    }

    /// Payments dated inside [start, end], inclusive on both ends
    pub async fn list_between(
        &self,
        start: DateTimeUtc,
        end: DateTimeUtc,
    ) -> Result<Vec<payments::Model>> {
        let rows = payments::Entity::find()
            .filter(payments::Column::Date.between(start, end))
            .order_by_asc(payments::Column::Date)
            .all(&self.conn)
            .await
            .context("Failed to query payments by date range")?;

        Ok(rows)
    }
}

//! Persistence for order documents.
//!
//! Terminal transitions go through [`OrderStore::settle`], which only ever
//! applies to an order that is still `pending`; a miss means another callback
//! already settled it (or the order does not exist).

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, DateTime, Document},
    options::{FindOptions, IndexOptions},
    Collection, Database, IndexModel,
};

use crate::error::{StorefrontError, StorefrontResult};
use crate::models::{AdminOverride, Order, OrderStatus, Settlement};

/// Listing criteria; unset fields match everything.
#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    pub email: Option<String>,
    pub status: Option<OrderStatus>,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Round-trip to the backing store, used by health checks.
    async fn ping(&self) -> StorefrontResult<()>;

    async fn insert(&self, order: &Order) -> StorefrontResult<()>;

    async fn find(&self, transaction_id: &str) -> StorefrontResult<Option<Order>>;

    /// Newest first.
    async fn list(&self, filter: &OrderFilter) -> StorefrontResult<Vec<Order>>;

    /// Move a `pending` order to the settlement's terminal state. Returns
    /// `false` when nothing matched.
    async fn settle(&self, transaction_id: &str, settlement: &Settlement)
        -> StorefrontResult<bool>;

    /// Force the status regardless of lifecycle, recording who did it.
    /// Returns the updated order, or `None` if it does not exist.
    async fn override_status(
        &self,
        transaction_id: &str,
        status: OrderStatus,
        by: &str,
    ) -> StorefrontResult<Option<Order>>;
}

#[derive(Clone)]
pub struct MongoOrderStore {
    db: Database,
    orders: Collection<Order>,
}

/// Concurrent overrides of the same order are rare; give up after this many
/// lost races rather than spin.
const OVERRIDE_ATTEMPTS: usize = 3;

impl MongoOrderStore {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            orders: db.collection("orders"),
        }
    }

    pub async fn init_indexes(&self) -> StorefrontResult<()> {
        let transaction_index = IndexModel::builder()
            .keys(doc! { "transactionId": 1 })
            .options(
                IndexOptions::builder()
                    .name("transaction_id_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1, "createdAt": -1 })
            .options(
                IndexOptions::builder()
                    .name("email_created_at_idx".to_string())
                    .build(),
            )
            .build();

        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1, "createdAt": -1 })
            .options(
                IndexOptions::builder()
                    .name("status_created_at_idx".to_string())
                    .build(),
            )
            .build();

        self.orders
            .create_indexes([transaction_index, email_index, status_index], None)
            .await?;

        tracing::info!("Order indexes initialized");
        Ok(())
    }
}

fn settlement_update(settlement: &Settlement) -> StorefrontResult<Document> {
    let mut set = doc! {
        "status": settlement.status().as_str(),
        "paymentStatus": to_bson(&settlement.payment_status())?,
        "paymentDetails": to_bson(&settlement.payment_details)?,
    };
    set.insert(settlement.timestamp_field(), settlement.at);
    if let Some(validation) = &settlement.validation_details {
        set.insert("validationDetails", to_bson(validation)?);
    }
    Ok(doc! { "$set": set })
}

#[async_trait]
impl OrderStore for MongoOrderStore {
    async fn ping(&self) -> StorefrontResult<()> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    async fn insert(&self, order: &Order) -> StorefrontResult<()> {
        self.orders.insert_one(order, None).await?;
        Ok(())
    }

    async fn find(&self, transaction_id: &str) -> StorefrontResult<Option<Order>> {
        let order = self
            .orders
            .find_one(doc! { "transactionId": transaction_id }, None)
            .await?;
        Ok(order)
    }

    async fn list(&self, filter: &OrderFilter) -> StorefrontResult<Vec<Order>> {
        let mut query = Document::new();
        if let Some(email) = &filter.email {
            query.insert("email", email.as_str());
        }
        if let Some(status) = filter.status {
            query.insert("status", status.as_str());
        }

        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();

        let cursor = self.orders.find(query, Some(options)).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn settle(
        &self,
        transaction_id: &str,
        settlement: &Settlement,
    ) -> StorefrontResult<bool> {
        let filter = doc! {
            "transactionId": transaction_id,
            "status": OrderStatus::Pending.as_str(),
        };
        let result = self
            .orders
            .update_one(filter, settlement_update(settlement)?, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn override_status(
        &self,
        transaction_id: &str,
        status: OrderStatus,
        by: &str,
    ) -> StorefrontResult<Option<Order>> {
        for _ in 0..OVERRIDE_ATTEMPTS {
            let Some(current) = self.find(transaction_id).await? else {
                return Ok(None);
            };

            let now = DateTime::now();
            let entry = AdminOverride {
                from: current.status,
                to: status,
                by: by.to_string(),
                at: now,
            };

            // Conditioned on the status we read so the audit entry's `from`
            // is accurate.
            let filter = doc! {
                "transactionId": transaction_id,
                "status": current.status.as_str(),
            };
            let update = doc! {
                "$set": { "status": status.as_str(), "updatedAt": now },
                "$push": { "adminOverrides": to_bson(&entry)? },
            };

            let result = self.orders.update_one(filter, update, None).await?;
            if result.matched_count == 1 {
                return self.find(transaction_id).await;
            }
        }

        Err(StorefrontError::InvalidRequest(
            "Order changed while being updated, retry the override".to_string(),
        ))
    }
}

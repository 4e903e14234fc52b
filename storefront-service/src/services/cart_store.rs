use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, UpdateOptions},
    Collection, Database, IndexModel,
};

use crate::error::StorefrontResult;
use crate::models::CartItem;

const DUPLICATE_KEY: i32 = 11000;

/// What a customer adds to their cart; quantity starts at one.
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub email: String,
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub price: f64,
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn list(&self, email: &str) -> StorefrontResult<Vec<CartItem>>;

    /// Increment the quantity of `(email, productId)` or insert it with one.
    /// Returns `true` when a new line was created.
    async fn add(&self, item: &NewCartItem) -> StorefrontResult<bool>;

    /// Returns `false` if `id` is not one of `email`'s items.
    async fn set_quantity(&self, email: &str, id: ObjectId, quantity: u32)
        -> StorefrontResult<bool>;

    async fn remove(&self, email: &str, id: ObjectId) -> StorefrontResult<bool>;

    /// Delete every item held by `email`, returning how many went.
    async fn clear(&self, email: &str) -> StorefrontResult<u64>;
}

#[derive(Clone)]
pub struct MongoCartStore {
    carts: Collection<CartItem>,
}

impl MongoCartStore {
    pub fn new(db: &Database) -> Self {
        Self {
            carts: db.collection("carts"),
        }
    }

    pub async fn init_indexes(&self) -> StorefrontResult<()> {
        self.carts.create_index(line_index(), None).await?;
        tracing::info!("Cart indexes initialized");
        Ok(())
    }
}

/// One line per (email, productId). Uniqueness is what keeps concurrent
/// upserts of the same line from inserting twice.
fn line_index() -> IndexModel {
    IndexModel::builder()
        .keys(doc! { "email": 1, "productId": 1 })
        .options(
            IndexOptions::builder()
                .name("cart_line_unique".to_string())
                .unique(true)
                .build(),
        )
        .build()
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[async_trait]
impl CartStore for MongoCartStore {
    async fn list(&self, email: &str) -> StorefrontResult<Vec<CartItem>> {
        let cursor = self.carts.find(doc! { "email": email }, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn add(&self, item: &NewCartItem) -> StorefrontResult<bool> {
        let filter = doc! { "email": item.email.as_str(), "productId": item.product_id.as_str() };
        let update = doc! {
            "$inc": { "quantity": 1 },
            "$setOnInsert": {
                "name": item.name.as_str(),
                "image": item.image.as_str(),
                "price": item.price,
            },
        };
        let options = UpdateOptions::builder().upsert(true).build();

        match self
            .carts
            .update_one(filter.clone(), update.clone(), options.clone())
            .await
        {
            Ok(result) => Ok(result.upserted_id.is_some()),
            // A concurrent add inserted the line first; this one increments it.
            Err(e) if is_duplicate_key(&e) => {
                tracing::debug!(
                    email = %item.email,
                    product_id = %item.product_id,
                    "Cart line raced, retrying as increment"
                );
                self.carts.update_one(filter, update, options).await?;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set_quantity(
        &self,
        email: &str,
        id: ObjectId,
        quantity: u32,
    ) -> StorefrontResult<bool> {
        let result = self
            .carts
            .update_one(
                doc! { "_id": id, "email": email },
                doc! { "$set": { "quantity": quantity as i64 } },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn remove(&self, email: &str, id: ObjectId) -> StorefrontResult<bool> {
        let result = self
            .carts
            .delete_one(doc! { "_id": id, "email": email }, None)
            .await?;
        Ok(result.deleted_count == 1)
    }

    async fn clear(&self, email: &str) -> StorefrontResult<u64> {
        let result = self.carts.delete_many(doc! { "email": email }, None).await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_line_index_is_unique_on_email_and_product() {
        let index = line_index();

        assert_eq!(index.keys, doc! { "email": 1, "productId": 1 });
        let options = index.options.expect("index options");
        assert_eq!(options.unique, Some(true));
    }
}

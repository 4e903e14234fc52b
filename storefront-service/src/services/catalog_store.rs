//! Product collections. Products are free-form documents; the store only
//! cares about `_id`.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    Database,
};

use crate::error::StorefrontResult;
use crate::models::{Category, ProductId};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list(&self, category: Category) -> StorefrontResult<Vec<Document>>;

    async fn get(&self, category: Category, id: &ProductId) -> StorefrontResult<Option<Document>>;

    /// Returns the `_id` the document was stored under.
    async fn insert(&self, category: Category, product: Document) -> StorefrontResult<Bson>;

    /// `$set` the given fields. Returns `false` if no product matched.
    async fn update(
        &self,
        category: Category,
        id: &ProductId,
        fields: Document,
    ) -> StorefrontResult<bool>;

    async fn delete(&self, category: Category, id: &ProductId) -> StorefrontResult<bool>;
}

#[derive(Clone)]
pub struct MongoCatalogStore {
    db: Database,
}

impl MongoCatalogStore {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    fn collection(&self, category: Category) -> mongodb::Collection<Document> {
        self.db.collection(category.collection_name())
    }
}

#[async_trait]
impl CatalogStore for MongoCatalogStore {
    async fn list(&self, category: Category) -> StorefrontResult<Vec<Document>> {
        let cursor = self.collection(category).find(None, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get(&self, category: Category, id: &ProductId) -> StorefrontResult<Option<Document>> {
        let collection = self.collection(category);
        for filter in id.filters() {
            if let Some(product) = collection.find_one(filter, None).await? {
                return Ok(Some(product));
            }
        }
        Ok(None)
    }

    async fn insert(&self, category: Category, product: Document) -> StorefrontResult<Bson> {
        let result = self.collection(category).insert_one(product, None).await?;
        Ok(result.inserted_id)
    }

    async fn update(
        &self,
        category: Category,
        id: &ProductId,
        fields: Document,
    ) -> StorefrontResult<bool> {
        let collection = self.collection(category);
        for filter in id.filters() {
            let result = collection
                .update_one(filter, doc! { "$set": fields.clone() }, None)
                .await?;
            if result.matched_count > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn delete(&self, category: Category, id: &ProductId) -> StorefrontResult<bool> {
        let collection = self.collection(category);
        for filter in id.filters() {
            let result = collection.delete_one(filter, None).await?;
            if result.deleted_count > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

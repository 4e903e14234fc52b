use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson},
    options::IndexOptions,
    Collection, Database, IndexModel,
};

use crate::error::StorefrontResult;
use crate::models::{Role, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StorefrontResult<Option<User>>;

    /// Insert unless a user with the same email exists. Returns the new id,
    /// or `None` if the email was already registered.
    async fn register(&self, user: &User) -> StorefrontResult<Option<ObjectId>>;

    async fn list(&self) -> StorefrontResult<Vec<User>>;

    async fn set_role(&self, id: ObjectId, role: Role) -> StorefrontResult<bool>;

    async fn delete(&self, id: ObjectId) -> StorefrontResult<bool>;
}

#[derive(Clone)]
pub struct MongoUserStore {
    users: Collection<User>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection("users"),
        }
    }

    pub async fn init_indexes(&self) -> StorefrontResult<()> {
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_email_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.users.create_index(email_index, None).await?;
        tracing::info!("User indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_email(&self, email: &str) -> StorefrontResult<Option<User>> {
        Ok(self.users.find_one(doc! { "email": email }, None).await?)
    }

    async fn register(&self, user: &User) -> StorefrontResult<Option<ObjectId>> {
        if self.find_by_email(&user.email).await?.is_some() {
            return Ok(None);
        }

        let mut user = user.clone();
        let id = ObjectId::new();
        user.id = Some(id);

        match self.users.insert_one(&user, None).await {
            Ok(_) => Ok(Some(id)),
            // Lost a race against a concurrent registration; the unique
            // index rejected the duplicate.
            Err(e) if is_duplicate_key(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> StorefrontResult<Vec<User>> {
        let cursor = self.users.find(None, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn set_role(&self, id: ObjectId, role: Role) -> StorefrontResult<bool> {
        let result = self
            .users
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "role": to_bson(&role)? } },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete(&self, id: ObjectId) -> StorefrontResult<bool> {
        let result = self.users.delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count == 1)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

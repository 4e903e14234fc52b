use mongodb::{bson::doc, options::ClientOptions, Client as MongoClient, Database};
use service_core::error::AppError;

use crate::services::cart_store::MongoCartStore;
use crate::services::catalog_store::MongoCatalogStore;
use crate::services::order_store::MongoOrderStore;
use crate::services::user_store::MongoUserStore;

/// Connection to the storefront database and the stores built on it.
#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        let mut options = ClientOptions::parse(uri).await.map_err(|e| {
            tracing::error!("Failed to parse MongoDB connection string: {}", e);
            AppError::from(e)
        })?;
        options.app_name = Some("storefront-service".to_string());

        let client = MongoClient::with_options(options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Connected to MongoDB database");

        Ok(Self { client, db })
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        self.db
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB ping failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn orders(&self) -> MongoOrderStore {
        MongoOrderStore::new(&self.db)
    }

    pub fn carts(&self) -> MongoCartStore {
        MongoCartStore::new(&self.db)
    }

    pub fn users(&self) -> MongoUserStore {
        MongoUserStore::new(&self.db)
    }

    pub fn catalog(&self) -> MongoCatalogStore {
        MongoCatalogStore::new(&self.db)
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for storefront-service");

        self.orders().init_indexes().await.map_err(AppError::from)?;
        self.carts().init_indexes().await.map_err(AppError::from)?;
        self.users().init_indexes().await.map_err(AppError::from)?;

        Ok(())
    }

    pub async fn shutdown(self) {
        self.client.shutdown().await;
        tracing::info!("MongoDB client shut down");
    }
}

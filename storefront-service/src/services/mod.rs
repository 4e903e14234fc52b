pub mod cart_store;
pub mod catalog_store;
pub mod database;
pub mod gateway;
pub mod initiator;
pub mod jwt;
pub mod memory;
pub mod metrics;
pub mod order_store;
pub mod payments;
pub mod reconciler;
pub mod sslcommerz;
pub mod stats;
pub mod user_store;

pub use cart_store::{CartStore, MongoCartStore, NewCartItem};
pub use catalog_store::{CatalogStore, MongoCatalogStore};
pub use database::MongoDb;
pub use gateway::{GatewayError, PaymentGateway};
pub use initiator::{CheckoutRequest, CheckoutSession};
pub use jwt::{Claims, JwtService};
pub use memory::{InMemoryCartStore, InMemoryCatalogStore, InMemoryOrderStore, InMemoryUserStore};
pub use metrics::{get_metrics, init_metrics};
pub use order_store::{MongoOrderStore, OrderFilter, OrderStore};
pub use payments::{PaymentService, PaymentSettings};
pub use reconciler::CallbackOutcome;
pub use sslcommerz::SslCommerzClient;
pub use user_store::{MongoUserStore, UserStore};

pub mod cart;
pub mod order;
pub mod payment;
pub mod user;

use mongodb::bson::DateTime;

pub(crate) fn to_utc(at: DateTime) -> chrono::DateTime<chrono::Utc> {
    at.to_chrono()
}

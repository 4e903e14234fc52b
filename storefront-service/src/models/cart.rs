use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A product quantity held by a customer before checkout, keyed by
/// `(email, productId)`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub price: f64,
    pub quantity: u32,
}

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::CartItem;
use crate::services::NewCartItem;

#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "productId is required"))]
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: f64,
}

impl From<AddCartItemRequest> for NewCartItem {
    fn from(req: AddCartItemRequest) -> Self {
        Self {
            email: req.email,
            product_id: req.product_id,
            name: req.name,
            image: req.image,
            price: req.price,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddCartItemResponse {
    pub inserted: bool,
    pub modified: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub price: f64,
    pub quantity: u32,
}

impl From<CartItem> for CartItemResponse {
    fn from(item: CartItem) -> Self {
        Self {
            id: item.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: item.email,
            product_id: item.product_id,
            name: item.name,
            image: item.image,
            price: item.price,
            quantity: item.quantity,
        }
    }
}

//! Product catalog, one collection per category.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::{self, Bson, Document};
use serde_json::{json, Map, Value};
use service_core::error::AppError;

use crate::{
    error::StorefrontError,
    models::{Category, ProductId},
    AppState,
};

/// Render a stored product for the wire, with `_id` as a plain string.
fn product_json(product: Document) -> Value {
    let mut value = Bson::Document(product).into_relaxed_extjson();
    if let Some(id) = value.get_mut("_id") {
        let hex = id.get("$oid").and_then(Value::as_str).map(str::to_string);
        if let Some(hex) = hex {
            *id = Value::String(hex);
        }
    }
    value
}

fn id_json(id: Bson) -> Value {
    match id {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        other => other.into_relaxed_extjson(),
    }
}

fn to_document(body: Map<String, Value>) -> Result<Document, StorefrontError> {
    Ok(bson::to_document(&body)?)
}

pub async fn list_products(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Value>>, AppError> {
    let category: Category = category.parse()?;
    let products = state.catalog.list(category).await?;
    Ok(Json(products.into_iter().map(product_json).collect()))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path((category, id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let category: Category = category.parse()?;
    let id = ProductId::parse(&id)?;

    let product = state
        .catalog
        .get(category, &id)
        .await?
        .ok_or(StorefrontError::NotFound("Product"))?;
    Ok(Json(product_json(product)))
}

pub async fn create_product(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let category: Category = category.parse()?;
    let mut product = to_document(body)?;
    // Ids are assigned by the store.
    product.remove("_id");

    let inserted_id = state.catalog.insert(category, product).await?;
    tracing::info!(category = category.collection_name(), "Product created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "insertedId": id_json(inserted_id) })),
    ))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path((category, id)): Path<(String, String)>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<Value>, AppError> {
    let category: Category = category.parse()?;
    let id = ProductId::parse(&id)?;
    let mut fields = to_document(body)?;
    fields.remove("_id");
    if fields.is_empty() {
        return Err(StorefrontError::InvalidRequest("Nothing to update".to_string()).into());
    }

    if !state.catalog.update(category, &id, fields).await? {
        return Err(StorefrontError::NotFound("Product").into());
    }
    Ok(Json(json!({ "message": "Product updated successfully" })))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path((category, id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let category: Category = category.parse()?;
    let id = ProductId::parse(&id)?;

    if !state.catalog.delete(category, &id).await? {
        return Err(StorefrontError::NotFound("Product").into());
    }
    Ok(Json(json!({ "message": "Product deleted successfully", "deletedCount": 1 })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};

    #[test]
    fn object_ids_render_as_hex_strings() {
        let oid = ObjectId::new();
        let value = product_json(doc! { "_id": oid, "name": "Helmet", "price": 4500 });
        assert_eq!(value["_id"], oid.to_hex());
        assert_eq!(value["price"], 4500);
    }

    #[test]
    fn legacy_string_ids_are_untouched() {
        let value = product_json(doc! { "_id": "helmet-001" });
        assert_eq!(value["_id"], "helmet-001");
    }
}

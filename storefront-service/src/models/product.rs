//! Catalog addressing: which collection a request targets and how a product
//! id is matched against records written with either id style.

use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use std::str::FromStr;

use crate::error::StorefrontError;

/// A catalog collection, resolved once while parsing the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    All,
    Helmet,
    Tyre,
    SpareParts,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::All,
        Category::Helmet,
        Category::Tyre,
        Category::SpareParts,
    ];

    pub fn collection_name(&self) -> &'static str {
        match self {
            Category::All => "allproducts",
            Category::Helmet => "helmet",
            Category::Tyre => "tyre",
            Category::SpareParts => "spareParts",
        }
    }
}

impl FromStr for Category {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allproducts" => Ok(Category::All),
            "helmet" => Ok(Category::Helmet),
            "tyre" => Ok(Category::Tyre),
            "spareparts" => Ok(Category::SpareParts),
            _ => Err(StorefrontError::InvalidRequest(format!(
                "Invalid category: {}",
                s
            ))),
        }
    }
}

/// A product id as received on the wire.
///
/// Newer records use an ObjectId `_id`; legacy ones stored the id as a plain
/// string. Lookups try the ObjectId form first (when the input parses as one)
/// and fall back to the raw string.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductId {
    raw: String,
    object_id: Option<ObjectId>,
}

impl ProductId {
    pub fn parse(raw: &str) -> Result<Self, StorefrontError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(StorefrontError::InvalidRequest(
                "Product id must not be empty".to_string(),
            ));
        }
        Ok(Self {
            raw: raw.to_string(),
            object_id: ObjectId::parse_str(raw).ok(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Candidate `_id` values in lookup order.
    pub fn candidates(&self) -> Vec<Bson> {
        let mut out = Vec::with_capacity(2);
        if let Some(oid) = self.object_id {
            out.push(Bson::ObjectId(oid));
        }
        out.push(Bson::String(self.raw.clone()));
        out
    }

    /// `_id` filters in lookup order.
    pub fn filters(&self) -> Vec<Document> {
        self.candidates()
            .into_iter()
            .map(|id| doc! { "_id": id })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_categories_case_insensitively() {
        assert_eq!("Helmet".parse::<Category>().unwrap(), Category::Helmet);
        assert_eq!("SPAREPARTS".parse::<Category>().unwrap(), Category::SpareParts);
        assert_eq!("allproducts".parse::<Category>().unwrap(), Category::All);
    }

    #[test]
    fn rejects_unknown_category() {
        let err = "gloves".parse::<Category>().unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidRequest(_)));
    }

    #[test]
    fn object_id_is_tried_before_raw_string() {
        let hex = "65a1b2c3d4e5f60718293a4b";
        let id = ProductId::parse(hex).unwrap();
        let filters = id.filters();

        assert_eq!(filters.len(), 2);
        assert!(matches!(filters[0].get("_id"), Some(Bson::ObjectId(_))));
        assert_eq!(filters[1].get_str("_id").unwrap(), hex);
    }

    #[test]
    fn legacy_ids_only_use_raw_string() {
        let id = ProductId::parse("helmet-001").unwrap();
        assert_eq!(id.candidates(), vec![Bson::String("helmet-001".into())]);
    }

    #[test]
    fn empty_id_is_invalid() {
        assert!(ProductId::parse("  ").is_err());
    }
}

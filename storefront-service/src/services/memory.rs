//! In-process implementations of the stores.
//!
//! Each mutation runs under the DashMap shard lock for its key, so the
//! pending-only guard in [`InMemoryOrderStore::settle`] is a real
//! compare-and-swap just like the conditional update against MongoDB.

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use mongodb::bson::{oid::ObjectId, Bson, DateTime, Document};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{StorefrontError, StorefrontResult};
use crate::models::{
    AdminOverride, CartItem, Category, Order, OrderStatus, ProductId, Role, Settlement, User,
};
use crate::services::cart_store::{CartStore, NewCartItem};
use crate::services::catalog_store::CatalogStore;
use crate::services::order_store::{OrderFilter, OrderStore};
use crate::services::user_store::UserStore;

#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<DashMap<String, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn ping(&self) -> StorefrontResult<()> {
        Ok(())
    }

    async fn insert(&self, order: &Order) -> StorefrontResult<()> {
        match self.orders.entry(order.transaction_id.clone()) {
            Entry::Occupied(_) => Err(StorefrontError::InvalidRequest(format!(
                "Duplicate transaction id {}",
                order.transaction_id
            ))),
            Entry::Vacant(slot) => {
                let mut order = order.clone();
                order.id.get_or_insert_with(ObjectId::new);
                slot.insert(order);
                Ok(())
            }
        }
    }

    async fn find(&self, transaction_id: &str) -> StorefrontResult<Option<Order>> {
        Ok(self.orders.get(transaction_id).map(|o| o.value().clone()))
    }

    async fn list(&self, filter: &OrderFilter) -> StorefrontResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| filter.email.as_deref().map_or(true, |e| o.email == e))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .map(|o| o.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn settle(
        &self,
        transaction_id: &str,
        settlement: &Settlement,
    ) -> StorefrontResult<bool> {
        Ok(match self.orders.get_mut(transaction_id) {
            Some(mut order) => order.apply(settlement),
            None => false,
        })
    }

    async fn override_status(
        &self,
        transaction_id: &str,
        status: OrderStatus,
        by: &str,
    ) -> StorefrontResult<Option<Order>> {
        let Some(mut order) = self.orders.get_mut(transaction_id) else {
            return Ok(None);
        };

        let now = DateTime::now();
        let entry = AdminOverride {
            from: order.status,
            to: status,
            by: by.to_string(),
            at: now,
        };
        order.status = status;
        order.updated_at = Some(now);
        order.admin_overrides.push(entry);

        Ok(Some(order.clone()))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    items: Arc<DashMap<(String, String), CartItem>>,
    clears: Arc<AtomicUsize>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `clear` has been called.
    pub fn clear_calls(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    fn key_of(&self, email: &str, id: ObjectId) -> Option<(String, String)> {
        self.items
            .iter()
            .find(|item| item.email == email && item.id == Some(id))
            .map(|item| item.key().clone())
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn list(&self, email: &str) -> StorefrontResult<Vec<CartItem>> {
        Ok(self
            .items
            .iter()
            .filter(|item| item.email == email)
            .map(|item| item.value().clone())
            .collect())
    }

    async fn add(&self, item: &NewCartItem) -> StorefrontResult<bool> {
        match self
            .items
            .entry((item.email.clone(), item.product_id.clone()))
        {
            Entry::Occupied(mut existing) => {
                existing.get_mut().quantity += 1;
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(CartItem {
                    id: Some(ObjectId::new()),
                    email: item.email.clone(),
                    product_id: item.product_id.clone(),
                    name: item.name.clone(),
                    image: item.image.clone(),
                    price: item.price,
                    quantity: 1,
                });
                Ok(true)
            }
        }
    }

    async fn set_quantity(
        &self,
        email: &str,
        id: ObjectId,
        quantity: u32,
    ) -> StorefrontResult<bool> {
        let Some(key) = self.key_of(email, id) else {
            return Ok(false);
        };
        Ok(match self.items.get_mut(&key) {
            Some(mut item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        })
    }

    async fn remove(&self, email: &str, id: ObjectId) -> StorefrontResult<bool> {
        let Some(key) = self.key_of(email, id) else {
            return Ok(false);
        };
        Ok(self.items.remove(&key).is_some())
    }

    async fn clear(&self, email: &str) -> StorefrontResult<u64> {
        self.clears.fetch_add(1, Ordering::SeqCst);

        let keys: Vec<_> = self
            .items
            .iter()
            .filter(|item| item.email == email)
            .map(|item| item.key().clone())
            .collect();

        let removed = keys
            .iter()
            .filter(|key| self.items.remove(*key).is_some())
            .count() as u64;
        Ok(removed)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<DashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn email_of(&self, id: ObjectId) -> Option<String> {
        self.users
            .iter()
            .find(|u| u.id == Some(id))
            .map(|u| u.key().clone())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> StorefrontResult<Option<User>> {
        Ok(self.users.get(email).map(|u| u.value().clone()))
    }

    async fn register(&self, user: &User) -> StorefrontResult<Option<ObjectId>> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => {
                let id = ObjectId::new();
                let mut user = user.clone();
                user.id = Some(id);
                slot.insert(user);
                Ok(Some(id))
            }
        }
    }

    async fn list(&self) -> StorefrontResult<Vec<User>> {
        Ok(self.users.iter().map(|u| u.value().clone()).collect())
    }

    async fn set_role(&self, id: ObjectId, role: Role) -> StorefrontResult<bool> {
        let Some(email) = self.email_of(id) else {
            return Ok(false);
        };
        Ok(match self.users.get_mut(&email) {
            Some(mut user) => {
                user.role = Some(role);
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: ObjectId) -> StorefrontResult<bool> {
        let Some(email) = self.email_of(id) else {
            return Ok(false);
        };
        Ok(self.users.remove(&email).is_some())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
    products: Arc<DashMap<Category, Vec<Document>>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the first product matching the id, honouring the
    /// ObjectId-then-string lookup order.
    fn position(products: &[Document], id: &ProductId) -> Option<usize> {
        id.candidates()
            .into_iter()
            .find_map(|candidate| products.iter().position(|p| p.get("_id") == Some(&candidate)))
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn list(&self, category: Category) -> StorefrontResult<Vec<Document>> {
        Ok(self
            .products
            .get(&category)
            .map(|p| p.value().clone())
            .unwrap_or_default())
    }

    async fn get(&self, category: Category, id: &ProductId) -> StorefrontResult<Option<Document>> {
        Ok(self.products.get(&category).and_then(|products| {
            Self::position(&products, id).map(|idx| products[idx].clone())
        }))
    }

    async fn insert(&self, category: Category, mut product: Document) -> StorefrontResult<Bson> {
        if !product.contains_key("_id") {
            product.insert("_id", ObjectId::new());
        }
        let id = product.get("_id").cloned().unwrap_or(Bson::Null);
        self.products.entry(category).or_default().push(product);
        Ok(id)
    }

    async fn update(
        &self,
        category: Category,
        id: &ProductId,
        fields: Document,
    ) -> StorefrontResult<bool> {
        let Some(mut products) = self.products.get_mut(&category) else {
            return Ok(false);
        };
        let Some(idx) = Self::position(&products, id) else {
            return Ok(false);
        };
        for (key, value) in fields {
            products[idx].insert(key, value);
        }
        Ok(true)
    }

    async fn delete(&self, category: Category, id: &ProductId) -> StorefrontResult<bool> {
        let Some(mut products) = self.products.get_mut(&category) else {
            return Ok(false);
        };
        match Self::position(&products, id) {
            Some(idx) => {
                products.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

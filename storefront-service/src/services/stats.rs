//! Admin dashboard figures, computed from the stores' listings.

use chrono::Datelike;
use mongodb::bson::{Bson, Document};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::StorefrontResult;
use crate::models::{Category, Order, OrderStatus, User};
use crate::services::catalog_store::CatalogStore;
use crate::services::order_store::{OrderFilter, OrderStore};
use crate::services::user_store::UserStore;

const TOP_PRODUCTS: usize = 10;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_revenue: f64,
    pub total_orders: usize,
    pub total_customers: usize,
    pub total_products: usize,
    pub product_categories: Vec<CategoryCount>,
    pub monthly_stats: Vec<MonthlyStat>,
    pub top_selling_products: Vec<TopProduct>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CategoryCount {
    #[serde(rename = "_id")]
    pub category: Option<String>,
    pub count: usize,
}

#[derive(Debug, Serialize, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStat {
    #[serde(rename = "_id")]
    pub period: YearMonth,
    pub monthly_revenue: f64,
    pub order_count: usize,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    #[serde(rename = "_id")]
    pub product_id: String,
    pub total_sold: u64,
    pub name: String,
    pub image: String,
}

pub async fn dashboard_stats(
    orders: &dyn OrderStore,
    users: &dyn UserStore,
    catalog: &dyn CatalogStore,
) -> StorefrontResult<DashboardStats> {
    let orders = orders.list(&OrderFilter::default()).await?;
    let users = users.list().await?;
    let products = catalog.list(Category::All).await?;
    Ok(compute(&orders, &users, &products))
}

/// Revenue, monthly figures and best sellers count paid orders: confirmed or
/// moved on to fulfilment. `totalOrders` counts every checkout attempt.
pub fn compute(orders: &[Order], users: &[User], products: &[Document]) -> DashboardStats {
    let paid: Vec<&Order> = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Confirmed || is_fulfilment(o.status))
        .collect();

    DashboardStats {
        total_revenue: paid.iter().map(|o| o.total_amount).sum(),
        total_orders: orders.len(),
        total_customers: users.iter().filter(|u| !u.is_admin()).count(),
        total_products: products.len(),
        product_categories: category_counts(products),
        monthly_stats: monthly(&paid),
        top_selling_products: top_sellers(&paid),
    }
}

fn is_fulfilment(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
    )
}

fn category_counts(products: &[Document]) -> Vec<CategoryCount> {
    let mut counts: HashMap<Option<String>, usize> = HashMap::new();
    for product in products {
        let category = match product.get("category") {
            Some(Bson::String(c)) => Some(c.clone()),
            _ => None,
        };
        *counts.entry(category).or_default() += 1;
    }

    let mut out: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    out
}

fn monthly(paid: &[&Order]) -> Vec<MonthlyStat> {
    let mut months: BTreeMap<YearMonth, (f64, usize)> = BTreeMap::new();
    for order in paid {
        let created = order.created_at.to_chrono();
        let key = YearMonth {
            year: created.year(),
            month: created.month(),
        };
        let entry = months.entry(key).or_insert((0.0, 0));
        entry.0 += order.total_amount;
        entry.1 += 1;
    }

    months
        .into_iter()
        .map(|(period, (monthly_revenue, order_count))| MonthlyStat {
            period,
            monthly_revenue,
            order_count,
        })
        .collect()
}

fn top_sellers(paid: &[&Order]) -> Vec<TopProduct> {
    let mut sold: HashMap<&str, TopProduct> = HashMap::new();
    for item in paid.iter().flat_map(|o| o.cart_items.iter()) {
        sold.entry(item.product_id.as_str())
            .or_insert_with(|| TopProduct {
                product_id: item.product_id.clone(),
                total_sold: 0,
                name: item.name.clone(),
                image: item.image.clone(),
            })
            .total_sold += u64::from(item.quantity);
    }

    let mut out: Vec<TopProduct> = sold.into_values().collect();
    out.sort_by(|a, b| {
        b.total_sold
            .cmp(&a.total_sold)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    out.truncate(TOP_PRODUCTS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomerInfo, OrderItem, Role};
    use mongodb::bson::{doc, DateTime};

    fn order(id: &str, status: OrderStatus, total: f64, items: &[(&str, u32)], at: i64) -> Order {
        let mut order = Order::pending(
            id.into(),
            "a@b.com".into(),
            CustomerInfo {
                name: "Rider".into(),
                address: "1 Road".into(),
                address2: None,
                city: "Dhaka".into(),
                state: None,
                postcode: "1200".into(),
                country: None,
                phone: "017".into(),
            },
            items
                .iter()
                .map(|(p, q)| OrderItem {
                    product_id: p.to_string(),
                    quantity: *q,
                    name: format!("{p} name"),
                    image: String::new(),
                    price: 10.0,
                })
                .collect(),
            total,
        );
        order.status = status;
        order.created_at = DateTime::from_millis(at);
        order
    }

    fn user(email: &str, role: Option<Role>) -> User {
        User {
            id: None,
            email: email.into(),
            name: None,
            photo_url: None,
            role,
        }
    }

    // 2024-01-15 and 2024-02-10, UTC.
    const JAN: i64 = 1_705_312_800_000;
    const FEB: i64 = 1_707_559_200_000;

    #[test]
    fn revenue_counts_paid_and_fulfilled_orders() {
        let orders = vec![
            order("t1", OrderStatus::Confirmed, 1000.0, &[("p1", 2)], JAN),
            order("t2", OrderStatus::Pending, 500.0, &[("p2", 1)], JAN),
            order("t3", OrderStatus::Failed, 700.0, &[("p1", 5)], FEB),
            order("t4", OrderStatus::Shipped, 300.0, &[("p2", 3)], FEB),
        ];
        let users = vec![
            user("a@b.com", None),
            user("c@d.com", Some(Role::User)),
            user("admin@b.com", Some(Role::Admin)),
        ];
        let products = vec![
            doc! { "name": "H1", "category": "helmet" },
            doc! { "name": "H2", "category": "helmet" },
            doc! { "name": "T1", "category": "tyre" },
            doc! { "name": "X" },
        ];

        let stats = compute(&orders, &users, &products);

        assert_eq!(stats.total_revenue, 1300.0);
        assert_eq!(stats.total_orders, 4);
        assert_eq!(stats.total_customers, 2);
        assert_eq!(stats.total_products, 4);
        assert_eq!(
            stats.product_categories[0],
            CategoryCount {
                category: Some("helmet".into()),
                count: 2
            }
        );
        assert_eq!(stats.monthly_stats.len(), 2);
        assert_eq!(stats.monthly_stats[0].period, YearMonth { year: 2024, month: 1 });
        assert_eq!(stats.monthly_stats[0].monthly_revenue, 1000.0);
        assert_eq!(stats.monthly_stats[1].order_count, 1);
    }

    #[test]
    fn top_sellers_rank_by_quantity_from_paid_orders() {
        let orders = vec![
            order("t1", OrderStatus::Confirmed, 1.0, &[("p1", 2), ("p2", 1)], JAN),
            order("t2", OrderStatus::Confirmed, 1.0, &[("p2", 4)], FEB),
            order("t3", OrderStatus::Cancelled, 1.0, &[("p3", 50)], FEB),
        ];

        let stats = compute(&orders, &[], &[]);

        let ranked: Vec<_> = stats
            .top_selling_products
            .iter()
            .map(|p| (p.product_id.as_str(), p.total_sold))
            .collect();
        assert_eq!(ranked, vec![("p2", 5), ("p1", 2)]);
        assert_eq!(stats.top_selling_products[0].name, "p2 name");
    }

    #[test]
    fn serializes_with_dashboard_field_names() {
        let stats = compute(
            &[order("t1", OrderStatus::Confirmed, 10.0, &[("p1", 1)], JAN)],
            &[],
            &[],
        );
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["totalRevenue"], 10.0);
        assert_eq!(value["monthlyStats"][0]["_id"]["month"], 1);
        assert_eq!(value["topSellingProducts"][0]["_id"], "p1");
        assert_eq!(value["topSellingProducts"][0]["totalSold"], 1);
    }
}

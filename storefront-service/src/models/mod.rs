pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::CartItem;
pub use order::{
    AdminOverride, CustomerInfo, Order, OrderItem, OrderStatus, PaymentStatus, Settlement,
};
pub use product::{Category, ProductId};
pub use user::{Role, User};

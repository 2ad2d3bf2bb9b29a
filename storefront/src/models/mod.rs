// storefront/src/models/mod.rs

//! Database records and the enums stored alongside them.

pub mod access_token;
pub mod cart;
pub mod category;
pub mod order;
pub mod password_reset;
pub mod product;
pub mod user;

pub use access_token::AccessToken;
pub use cart::{Cart, CartItem, CartLine};
pub use category::Category;
pub use order::{Order, OrderItem, OrderStatus, OrderWithItems, PaymentMethod, PaymentStatus};
pub use password_reset::PasswordReset;
pub use product::{Product, ProductWithCategory};
pub use user::{User, UserRole};

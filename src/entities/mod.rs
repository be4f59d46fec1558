pub mod order;
pub mod product;
pub mod user;

pub use order::Entity as Order;
pub use product::Entity as Product;
pub use product::Model as ProductModel;
pub use user::Entity as User;

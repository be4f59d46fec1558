pub mod dashboard;
pub mod product_form;
pub mod products;

pub use dashboard::DashboardService;
pub use product_form::{FormMode, ProductForm, UploadedFile, ValidatedProductForm};
pub use products::ProductService;

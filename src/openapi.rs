use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::ErrorResponse;
use crate::handlers::products::{AvailabilityRequest, ProductResponse};
use crate::services::dashboard::{
    CustomerSummary, DashboardSummary, ProductSummary, SalesSummary,
};

/// OpenAPI document for the v1 admin API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront Admin API",
        version = "0.1.0",
        description = "Product asset lifecycle management and sales dashboard"
    ),
    paths(
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::set_availability,
        crate::handlers::products::delete_product,
        crate::handlers::products::download_file,
        crate::handlers::dashboard::get_dashboard,
    ),
    components(schemas(
        ProductResponse,
        AvailabilityRequest,
        DashboardSummary,
        SalesSummary,
        CustomerSummary,
        ProductSummary,
        ErrorResponse,
    )),
    tags(
        (name = "Products", description = "Product lifecycle and asset management"),
        (name = "Dashboard", description = "Sales and catalog aggregates"),
    )
)]
pub struct ApiDocV1;

/// Swagger UI mounted at /swagger-ui, backed by the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

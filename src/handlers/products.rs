use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::{
    entities::ProductModel,
    errors::{ApiError, ServiceError},
    services::product_form::{validate, FormMode, ProductForm, UploadedFile},
    AppState,
};
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Creates the router for product endpoints
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .route("/:id", put(update_product))
        .route("/:id", delete(delete_product))
        .route("/:id/availability", post(set_availability))
        .route("/:id/file", get(download_file))
}

/// Product as returned by the admin API
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub file_path: String,
    pub image_path: String,
    pub is_available_for_purchase: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductModel> for ProductResponse {
    fn from(product: ProductModel) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price_cents: product.price_cents,
            file_path: product.file_path,
            image_path: product.image_path,
            is_available_for_purchase: product.is_available_for_purchase,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityRequest {
    pub is_available_for_purchase: bool,
}

fn malformed(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Malformed multipart request: {}", err))
}

/// Collects the raw product form out of a multipart request. Unknown fields
/// are drained and ignored so stale admin UIs do not break submissions.
pub async fn read_product_form(mut multipart: Multipart) -> Result<ProductForm, ApiError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };

        match name.as_str() {
            "name" => form.name = Some(field.text().await.map_err(malformed)?),
            "price" => form.price = Some(field.text().await.map_err(malformed)?),
            "description" => form.description = Some(field.text().await.map_err(malformed)?),
            "file" | "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(ToString::to_string);
                let bytes = field.bytes().await.map_err(malformed)?;
                let upload = UploadedFile::new(file_name, content_type, bytes);
                if name == "file" {
                    form.file = Some(upload);
                } else {
                    form.image = Some(upload);
                }
            }
            _ => {
                let _ = field.bytes().await.map_err(malformed)?;
            }
        }
    }

    Ok(form)
}

/// Create a new product from a multipart form
#[utoipa::path(
    post,
    path = "/api/v1/products",
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_product_form(multipart).await?;
    let validated =
        validate(form, FormMode::Create).map_err(ServiceError::ValidationFailed)?;

    let product = state
        .products
        .create(validated)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ProductResponse::from(product)))
}

/// List all products, newest first
#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses(
        (status = 200, description = "Products listed", body = [ProductResponse])
    ),
    tag = "Products"
)]
pub async fn list_products(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let products = state.products.list().await.map_err(map_service_error)?;
    let payload: Vec<ProductResponse> = products.into_iter().map(Into::into).collect();
    Ok(success_response(payload))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product retrieved", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.products.get(id).await.map_err(map_service_error)?;
    Ok(success_response(ProductResponse::from(product)))
}

/// Update a product from a multipart form. Omitted or empty file/image parts
/// keep the existing blobs.
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_product_form(multipart).await?;
    let validated = validate(form, FormMode::Edit).map_err(ServiceError::ValidationFailed)?;

    let product = state
        .products
        .update(id, validated)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductResponse::from(product)))
}

/// Set whether a product can be purchased
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/availability",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Availability updated", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn set_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<AvailabilityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .products
        .set_availability(id, payload.is_available_for_purchase)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductResponse::from(product)))
}

/// Delete a product and both of its stored assets
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.products.delete(id).await.map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Download the purchasable asset for a product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/file",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Asset bytes"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (product, bytes) = state
        .products
        .open_file(id)
        .await
        .map_err(map_service_error)?;

    let file_name = product
        .file_path
        .rsplit('/')
        .next()
        .unwrap_or("download")
        .to_string();

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    ))
}

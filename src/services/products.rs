use crate::{
    entities::{product, Product, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
    services::product_form::ValidatedProductForm,
    storage::{generate_key, BlobStore},
};
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryOrder, Set,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;

/// Namespace for blob keys in both stores. Purchasable assets live under it
/// in the private store; preview images under it in the public store, where
/// the same key is browser-addressable as `/products/...`.
const BLOB_NAMESPACE: &str = "products";

/// The product asset lifecycle manager.
///
/// Keeps a product row and its two blobs (private downloadable file, public
/// preview image) consistent across create, update, and delete. Blob writes
/// always precede the row mutation that references them, so a failure never
/// leaves a row pointing at a missing blob; the reverse (an unreferenced
/// blob) can happen in narrow windows and is tolerated.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    assets: Arc<dyn BlobStore>,
    media: Arc<dyn BlobStore>,
    event_sender: Arc<EventSender>,
    // Serializes mutations per product id: two concurrent updates would
    // otherwise both delete the old blob and orphan one of the new ones.
    write_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ProductService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        assets: Arc<dyn BlobStore>,
        media: Arc<dyn BlobStore>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            assets,
            media,
            event_sender,
            write_locks: Arc::new(DashMap::new()),
        }
    }

    /// Create a new product with both uploads. The product always starts
    /// unavailable for purchase, whatever the form said.
    #[instrument(skip(self, form))]
    pub async fn create(&self, form: ValidatedProductForm) -> Result<ProductModel, ServiceError> {
        let file = form.file.ok_or_else(|| {
            ServiceError::Internal("create requires a validated file upload".into())
        })?;
        let image = form.image.ok_or_else(|| {
            ServiceError::Internal("create requires a validated image upload".into())
        })?;

        let file_path = generate_key(BLOB_NAMESPACE, &file.file_name);
        self.assets.put(&file_path, &file.bytes).await?;

        let image_key = generate_key(BLOB_NAMESPACE, &image.file_name);
        self.media.put(&image_key, &image.bytes).await?;
        let image_path = format!("/{}", image_key);

        let product_id = Uuid::new_v4();
        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(product_id),
            name: Set(form.name),
            description: Set(form.description),
            price_cents: Set(form.price_cents),
            file_path: Set(file_path),
            image_path: Set(image_path),
            is_available_for_purchase: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let product = product.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product_id))
            .await;

        info!("Created product: {}", product_id);
        Ok(product)
    }

    /// Update an existing product. Text fields are always overwritten; each
    /// asset is replaced only when a new upload was supplied, in which case
    /// the prior blob is deleted first and the row update lands last.
    #[instrument(skip(self, form))]
    pub async fn update(
        &self,
        product_id: Uuid,
        form: ValidatedProductForm,
    ) -> Result<ProductModel, ServiceError> {
        let lock = self.lock_for(product_id);
        let guard = lock.lock().await;
        let result = self.apply_update(product_id, form).await;
        drop(guard);
        drop(lock);
        self.release_if_unused(product_id);
        let product = result?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;

        info!("Updated product: {}", product_id);
        Ok(product)
    }

    async fn apply_update(
        &self,
        product_id: Uuid,
        form: ValidatedProductForm,
    ) -> Result<ProductModel, ServiceError> {
        let product = self.get(product_id).await?;

        let mut file_path = product.file_path.clone();
        if let Some(upload) = form.file {
            self.assets.delete(&product.file_path).await?;
            file_path = generate_key(BLOB_NAMESPACE, &upload.file_name);
            self.assets.put(&file_path, &upload.bytes).await?;
        }

        let mut image_path = product.image_path.clone();
        if let Some(upload) = form.image {
            self.media.delete(media_key(&product.image_path)).await?;
            let image_key = generate_key(BLOB_NAMESPACE, &upload.file_name);
            self.media.put(&image_key, &upload.bytes).await?;
            image_path = format!("/{}", image_key);
        }

        let mut active: product::ActiveModel = product.into();
        active.name = Set(form.name);
        active.description = Set(form.description);
        active.price_cents = Set(form.price_cents);
        active.file_path = Set(file_path);
        active.image_path = Set(image_path);
        active.updated_at = Set(Utc::now());

        active.update(&*self.db).await.map_err(Into::into)
    }

    /// Flip the purchase-availability flag. Metadata-only: no blob I/O.
    #[instrument(skip(self))]
    pub async fn set_availability(
        &self,
        product_id: Uuid,
        available: bool,
    ) -> Result<ProductModel, ServiceError> {
        let product = self.get(product_id).await?;

        let mut active: product::ActiveModel = product.into();
        active.is_available_for_purchase = Set(available);
        active.updated_at = Set(Utc::now());
        let product = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductAvailabilityChanged {
                product_id,
                available,
            })
            .await;

        info!("Set product {} availability to {}", product_id, available);
        Ok(product)
    }

    /// Delete a product and both of its blobs. The row goes first: a leaked
    /// blob is recoverable, a sold product whose row vanished is not.
    #[instrument(skip(self))]
    pub async fn delete(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let lock = self.lock_for(product_id);
        let guard = lock.lock().await;
        let result = self.delete_row_and_blobs(product_id).await;
        drop(guard);
        drop(lock);
        self.release_if_unused(product_id);
        result?;

        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;

        info!("Deleted product: {}", product_id);
        Ok(())
    }

    async fn delete_row_and_blobs(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let product = self.get(product_id).await?;

        product.clone().delete(&*self.db).await?;

        self.assets.delete(&product.file_path).await?;
        self.media.delete(media_key(&product.image_path)).await?;
        Ok(())
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// List all products, newest first
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<ProductModel>, ServiceError> {
        Product::find()
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Read the purchasable asset back, for the admin download endpoint.
    #[instrument(skip(self))]
    pub async fn open_file(
        &self,
        product_id: Uuid,
    ) -> Result<(ProductModel, Bytes), ServiceError> {
        let product = self.get(product_id).await?;
        let bytes = self.assets.get(&product.file_path).await?;
        Ok((product, bytes))
    }

    fn lock_for(&self, product_id: Uuid) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(product_id)
            .or_default()
            .value()
            .clone()
    }

    /// Evicts the lock entry once nothing holds or awaits it. Without this,
    /// mutations against ids that do not exist would accumulate entries
    /// forever.
    fn release_if_unused(&self, product_id: Uuid) {
        self.write_locks
            .remove_if(&product_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of live per-id lock entries. Only mutations in flight (or
    /// contended) hold one.
    pub fn write_lock_count(&self) -> usize {
        self.write_locks.len()
    }
}

/// A stored image path is public-relative (`/products/...`); the media store
/// addresses the same blob without the leading slash.
pub fn media_key(image_path: &str) -> &str {
    image_path.trim_start_matches('/')
}

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use bytes::Bytes;
use storefront_admin::{
    api_v1_routes,
    config::AppConfig,
    db,
    events::{self, EventSender},
    services::{DashboardService, ProductService, UploadedFile, ValidatedProductForm},
    storage::{BlobStore, FsBlobStore},
    AppState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Helper harness backed by a temporary SQLite database and filesystem blob
/// stores, all inside one TempDir so parallel tests never collide.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub asset_root: PathBuf,
    pub public_root: PathBuf,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let db_path = dir.path().join("storefront_test.db");
        let asset_root = dir.path().join("storage");
        let public_root = dir.path().join("public");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.asset_root = asset_root.clone();
        cfg.public_root = public_root.clone();
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let assets: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(asset_root.clone()));
        let media: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(public_root.clone()));

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let products = ProductService::new(
            db.clone(),
            assets,
            media,
            Arc::new(event_sender.clone()),
        );
        let dashboard = DashboardService::new(db.clone());

        let state = AppState {
            db,
            config: cfg,
            event_sender,
            products,
            dashboard,
        };

        // Same request-id layering as the binary, so responses can be
        // asserted on end to end.
        let router = Router::new()
            .nest("/api/v1", api_v1_routes())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .with_state(state.clone());

        Self {
            state,
            router,
            asset_root,
            public_root,
            _dir: dir,
            _event_task: event_task,
        }
    }

    /// Absolute path of a private asset blob, given its stored key.
    #[allow(dead_code)]
    pub fn asset_path(&self, key: &str) -> PathBuf {
        self.asset_root.join(key)
    }

    /// Absolute path of a public media blob, given the stored `/products/...`
    /// image path.
    #[allow(dead_code)]
    pub fn media_path(&self, image_path: &str) -> PathBuf {
        self.public_root.join(image_path.trim_start_matches('/'))
    }
}

/// A non-empty upload with the given content type.
#[allow(dead_code)]
pub fn upload(file_name: &str, content_type: &str, bytes: &[u8]) -> UploadedFile {
    UploadedFile::new(
        file_name,
        Some(content_type.to_string()),
        Bytes::copy_from_slice(bytes),
    )
}

/// A validated create form with both uploads present.
#[allow(dead_code)]
pub fn create_form(name: &str, price_cents: i64) -> ValidatedProductForm {
    ValidatedProductForm {
        name: name.to_string(),
        price_cents,
        description: format!("{} description", name),
        file: Some(upload("asset.pdf", "application/pdf", b"asset-bytes")),
        image: Some(upload("cover.png", "image/png", b"image-bytes")),
    }
}

/// A validated edit form with no uploads, keeping existing blobs.
#[allow(dead_code)]
pub fn edit_form(name: &str, price_cents: i64) -> ValidatedProductForm {
    ValidatedProductForm {
        name: name.to_string(),
        price_cents,
        description: format!("{} description", name),
        file: None,
        image: None,
    }
}

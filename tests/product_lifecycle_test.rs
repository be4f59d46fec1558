mod common;

use assert_matches::assert_matches;
use common::{create_form, edit_form, upload, TestApp};
use storefront_admin::errors::ServiceError;
use storefront_admin::services::ValidatedProductForm;
use uuid::Uuid;

#[tokio::test]
async fn created_product_starts_unavailable() {
    let app = TestApp::new().await;

    let product = app
        .state
        .products
        .create(create_form("Tale", 500))
        .await
        .expect("create failed");

    assert_eq!(product.name, "Tale");
    assert_eq!(product.price_cents, 500);
    assert!(!product.is_available_for_purchase);
    assert!(product.file_path.starts_with("products/"));
    assert!(product.image_path.starts_with("/products/"));
}

#[tokio::test]
async fn create_writes_both_blobs() {
    let app = TestApp::new().await;

    let product = app
        .state
        .products
        .create(create_form("Tale", 500))
        .await
        .expect("create failed");

    let asset = std::fs::read(app.asset_path(&product.file_path)).expect("asset missing");
    assert_eq!(asset, b"asset-bytes");

    let image = std::fs::read(app.media_path(&product.image_path)).expect("image missing");
    assert_eq!(image, b"image-bytes");

    let (_, bytes) = app
        .state
        .products
        .open_file(product.id)
        .await
        .expect("open_file failed");
    assert_eq!(&bytes[..], b"asset-bytes");
}

#[tokio::test]
async fn update_without_uploads_keeps_blobs_and_rewrites_text() {
    let app = TestApp::new().await;
    let products = &app.state.products;

    let created = products.create(create_form("Tale", 500)).await.unwrap();

    let updated = products
        .update(created.id, edit_form("Tale v2", 600))
        .await
        .expect("update failed");

    assert_eq!(updated.name, "Tale v2");
    assert_eq!(updated.price_cents, 600);
    assert_eq!(updated.file_path, created.file_path);
    assert_eq!(updated.image_path, created.image_path);
    assert!(app.asset_path(&created.file_path).exists());
    assert!(app.media_path(&created.image_path).exists());
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn update_with_new_file_replaces_the_old_blob() {
    let app = TestApp::new().await;
    let products = &app.state.products;

    let created = products.create(create_form("Tale", 500)).await.unwrap();

    let form = ValidatedProductForm {
        file: Some(upload("revised.pdf", "application/pdf", b"revised-bytes")),
        image: None,
        ..edit_form("Tale", 500)
    };
    let updated = products.update(created.id, form).await.expect("update failed");

    assert_ne!(updated.file_path, created.file_path);
    assert!(!app.asset_path(&created.file_path).exists());
    let asset = std::fs::read(app.asset_path(&updated.file_path)).expect("new asset missing");
    assert_eq!(asset, b"revised-bytes");

    // Image untouched.
    assert_eq!(updated.image_path, created.image_path);
    assert!(app.media_path(&created.image_path).exists());
}

#[tokio::test]
async fn update_with_new_image_replaces_the_old_blob() {
    let app = TestApp::new().await;
    let products = &app.state.products;

    let created = products.create(create_form("Tale", 500)).await.unwrap();

    let form = ValidatedProductForm {
        file: None,
        image: Some(upload("new-cover.png", "image/png", b"new-image-bytes")),
        ..edit_form("Tale", 500)
    };
    let updated = products.update(created.id, form).await.expect("update failed");

    assert_ne!(updated.image_path, created.image_path);
    assert!(!app.media_path(&created.image_path).exists());
    let image = std::fs::read(app.media_path(&updated.image_path)).expect("new image missing");
    assert_eq!(image, b"new-image-bytes");
    assert_eq!(updated.file_path, created.file_path);
}

#[tokio::test]
async fn update_of_missing_product_is_not_found_and_writes_nothing() {
    let app = TestApp::new().await;

    let form = ValidatedProductForm {
        file: Some(upload("asset.pdf", "application/pdf", b"asset-bytes")),
        image: None,
        ..edit_form("Ghost", 100)
    };
    let err = app
        .state
        .products
        .update(Uuid::new_v4(), form)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    // No blob was written on the way to the failure.
    let written = std::fs::read_dir(&app.asset_root)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(written, 0);
}

#[tokio::test]
async fn set_availability_flips_only_the_flag() {
    let app = TestApp::new().await;
    let products = &app.state.products;

    let created = products.create(create_form("Tale", 500)).await.unwrap();

    let toggled = products
        .set_availability(created.id, true)
        .await
        .expect("toggle failed");
    assert!(toggled.is_available_for_purchase);
    assert_eq!(toggled.name, created.name);
    assert_eq!(toggled.price_cents, created.price_cents);
    assert_eq!(toggled.file_path, created.file_path);
    assert_eq!(toggled.image_path, created.image_path);

    let back = products.set_availability(created.id, false).await.unwrap();
    assert!(!back.is_available_for_purchase);
}

#[tokio::test]
async fn set_availability_of_missing_product_is_not_found() {
    let app = TestApp::new().await;

    let err = app
        .state
        .products
        .set_availability(Uuid::new_v4(), true)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn delete_removes_row_and_both_blobs() {
    let app = TestApp::new().await;
    let products = &app.state.products;

    let created = products.create(create_form("Tale", 500)).await.unwrap();
    assert!(app.asset_path(&created.file_path).exists());
    assert!(app.media_path(&created.image_path).exists());

    products.delete(created.id).await.expect("delete failed");

    let err = products.get(created.id).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
    assert!(!app.asset_path(&created.file_path).exists());
    assert!(!app.media_path(&created.image_path).exists());
}

#[tokio::test]
async fn delete_of_missing_product_is_not_found() {
    let app = TestApp::new().await;

    let err = app.state.products.delete(Uuid::new_v4()).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn concurrent_updates_to_one_product_serialize() {
    let app = TestApp::new().await;
    let products = app.state.products.clone();

    let created = products.create(create_form("Tale", 500)).await.unwrap();

    let form_a = ValidatedProductForm {
        file: Some(upload("a.pdf", "application/pdf", b"version-a")),
        image: None,
        ..edit_form("Tale A", 510)
    };
    let form_b = ValidatedProductForm {
        file: Some(upload("b.pdf", "application/pdf", b"version-b")),
        image: None,
        ..edit_form("Tale B", 520)
    };

    let (a, b) = tokio::join!(
        products.update(created.id, form_a),
        products.update(created.id, form_b),
    );
    a.expect("first update failed");
    b.expect("second update failed");

    // Whichever update landed last, the row references exactly one live
    // asset and the loser's blob was cleaned up.
    let current = products.get(created.id).await.unwrap();
    assert!(app.asset_path(&current.file_path).exists());

    let remaining = std::fs::read_dir(app.asset_root.join("products"))
        .unwrap()
        .count();
    assert_eq!(remaining, 1);

    // Both mutations finished, so no lock entry should survive.
    assert_eq!(products.write_lock_count(), 0);
}

#[tokio::test]
async fn lock_map_does_not_grow_on_mutations_of_missing_ids() {
    let app = TestApp::new().await;
    let products = &app.state.products;

    for _ in 0..100 {
        let err = products
            .update(Uuid::new_v4(), edit_form("Ghost", 100))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::NotFound(_));
    }
    for _ in 0..100 {
        let err = products.delete(Uuid::new_v4()).await.unwrap_err();
        assert_matches!(err, ServiceError::NotFound(_));
    }

    assert_eq!(products.write_lock_count(), 0);
}

#[tokio::test]
async fn list_returns_newest_first() {
    let app = TestApp::new().await;
    let products = &app.state.products;

    let first = products.create(create_form("First", 100)).await.unwrap();
    // created_at has sub-second precision; a short sleep keeps the ordering
    // observable on sqlite.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = products.create(create_form("Second", 200)).await.unwrap();

    let listed = products.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);
}

mod common;

use chrono::Utc;
use common::{create_form, TestApp};
use sea_orm::{ActiveModelTrait, Set};
use storefront_admin::entities::{order, user};
use uuid::Uuid;

async fn seed_user(app: &TestApp) -> Uuid {
    let id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(id),
        email: Set(format!("{}@example.com", id)),
        created_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed user");
    id
}

async fn seed_order(app: &TestApp, product_id: Uuid, user_id: Uuid, price_cents: i64) {
    order::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        user_id: Set(user_id),
        price_cents: Set(price_cents),
        created_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed order");
}

#[tokio::test]
async fn empty_database_yields_all_zeros() {
    let app = TestApp::new().await;

    let summary = app.state.dashboard.summary().await.expect("summary failed");

    assert_eq!(summary.sales.total_cents, 0);
    assert_eq!(summary.sales.order_count, 0);
    assert_eq!(summary.customers.user_count, 0);
    assert_eq!(summary.customers.average_order_cents, 0);
    assert_eq!(summary.products.available_count, 0);
    assert_eq!(summary.products.unavailable_count, 0);
}

#[tokio::test]
async fn totals_and_averages_reflect_seeded_orders() {
    let app = TestApp::new().await;
    let products = &app.state.products;

    let tale = products.create(create_form("Tale", 500)).await.unwrap();
    let saga = products.create(create_form("Saga", 900)).await.unwrap();
    products.set_availability(tale.id, true).await.unwrap();

    let alice = seed_user(&app).await;
    let bob = seed_user(&app).await;

    seed_order(&app, tale.id, alice, 500).await;
    seed_order(&app, tale.id, bob, 500).await;
    seed_order(&app, saga.id, alice, 900).await;

    let summary = app.state.dashboard.summary().await.expect("summary failed");

    assert_eq!(summary.sales.total_cents, 1900);
    assert_eq!(summary.sales.order_count, 3);
    assert_eq!(summary.customers.user_count, 2);
    // 1900 / 2 users, integer division
    assert_eq!(summary.customers.average_order_cents, 950);
    assert_eq!(summary.products.available_count, 1);
    assert_eq!(summary.products.unavailable_count, 1);
}

#[tokio::test]
async fn products_without_users_average_to_zero() {
    let app = TestApp::new().await;
    app.state
        .products
        .create(create_form("Tale", 500))
        .await
        .unwrap();

    let summary = app.state.dashboard.summary().await.expect("summary failed");

    assert_eq!(summary.customers.user_count, 0);
    assert_eq!(summary.customers.average_order_cents, 0);
    assert_eq!(summary.products.unavailable_count, 1);
}

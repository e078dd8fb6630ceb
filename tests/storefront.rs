//! End-to-end flows against Postgres.
//!
//! Needs `DATABASE_URL` pointing at a server where databases can be created:
//! `cargo test -- --ignored`.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use opensase_storefront::auth::Caller;
use opensase_storefront::domain::aggregates::{
    CheckoutRequest, NewProduct, NewRating, NewReview, NewUser, OrderStatus, MAX_LINE_QUANTITY,
};
use opensase_storefront::messaging::EventPublisher;
use opensase_storefront::service::{
    AccountService, AnalyticsService, CartService, CatalogService, OrderService, PgAccountService, PgAnalyticsService,
    PgCartService, PgCatalogService, PgOrderService, PgReviewService, ReviewService,
};
use opensase_storefront::EcommerceError;

fn json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}

async fn customer(pool: &PgPool, username: &str) -> Uuid {
    let user: NewUser = json(serde_json::json!({"username": username, "email": format!("{username}@example.com")}));
    PgAccountService::new(pool.clone()).register(user).await.unwrap().id
}

/// A brand, a category and one product at `price`.
async fn product(pool: &PgPool, slug: &str, price: &str) -> Uuid {
    let catalog = PgCatalogService::new(pool.clone());
    let brand = catalog.create_brand(json(serde_json::json!({"name": format!("{slug} brand")}))).await.unwrap();
    let category = catalog.create_category(json(serde_json::json!({"name": format!("{slug} category")}))).await.unwrap();
    let new: NewProduct = json(serde_json::json!({
        "name": slug, "slug": slug, "base_price": price, "brand_id": brand.id, "category_id": category.id,
    }));
    catalog.create_product(new).await.unwrap().product.id
}

async fn coupon(pool: &PgPool, code: &str, percentage: i64, valid_from: chrono::DateTime<Utc>, valid_to: chrono::DateTime<Utc>) {
    sqlx::query("INSERT INTO coupons (id, code, discount_percentage, is_active, valid_from, valid_to) VALUES ($1, $2, $3, TRUE, $4, $5)")
        .bind(Uuid::now_v7()).bind(code).bind(Decimal::from(percentage)).bind(valid_from).bind(valid_to)
        .execute(pool).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn checkout_snapshots_prices_and_empties_cart(pool: PgPool) {
    let user = customer(&pool, "ada").await;
    let lamp = product(&pool, "lamp", "75.00").await;
    let carts = PgCartService::new(pool.clone(), EventPublisher::disabled());
    carts.add_item(user, lamp, 1).await.unwrap();
    carts.add_item(user, lamp, 1).await.unwrap();

    let orders = PgOrderService::new(pool.clone(), EventPublisher::disabled());
    let order = orders.checkout(user, CheckoutRequest::default()).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, Decimal::new(15000, 2));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 2);
    assert_eq!(order.items[0].price_at_purchase, Decimal::new(7500, 2));

    let cart = carts.my_cart(user).await.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.coupon, None);

    sqlx::query("UPDATE products SET base_price = 99.00 WHERE id = $1").bind(lamp).execute(&pool).await.unwrap();
    let again = orders.get_order(Caller::customer(user), order.id).await.unwrap();
    assert_eq!(again.items[0].price_at_purchase, Decimal::new(7500, 2));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn checkout_of_empty_cart_creates_nothing(pool: PgPool) {
    let user = customer(&pool, "grace").await;
    let orders = PgOrderService::new(pool.clone(), EventPublisher::disabled());

    let missing = orders.checkout(user, CheckoutRequest::default()).await;
    assert!(matches!(missing, Err(EcommerceError::InvalidInput(_))));

    PgCartService::new(pool.clone(), EventPublisher::disabled()).my_cart(user).await.unwrap();
    let empty = orders.checkout(user, CheckoutRequest::default()).await;
    assert!(matches!(empty, Err(EcommerceError::InvalidInput(_))));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(&pool).await.unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn coupon_discounts_cart_and_order(pool: PgPool) {
    let now = Utc::now();
    coupon(&pool, "WELCOME10", 10, now - Duration::days(1), now + Duration::days(30)).await;
    coupon(&pool, "SPRING", 20, now - Duration::days(60), now - Duration::days(30)).await;
    let user = customer(&pool, "linus").await;
    let lamp = product(&pool, "lamp", "40.00").await;
    let bulb = product(&pool, "bulb", "5.00").await;

    let carts = PgCartService::new(pool.clone(), EventPublisher::disabled());
    carts.add_item(user, lamp, 2).await.unwrap();
    carts.add_item(user, bulb, 4).await.unwrap();

    assert!(matches!(carts.apply_coupon(user, "NOPE".into()).await, Err(EcommerceError::NotFound(_))));
    assert!(matches!(carts.apply_coupon(user, " WELCOME10 ".into()).await, Err(EcommerceError::NotFound(_))));
    assert!(matches!(carts.apply_coupon(user, "welcome10".into()).await, Err(EcommerceError::NotFound(_))));
    assert!(matches!(carts.apply_coupon(user, "SPRING".into()).await, Err(EcommerceError::InvalidInput(_))));

    let cart = carts.apply_coupon(user, "WELCOME10".into()).await.unwrap();
    assert_eq!(cart.total_price, Decimal::new(10000, 2));
    assert_eq!(cart.discount_amount, Decimal::new(1000, 2));
    assert_eq!(cart.final_price, Decimal::new(9000, 2));

    let order = PgOrderService::new(pool.clone(), EventPublisher::disabled())
        .checkout(user, CheckoutRequest::default()).await.unwrap();
    assert_eq!(order.total_amount, Decimal::new(9000, 2));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn second_rating_for_same_product_conflicts(pool: PgPool) {
    let user = customer(&pool, "barbara").await;
    let lamp = product(&pool, "lamp", "10.00").await;
    let reviews = PgReviewService::new(pool.clone(), EventPublisher::disabled());

    let rating: NewRating = json(serde_json::json!({"product_id": lamp, "rating": 4}));
    reviews.create_rating(user, rating.clone()).await.unwrap();
    assert!(matches!(reviews.create_rating(user, rating).await, Err(EcommerceError::Conflict(_))));

    let detail = PgCatalogService::new(pool.clone()).get_product("lamp".into(), false).await.unwrap();
    assert_eq!(detail.rating_count, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn daily_report_is_idempotent(pool: PgPool) {
    let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let noon = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let ada = customer(&pool, "ada").await;
    let bob = customer(&pool, "bob").await;
    for (user, total) in [(ada, Decimal::new(10000, 2)), (ada, Decimal::new(4000, 2)), (bob, Decimal::new(10000, 2))] {
        sqlx::query("INSERT INTO orders (id, user_id, status, total_amount, created_at, updated_at) VALUES ($1, $2, 'pending', $3, $4, $4)")
            .bind(Uuid::now_v7()).bind(user).bind(total).bind(noon)
            .execute(&pool).await.unwrap();
    }

    let analytics = PgAnalyticsService::new(pool.clone(), EventPublisher::disabled());
    let first = analytics.generate_daily_report(Some(day)).await.unwrap();
    let second = analytics.generate_daily_report(Some(day)).await.unwrap();
    assert!(second.report_generated);
    assert_eq!(first.total_revenue, second.total_revenue);
    assert_eq!(second.total_revenue, Decimal::new(24000, 2));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sales_reports WHERE report_date = $1").bind(day).fetch_one(&pool).await.unwrap();
    assert_eq!(count, 1);

    let report = analytics.get_report(day).await.unwrap();
    assert_eq!(report.report.total_orders, 3);
    assert_eq!(report.report.total_customers, 2);
    assert_eq!(report.report.average_order_value, Decimal::new(8000, 2));
}

async fn orders_count(pool: &PgPool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(pool).await.unwrap();
    count
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn concurrent_checkouts_place_one_order(pool: PgPool) {
    let user = customer(&pool, "ada").await;
    let lamp = product(&pool, "lamp", "75.00").await;
    PgCartService::new(pool.clone(), EventPublisher::disabled()).add_item(user, lamp, 2).await.unwrap();

    let orders = PgOrderService::new(pool.clone(), EventPublisher::disabled());
    let (a, b) = (orders.clone(), orders.clone());
    let first = tokio::spawn(async move { a.checkout(user, CheckoutRequest::default()).await });
    let second = tokio::spawn(async move { b.checkout(user, CheckoutRequest::default()).await });
    let results = [first.await.unwrap(), second.await.unwrap()];

    let placed: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].total_amount, Decimal::new(15000, 2));
    assert_eq!(results.iter().filter(|r| matches!(r, Err(EcommerceError::InvalidInput(m)) if m == "cart is empty")).count(), 1);
    assert_eq!(orders_count(&pool).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn checkout_over_order_limit_is_rejected(pool: PgPool) {
    let user = customer(&pool, "ada").await;
    let crown = product(&pool, "crown", "99999.00").await;
    let carts = PgCartService::new(pool.clone(), EventPublisher::disabled());
    carts.add_item(user, crown, 2000).await.unwrap();
    assert_eq!(carts.my_cart(user).await.unwrap().final_price, Decimal::new(19_999_800_000, 2));

    let orders = PgOrderService::new(pool.clone(), EventPublisher::disabled());
    assert!(matches!(orders.checkout(user, CheckoutRequest::default()).await, Err(EcommerceError::InvalidInput(_))));
    assert_eq!(orders_count(&pool).await, 0);
    assert_eq!(carts.my_cart(user).await.unwrap().items.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn oversized_base_price_is_invalid_input(pool: PgPool) {
    let catalog = PgCatalogService::new(pool.clone());
    let brand = catalog.create_brand(json(serde_json::json!({"name": "Regalia"}))).await.unwrap();
    let category = catalog.create_category(json(serde_json::json!({"name": "Jewels"}))).await.unwrap();
    let new: NewProduct = json(serde_json::json!({
        "name": "Orb", "base_price": "100000000.00", "brand_id": brand.id, "category_id": category.id,
    }));
    assert!(matches!(catalog.create_product(new).await, Err(EcommerceError::InvalidInput(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn merged_quantity_is_capped(pool: PgPool) {
    let user = customer(&pool, "ada").await;
    let lamp = product(&pool, "lamp", "1.00").await;
    let carts = PgCartService::new(pool.clone(), EventPublisher::disabled());

    assert!(matches!(carts.add_item(user, lamp, i32::MAX).await, Err(EcommerceError::InvalidInput(_))));
    carts.add_item(user, lamp, MAX_LINE_QUANTITY).await.unwrap();
    assert!(matches!(carts.add_item(user, lamp, 1).await, Err(EcommerceError::InvalidInput(_))));

    let items = carts.list_items(user).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, MAX_LINE_QUANTITY);
    assert!(matches!(carts.update_item(user, items[0].id, MAX_LINE_QUANTITY + 1).await, Err(EcommerceError::InvalidInput(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn review_requires_own_unreviewed_rating(pool: PgPool) {
    let ada = customer(&pool, "ada").await;
    let bob = customer(&pool, "bob").await;
    let lamp = product(&pool, "lamp", "10.00").await;
    let reviews = PgReviewService::new(pool.clone(), EventPublisher::disabled());
    let rating = reviews.create_rating(ada, json(serde_json::json!({"product_id": lamp, "rating": 5}))).await.unwrap();
    let review = |rating: Uuid, title: &str| -> NewReview {
        json(serde_json::json!({"rating": rating, "title": title, "comment": "Bright and steady"}))
    };

    let unknown = reviews.create_review(ada, review(Uuid::now_v7(), "Lost")).await;
    assert!(matches!(unknown, Err(EcommerceError::NotFound(_))));

    let foreign = reviews.create_review(bob, review(rating.id, "Not mine")).await;
    assert!(matches!(foreign, Err(EcommerceError::Forbidden)));

    let first = reviews.create_review(ada, review(rating.id, "Great lamp")).await.unwrap();
    let second = reviews.create_review(ada, review(rating.id, "Changed my mind")).await;
    assert!(matches!(second, Err(EcommerceError::Conflict(_))));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reviews WHERE rating_id = $1").bind(rating.id).fetch_one(&pool).await.unwrap();
    assert_eq!(count, 1);
    let kept = reviews.get_review(Some(Caller::customer(ada)), first.id).await.unwrap();
    assert_eq!(kept.title, "Great lamp");
    assert_eq!(kept.comment, "Bright and steady");
}

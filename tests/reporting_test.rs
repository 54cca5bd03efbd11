mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;

/// Create a cart for `token`, fill it, and check out.
async fn place_order(
    app: &TestApp,
    token: &str,
    lines: &[(&storefront_api::entities::product::Model, i32)],
) -> String {
    let (_, cart) = app
        .request(Method::POST, "/api/v1/carts", Some(token), None)
        .await;
    let cart_id = cart["id"].as_str().unwrap().to_string();

    for (product, quantity) in lines {
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/api/v1/carts/{cart_id}/items"),
                Some(token),
                Some(json!({ "product_id": product.id, "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, order) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(token),
            Some(json!({ "cart_id": cart_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    order["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn statistics_require_staff_capability() {
    let app = TestApp::new().await;
    let (_ada, ada_token) = app.create_user("Ada", "ada@example.com", false).await;

    let (status, _) = app
        .request(Method::GET, "/api/v1/admin/statistics", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::GET,
            "/api/v1/admin/statistics",
            Some(&ada_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn monthly_sales_sum_per_line_not_products_of_sums() {
    let app = TestApp::new().await;
    let (_staff, staff_token) = app.create_user("Ops", "ops@example.com", true).await;
    let (_ada, ada_token) = app.create_user("Ada", "ada@example.com", false).await;

    let shirt = app.seed_product("Shirt", dec!(10)).await;
    let jeans = app.seed_product("Jeans", dec!(5)).await;

    // Two orders in the same month: (10 x 2) and (5 x 3)
    place_order(&app, &ada_token, &[(&shirt, 2)]).await;
    place_order(&app, &ada_token, &[(&jeans, 3)]).await;

    let (status, stats) = app
        .request(
            Method::GET,
            "/api/v1/admin/statistics",
            Some(&staff_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let monthly = stats["monthly_sales"].as_array().unwrap();
    assert_eq!(monthly.len(), 1, "both orders fall in the current month");
    let month = &monthly[0];

    // "YYYY-MM" rendering
    let label = month["month"].as_str().unwrap();
    assert_eq!(label.len(), 7);
    assert_eq!(&label[4..5], "-");

    assert_eq!(month["order_count"], 2);
    // 10*2 + 5*3 = 35, NOT (10+5)*(2+3) = 75
    assert!((month["total_sales"].as_f64().unwrap() - 35.0).abs() < 1e-9);
}

#[tokio::test]
async fn popular_products_rank_by_order_line_count_with_mean_rating() {
    let app = TestApp::new().await;
    let (_staff, staff_token) = app.create_user("Ops", "ops@example.com", true).await;
    let (_ada, ada_token) = app.create_user("Ada", "ada@example.com", false).await;
    let (_eve, eve_token) = app.create_user("Eve", "eve@example.com", false).await;

    let popular = app.seed_product("Popular", dec!(10)).await;
    let niche = app.seed_product("Niche", dec!(10)).await;

    // Popular appears on three order lines, Niche on one
    place_order(&app, &ada_token, &[(&popular, 1), (&niche, 1)]).await;
    place_order(&app, &ada_token, &[(&popular, 2)]).await;
    place_order(&app, &eve_token, &[(&popular, 1)]).await;

    // Ratings 5 and 3 for Popular -> mean 4.0
    for (token, rating) in [(&ada_token, 5), (&eve_token, 3)] {
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/api/v1/products/{}/reviews", popular.id),
                Some(token),
                Some(json!({ "rating": rating, "body": "review" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, stats) = app
        .request(
            Method::GET,
            "/api/v1/admin/statistics",
            Some(&staff_token),
            None,
        )
        .await;

    let products = stats["popular_products"].as_array().unwrap();
    assert_eq!(products[0]["id"], popular.id.to_string());
    assert_eq!(products[0]["total_ordered"], 3);
    assert!((products[0]["avg_rating"].as_f64().unwrap() - 4.0).abs() < 1e-9);

    let niche_row = products
        .iter()
        .find(|p| p["id"] == niche.id.to_string())
        .expect("niche product missing");
    assert_eq!(niche_row["total_ordered"], 1);
    assert!(niche_row["avg_rating"].is_null());
}

#[tokio::test]
async fn top_buyers_rank_by_spend_and_exclude_non_buyers() {
    let app = TestApp::new().await;
    let (_staff, staff_token) = app.create_user("Ops", "ops@example.com", true).await;
    let (big, big_token) = app.create_user("Big", "big@example.com", false).await;
    let (small, small_token) = app.create_user("Small", "small@example.com", false).await;
    let (never, _never_token) = app.create_user("Never", "never@example.com", false).await;

    let item = app.seed_product("Widget", dec!(10)).await;
    place_order(&app, &big_token, &[(&item, 5)]).await; // 50
    place_order(&app, &small_token, &[(&item, 1)]).await; // 10

    let (_, stats) = app
        .request(
            Method::GET,
            "/api/v1/admin/statistics",
            Some(&staff_token),
            None,
        )
        .await;

    let buyers = stats["top_buyers"].as_array().unwrap();
    assert_eq!(buyers.len(), 2, "users without orders are excluded");
    assert_eq!(buyers[0]["id"], big.id.to_string());
    assert_eq!(buyers[0]["email"], big.email);
    assert!((buyers[0]["total_spent"].as_f64().unwrap() - 50.0).abs() < 1e-9);
    assert_eq!(buyers[0]["order_count"], 1);
    assert_eq!(buyers[1]["id"], small.id.to_string());
    assert!(!buyers.iter().any(|b| b["id"] == never.id.to_string()));
}

#[tokio::test]
async fn recent_orders_cap_at_five_newest_first_with_owner_email() {
    let app = TestApp::new().await;
    let (_staff, staff_token) = app.create_user("Ops", "ops@example.com", true).await;
    let (ada, ada_token) = app.create_user("Ada", "ada@example.com", false).await;
    let item = app.seed_product("Thing", dec!(2)).await;

    let mut order_ids = Vec::new();
    for _ in 0..6 {
        order_ids.push(place_order(&app, &ada_token, &[(&item, 1)]).await);
    }

    let (_, stats) = app
        .request(
            Method::GET,
            "/api/v1/admin/statistics",
            Some(&staff_token),
            None,
        )
        .await;

    let recent = stats["recent_orders"].as_array().unwrap();
    assert_eq!(recent.len(), 5);
    // The newest order leads, the oldest fell off
    assert_eq!(recent[0]["id"], order_ids[5].as_str());
    assert!(!recent.iter().any(|o| o["id"] == order_ids[0].as_str()));
    assert!(recent.iter().all(|o| o["user_email"] == ada.email));
    assert!((recent[0]["total_amount"].as_f64().unwrap() - 2.0).abs() < 1e-9);
}

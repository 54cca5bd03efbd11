use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefront_api::{
    auth::{user, AuthConfig, AuthService},
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    services::catalog::CreateProductInput,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Test harness running the real router over an in-memory sqlite database.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub auth: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_cfg = db::DbConfig {
            url: "sqlite::memory:".to_string(),
            // A second pooled connection would see a different in-memory DB
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        let db = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let auth_cfg = AuthConfig::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(86_400),
            chrono::Duration::hours(72),
        );
        let event_sender_arc = Arc::new(event_sender.clone());
        let auth = Arc::new(AuthService::new(auth_cfg, db.clone(), event_sender_arc.clone()));

        let services = AppServices::new(db.clone(), event_sender_arc);
        let state = AppState {
            db,
            config: cfg,
            event_sender,
            auth: auth.clone(),
            services,
        };

        let router = storefront_api::app(state.clone());

        Self {
            router,
            state,
            auth,
            _event_task: event_task,
        }
    }

    /// Fire one request at the router and decode the JSON body (Null for
    /// empty bodies).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value)
    }

    /// Insert a user directly and mint an access token for it.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        is_staff: bool,
    ) -> (user::Model, String) {
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(String::new()),
            is_staff: Set(is_staff),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let user = model
            .insert(&*self.state.db)
            .await
            .expect("failed to insert user");

        let pair = self
            .auth
            .generate_token(&user)
            .await
            .expect("failed to mint token");
        (user, pair.access_token)
    }

    /// Seed a product through the catalog service.
    pub async fn seed_product(
        &self,
        name: &str,
        price: Decimal,
    ) -> storefront_api::entities::product::Model {
        self.state
            .services
            .catalog
            .create_product(CreateProductInput {
                name: name.to_string(),
                description: format!("{name} description"),
                price,
                category_id: None,
            })
            .await
            .expect("failed to seed product")
    }
}

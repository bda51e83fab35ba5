#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use travel_listings::auth::password::hash_password;
use travel_listings::db::{Listing, User};
use travel_listings::{AppState, MemoryQueue, MemoryStore, Repository, Settings};
use uuid::Uuid;

pub const PASSWORD: &str = "password123";

/// Builds the full application over in-memory storage and broker.
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($ctx.state.clone()))
                .wrap(actix_web::middleware::NormalizePath::trim())
                .configure(travel_listings::configure_app),
        )
        .await
    };
}

pub struct TestContext {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryQueue>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(Settings::new_for_test().expect("test settings"))
    }

    pub fn with_settings(config: Settings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryQueue::new());
        let state = AppState::from_parts(config, store.clone(), queue.clone())
            .expect("application state");
        Self { state, store, queue }
    }

    async fn user(&self, email: &str, is_staff: bool) -> (User, String) {
        let password_hash = hash_password(PASSWORD).expect("hash password");
        let mut user = User::new(email.to_string(), password_hash, None);
        user.is_staff = is_staff;
        let user = self.store.create_user(&user).await.expect("create user");
        let token = self
            .state
            .auth_service
            .authenticate(email, PASSWORD)
            .await
            .expect("login");
        (user, token)
    }

    /// A regular user and a bearer token for them.
    pub async fn login(&self, email: &str) -> (User, String) {
        self.user(email, false).await
    }

    pub async fn login_staff(&self, email: &str) -> (User, String) {
        self.user(email, true).await
    }

    pub async fn listing(&self, host: &User, price_per_night: f64) -> Listing {
        let price_per_night = Decimal::try_from(price_per_night).expect("price");
        let now = Utc::now();
        self.store
            .insert_listing(&Listing {
                listing_id: Uuid::new_v4(),
                host_id: host.id,
                title: "Seaside loft".into(),
                description: "Two rooms facing the beach".into(),
                location: "Mombasa, Kenya".into(),
                price_per_night,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("insert listing")
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// Common test utilities for integration tests
///
/// - Test database setup and cleanup
/// - Signed-up test users, regular or admin
/// - JWT token generation
/// - Request helpers

use axum::body::Body;
use axum::http::{Request, Response};
use postal_api::app::{build_router, AppState};
use postal_api::config::Config;
use postal_shared::auth::account::{AccountService, SignUp};
use postal_shared::auth::jwt::TokenPair;
use postal_shared::models::user::{User, UserPatch};
use postal_shared::services::Services;
use sqlx::PgPool;
use std::sync::atomic::{AtomicU32, Ordering};
use tower::Service as _;

pub const TEST_PASSWORD: &str = "correct-horse-42";

static NEXT_EMAIL: AtomicU32 = AtomicU32::new(0);

/// Address no other test run has used
pub fn unique_email(prefix: &str) -> String {
    format!(
        "{}-{}-{}@example.com",
        prefix,
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        NEXT_EMAIL.fetch_add(1, Ordering::SeqCst)
    )
}

pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    pub services: Services,
    pub user: User,
    pub jwt_token: String,
}

impl TestContext {
    /// Fresh app with a signed-up, non-privileged user
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;
        let db = PgPool::connect(&config.database.url).await?;

        // Path is relative to Cargo.toml, not this file
        sqlx::migrate!("../migrations").run(&db).await?;

        let services = Services::new(db.clone(), None);
        let user = AccountService::new(services.users.clone())
            .sign_up(SignUp {
                email: unique_email("user"),
                password: TEST_PASSWORD.to_string(),
                address: "1 Test Lane".to_string(),
            })
            .await?;

        let jwt_token = TokenPair::issue(&user.email, &config.jwt.secret)?.access_token;

        let state = AppState::new(db.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            config,
            services,
            user,
            jwt_token,
        })
    }

    /// Same as [`TestContext::new`] with the user promoted to admin
    pub async fn admin() -> anyhow::Result<Self> {
        let mut ctx = Self::new().await?;
        ctx.user = ctx
            .services
            .users
            .update(
                ctx.user.id,
                UserPatch {
                    privileged: Some(true),
                    ..UserPatch::default()
                },
            )
            .await?;
        Ok(ctx)
    }

    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.jwt_token)
    }

    /// Sends a request with the test user's token
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", self.auth_header());

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.app.clone().call(request).await.unwrap()
    }

    /// Removes the test user and its login
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        self.services.users.delete(self.user.id).await?;
        AccountService::new(self.services.users.clone())
            .remove_login(&self.user.email)
            .await?;
        Ok(())
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Creates a shipping method directly in the database
pub async fn create_test_method(ctx: &TestContext, name: &str, cost: f64) -> anyhow::Result<i64> {
    use postal_shared::models::shipping_method::NewShippingMethod;

    let method = ctx
        .services
        .methods
        .create(NewShippingMethod {
            name: name.to_string(),
            cost,
        })
        .await?;
    Ok(method.id)
}

/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use postal_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = postal_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post, put},
    Router,
};
use postal_shared::{
    auth::{middleware::authenticate, Role, SessionResolver},
    redis::{FeedReader, FeedWriter, RedisClient},
    services::Services,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, Level};

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub services: Services,

    /// Live feed reader; `None` when Redis is not configured
    pub feed: Option<FeedReader>,
}

impl AppState {
    /// State without the live feed
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            services: Services::new(db.clone(), None),
            db,
            config: Arc::new(config),
            feed: None,
        }
    }

    /// Publishes shipment changes through `client` and serves them on the feed endpoints
    pub fn with_feed(mut self, client: RedisClient) -> Self {
        self.services = Services::new(self.db.clone(), Some(FeedWriter::new(client.clone())));
        self.feed = Some(FeedReader::new(client));
        self
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    pub fn sessions(&self) -> SessionResolver {
        SessionResolver::new(self.services.users.clone())
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── /health
/// └── /v1/
///     ├── /auth/                       public
///     │   ├── POST /signup
///     │   ├── POST /login
///     │   ├── POST /logout
///     │   └── POST /refresh
///     ├── /user/                       signed-in user
///     │   ├── GET   /dashboard
///     │   ├── POST  /shipments
///     │   ├── POST  /shipments/:id/cancel
///     │   ├── GET   /track/:id
///     │   ├── GET   /methods
///     │   ├── GET   /feed              SSE
///     │   ├── GET   /settings
///     │   ├── PATCH /settings
///     │   └── POST  /settings/password
///     └── /admin/                      privileged user
///         ├── GET    /dashboard
///         ├── POST   /shipments
///         ├── GET    /shipments/status/:status
///         ├── PUT    /shipments/:id/status
///         ├── GET    /users
///         ├── PATCH  /users/:id
///         ├── DELETE /users/:id
///         ├── GET    /methods/cost-range
///         ├── POST   /methods
///         ├── PATCH  /methods/:id
///         ├── DELETE /methods/:id
///         ├── GET    /settings
///         └── GET    /feed             SSE
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/refresh", post(routes::auth::refresh));

    let user_routes = Router::new()
        .route("/dashboard", get(routes::user::dashboard))
        .route("/shipments", post(routes::user::create_shipment))
        .route("/shipments/:id/cancel", post(routes::user::cancel_shipment))
        .route("/track/:id", get(routes::user::track_shipment))
        .route("/methods", get(routes::user::list_methods))
        .route("/feed", get(routes::feed::user_feed))
        .route(
            "/settings",
            get(routes::user::settings).patch(routes::user::update_profile),
        )
        .route("/settings/password", post(routes::user::change_password))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_user,
        ));

    let admin_routes = Router::new()
        .route("/dashboard", get(routes::admin::dashboard))
        .route("/shipments", post(routes::admin::create_shipment))
        .route(
            "/shipments/status/:status",
            get(routes::admin::shipments_by_status),
        )
        .route("/shipments/:id/status", put(routes::admin::update_status))
        .route("/users", get(routes::admin::list_users))
        .route(
            "/users/:id",
            patch(routes::admin::update_user).delete(routes::admin::delete_user),
        )
        .route("/methods/cost-range", get(routes::admin::methods_by_cost))
        .route("/methods", post(routes::admin::create_method))
        .route(
            "/methods/:id",
            patch(routes::admin::update_method).delete(routes::admin::delete_method),
        )
        .route("/settings", get(routes::admin::settings))
        .route("/feed", get(routes::feed::admin_feed))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/user", user_routes)
        .nest("/admin", admin_routes);

    let cors = if state.config.allows_any_origin() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Resolves the caller for `role` and stores the
/// [`Identity`](postal_shared::auth::Identity) in request extensions
///
/// A missing or invalid token counts as no session.
async fn resolve_session(
    state: &AppState,
    mut req: Request,
    next: Next,
    role: Role,
) -> Result<Response, ApiError> {
    let auth = match authenticate(req.headers(), state.jwt_secret()) {
        Ok(auth) => Some(auth),
        Err(e) => {
            debug!(error = %e, "Request has no valid session");
            None
        }
    };

    let identity = state.sessions().resolve(auth.as_ref(), role).await?;
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

async fn require_user(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    resolve_session(&state, req, next, Role::User).await
}

async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    resolve_session(&state, req, next, Role::Admin).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use axum::body::Body;
    use axum::http::StatusCode;
    use postal_shared::db::pool::{create_lazy_pool, DatabaseConfig};
    use tower::ServiceExt;

    fn app() -> Router {
        let config = test_config();
        let pool = create_lazy_pool(&DatabaseConfig::new(config.database.url.clone(), 2)).unwrap();
        build_router(AppState::new(pool, config))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_user_pages_without_session_redirect_home() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/v1/user/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        assert_eq!(
            response.headers().get("X-Content-Type-Options").unwrap(),
            "nosniff"
        );

        let body = body_json(response).await;
        assert_eq!(body["redirect"], "/");
    }

    #[tokio::test]
    async fn test_admin_pages_reject_bad_token() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/v1/admin/dashboard")
                    .header(header::AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signup_rejects_invalid_email() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/v1/auth/signup")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"email":"not-an-email","password":"abc12345"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_refresh_rejects_garbage() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/v1/auth/refresh")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"refresh_token":"garbage"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_points_home() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/v1/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["redirect"], "/");
    }
}

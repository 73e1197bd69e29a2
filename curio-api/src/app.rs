/// Application state and router builder
///
/// This module defines the shared application state and provides a
/// function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use curio_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = curio_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use curio_shared::{auth::jwt, storage::ImageStore};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State`
/// extractor. Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Media file store for uploaded images
    pub images: ImageStore,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        let images = ImageStore::new(config.storage.media_root.clone());
        Self {
            db,
            config: Arc::new(config),
            images,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Identity of the authenticated request, injected by the auth layer
///
/// Handlers take this via `Extension`; every store operation scopes to
/// `id`, so a handler cannot accidentally read another owner's rows.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    /// Authenticated user id
    pub id: i64,
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                       # Health check (public)
/// ├── /v1/
/// │   ├── /users/                   # Identity endpoints
/// │   │   ├── POST /                # Create account (public)
/// │   │   ├── POST /token           # Obtain tokens (public)
/// │   │   ├── POST /token/refresh   # Refresh access token (public)
/// │   │   └── GET|PATCH /me         # Own profile (authenticated)
/// │   ├── /tags/                    # GET (assigned_only), POST
/// │   ├── /items/                   # GET (assigned_only), POST
/// │   └── /collections/             # CRUD + filters + upload-image
/// ```
///
/// All non-identity v1 routes require a bearer access token.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Identity routes: account creation and token issuance are public,
    // profile access is not
    let public_user_routes = Router::new()
        .route("/", post(routes::users::create_user))
        .route("/token", post(routes::users::create_token))
        .route("/token/refresh", post(routes::users::refresh_token));

    let me_routes = Router::new()
        .route(
            "/me",
            get(routes::users::me).patch(routes::users::update_me),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let user_routes = public_user_routes.merge(me_routes);

    let tag_routes = Router::new()
        .route(
            "/",
            get(routes::tags::list_tags).post(routes::tags::create_tag),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let item_routes = Router::new()
        .route(
            "/",
            get(routes::items::list_items).post(routes::items::create_item),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let collection_routes = Router::new()
        .route(
            "/",
            get(routes::collections::list_collections).post(routes::collections::create_collection),
        )
        .route(
            "/:id",
            get(routes::collections::get_collection)
                .put(routes::collections::replace_collection)
                .patch(routes::collections::patch_collection)
                .delete(routes::collections::delete_collection),
        )
        .route(
            "/:id/upload-image",
            // The default body limit is smaller than the accepted image
            // size; raise it here so the handler's own size check is the
            // one that answers
            post(routes::collections::upload_collection_image)
                .layer(DefaultBodyLimit::max(
                    routes::collections::MAX_UPLOAD_BODY_BYTES,
                )),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Build complete v1 API
    let v1_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/tags", tag_routes)
        .nest("/items", item_routes)
        .nest("/collections", collection_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
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
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the bearer access token from the
/// Authorization header, then injects `CurrentUser` into request
/// extensions.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| crate::error::ApiError::Unauthorized("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    req.extensions_mut().insert(CurrentUser { id: claims.sub });

    Ok(next.run(req).await)
}

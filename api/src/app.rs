use std::sync::Arc;

use axum::body::Body;
use axum::extract::OriginalUri;
use axum::http::{HeaderValue, Request};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;
use crate::error::ApiError;
use crate::handler::{health_check, predict_revenue, predict_revenue_batch, root, validation_rules};
use crate::model::ModelManager;
use crate::validate::Validator;

/// Shared, read-only request context. The model is `None` only when the
/// server was started in degraded mode after a failed artifact load.
#[derive(Clone)]
pub struct AppState {
    pub model: Option<Arc<ModelManager>>,
    pub validator: Arc<Validator>,
    pub max_batch_size: usize,
}

impl AppState {
    pub fn new(model: Option<ModelManager>, validator: Validator, max_batch_size: usize) -> Self {
        Self {
            model: model.map(Arc::new),
            validator: Arc::new(validator),
            max_batch_size,
        }
    }

    pub fn model(&self) -> Result<&ModelManager, ApiError> {
        self.model.as_deref().ok_or(ApiError::ModelUnavailable)
    }
}

const CLIENT_PATH: &str = "/app";

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %o, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    layer.allow_origin(AllowOrigin::list(parse_origins(origins)))
}

/// `/app` must end in a slash or the client's relative asset links resolve
/// against the site root.
async fn client_trailing_slash(request: Request<Body>, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    if path == CLIENT_PATH {
        return Redirect::permanent(&format!("{CLIENT_PATH}/")).into_response();
    }
    next.run(request).await
}

pub fn create_router(app_state: AppState, config: &Config) -> Router {
    let api_routes = Router::new()
        .route("/", post(predict_revenue))
        .route("/batch", post(predict_revenue_batch));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/validation-rules", get(validation_rules))
        .nest("/predict", api_routes)
        .nest_service(CLIENT_PATH, ServeDir::new(&config.static_dir))
        .layer(middleware::from_fn(client_trailing_slash))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins))
        .with_state(app_state)
}

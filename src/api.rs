// 🌐 HTTP API - REST routes with Axum
//
// Thin layer: decode the request, call the reconciler or the verification
// manager, and map `ServiceError` onto status codes with a `{detail}` body.

use crate::config::LoginFailureMode;
use crate::error::ServiceError;
use crate::profile::{BorrowerProfile, StoredRecord};
use crate::reconciler::{RecordReconciler, SortOrder};
use crate::store::RecordEvent;
use crate::verification::VerificationManager;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<RecordReconciler>,
    pub verification: Arc<VerificationManager>,
    pub login_failure: LoginFailureMode,
}

// ============================================================================
// Errors
// ============================================================================

pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Prediction(_)
            | ServiceError::EmailSyntax(_)
            | ServiceError::InvalidCode
            | ServiceError::Validation(_)
            | ServiceError::UnknownCategory(_) => StatusCode::BAD_REQUEST,
            ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServiceError::EmailDelivery(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub order: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET / - Liveness message
async fn home() -> impl IntoResponse {
    Json(json!({ "message": "AgriCred scoring API running" }))
}

/// POST /predict - Score a full profile and save it
async fn predict(
    State(state): State<AppState>,
    Json(profile): Json<BorrowerProfile>,
) -> ApiResult<StoredRecord> {
    Ok(Json(state.reconciler.create(profile)?))
}

/// GET /get-user/:username
async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<StoredRecord> {
    Ok(Json(state.reconciler.lookup(&username)?))
}

/// GET /get-user/:username/events - Audit trail, newest first
async fn get_user_events(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Vec<RecordEvent>> {
    Ok(Json(state.reconciler.events(&username)?))
}

/// GET /get-all-users?order=asc|desc - Sorted by repayment class
async fn get_all_users(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<StoredRecord>> {
    let order = match params.order.as_deref() {
        None => SortOrder::default(),
        Some(raw) => raw
            .parse::<SortOrder>()
            .map_err(ServiceError::Validation)?,
    };

    Ok(Json(state.reconciler.list(order)?))
}

/// PUT /update/:username - Merge a partial attribute map and rescore
async fn update_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(patch): Json<Map<String, Value>>,
) -> ApiResult<StoredRecord> {
    Ok(Json(state.reconciler.update(&username, &patch)?))
}

/// POST /login
async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Response {
    match state.reconciler.login(&request.username, &request.password) {
        Ok(record) => Json(record).into_response(),
        Err(ServiceError::InvalidCredentials) => {
            let status = match state.login_failure {
                LoginFailureMode::Soft => StatusCode::OK,
                LoginFailureMode::Unauthorized => StatusCode::UNAUTHORIZED,
            };
            (status, Json(json!({ "error": "Invalid credentials" }))).into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}

/// POST /send-code
async fn send_code(
    State(state): State<AppState>,
    Json(request): Json<SendCodeRequest>,
) -> ApiResult<Value> {
    state.verification.issue(&request.email).await?;
    Ok(Json(json!({ "message": "Verification code sent" })))
}

/// POST /verify-code
async fn verify_code(
    State(state): State<AppState>,
    Json(request): Json<VerifyCodeRequest>,
) -> ApiResult<Value> {
    state.verification.verify(&request.email, &request.code)?;
    Ok(Json(json!({ "message": "Email verified successfully" })))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/predict", post(predict))
        .route("/get-user/:username", get(get_user))
        .route("/get-user/:username/events", get(get_user_events))
        .route("/get-all-users", get(get_all_users))
        .route("/update/:username", put(update_user))
        .route("/login", post(login))
        .route("/send-code", post(send_code))
        .route("/verify-code", post(verify_code))
        .with_state(state)
}

/// CORS for the browser front end; "*" falls back to a permissive layer
pub fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    if origin == "*" {
        return Ok(CorsLayer::permissive());
    }

    let origin = HeaderValue::from_str(origin)
        .map_err(|e| anyhow::anyhow!("invalid CORS origin {:?}: {}", origin, e))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

// ============================================================================
// TESTS
// ============================================================================

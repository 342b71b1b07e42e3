use crate::errors::ApiError;
use crate::models::*;
use crate::state::AppState;
use crate::survey::Category;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{delete, get, post},
    Json, Router,
};
use fhe_provider::types::{Address, EncryptedInput};
use tower_http::cors::{Any, CorsLayer};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/submissions", post(submit))
        .route("/api/v1/submissions/length", get(submissions_length))
        .route("/api/v1/stats/count", get(response_count))
        .route("/api/v1/stats/sum", get(total_rating_sum))
        .route("/api/v1/stats/departments/:category", get(department_stats))
        .route("/api/v1/managers", post(add_manager))
        .route("/api/v1/managers/:address", delete(remove_manager))
        .route("/api/v1/access/department", post(grant_department_access))
        .route("/api/v1/access/departments", post(grant_multiple_department_access))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// The caller's principal address, from the `X-Caller-Address` header.
///
/// Proving control of the address (wallet signature, session, ...) is an
/// external authentication concern; this service trusts the header the same
/// way the upstream gateway that sets it is trusted.
fn caller_from(headers: &HeaderMap) -> Result<Address, ApiError> {
    let raw = headers
        .get("X-Caller-Address")
        .ok_or_else(|| ApiError::BadRequest("missing X-Caller-Address header".to_string()))?;
    let s = raw
        .to_str()
        .map_err(|_| ApiError::BadRequest("malformed X-Caller-Address header".to_string()))?;
    s.parse().map_err(ApiError::BadRequest)
}

async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let caller = caller_from(&headers)?;

    let rating = EncryptedInput::from_b64(&req.rating_ciphertext_b64, &req.rating_proof_b64)
        .map_err(ApiError::BadRequest)?;
    let category_value =
        EncryptedInput::from_b64(&req.category_ciphertext_b64, &req.category_proof_b64)
            .map_err(ApiError::BadRequest)?;

    let mut survey = state.survey().await;
    let sequence_id = survey.submit(caller, req.category, &rating, &category_value, req.feedback)?;

    Ok(Json(SubmitResponse { sequence_id }))
}

async fn submissions_length(State(state): State<AppState>) -> Result<Json<LengthResponse>, ApiError> {
    let survey = state.survey().await;
    Ok(Json(LengthResponse {
        length: survey.response_array_length(),
    }))
}

async fn response_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HandleResponse>, ApiError> {
    let caller = caller_from(&headers)?;
    let survey = state.survey().await;
    let handle = survey.response_count(&caller)?;
    Ok(Json(HandleResponse { handle }))
}

async fn total_rating_sum(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HandleResponse>, ApiError> {
    let caller = caller_from(&headers)?;
    let survey = state.survey().await;
    let handle = survey.total_rating_sum(&caller)?;
    Ok(Json(HandleResponse { handle }))
}

async fn department_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(category): Path<Category>,
) -> Result<Json<DepartmentStatsResponse>, ApiError> {
    let caller = caller_from(&headers)?;
    let survey = state.survey().await;
    let (sum_handle, count_handle) = survey.department_stats(&caller, category)?;
    Ok(Json(DepartmentStatsResponse {
        category,
        sum_handle,
        count_handle,
    }))
}

async fn add_manager(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ManagerRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let caller = caller_from(&headers)?;
    let mut survey = state.survey().await;
    survey.add_manager(caller, req.target)?;
    Ok(Json(OkResponse { ok: true }))
}

async fn remove_manager(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(address): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    let caller = caller_from(&headers)?;
    let target: Address = address.parse().map_err(ApiError::BadRequest)?;
    let mut survey = state.survey().await;
    survey.remove_manager(caller, target)?;
    Ok(Json(OkResponse { ok: true }))
}

async fn grant_department_access(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DepartmentAccessRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let caller = caller_from(&headers)?;
    let mut survey = state.survey().await;
    survey.grant_department_access(caller, req.target, req.category)?;
    Ok(Json(OkResponse { ok: true }))
}

async fn grant_multiple_department_access(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<MultiDepartmentAccessRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let caller = caller_from(&headers)?;
    let mut survey = state.survey().await;
    survey.grant_multiple_department_access(caller, req.target, &req.categories)?;
    Ok(Json(OkResponse { ok: true }))
}

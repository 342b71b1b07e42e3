use crate::survey::SurveyError;
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Survey(#[from] SurveyError),

    #[error("internal error")]
    Internal,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn survey_status(e: &SurveyError) -> StatusCode {
    match e {
        SurveyError::DuplicateSubmission => StatusCode::CONFLICT,
        SurveyError::InvalidProof => StatusCode::UNPROCESSABLE_ENTITY,
        SurveyError::Unauthorized => StatusCode::UNAUTHORIZED,
        SurveyError::NotAManager => StatusCode::FORBIDDEN,
        SurveyError::UnknownDepartment(_) => StatusCode::NOT_FOUND,
        SurveyError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::Survey(e) => (survey_status(e), e.to_string()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };

        (status, Json(ErrorBody { error: msg })).into_response()
    }
}

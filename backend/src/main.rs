use backend::errors::ApiError;
use backend::state::AppState;
use backend::survey::Survey;
use backend::api;
use fhe_provider::sealed::SealedProvider;
use fhe_provider::types::Address;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // In production the owner is the deploying principal; for local runs a
    // fixed dev address keeps the admin endpoints reachable.
    let owner: Address = match std::env::var("SURVEY_OWNER") {
        Ok(s) => s.parse().map_err(ApiError::BadRequest)?,
        Err(_) => Address::from_byte(0x01),
    };

    let provider = SealedProvider::new(&mut rand::rngs::OsRng);
    let survey = Survey::new(provider, owner)?;
    let state = AppState::new(survey);

    let app = api::router(state);

    let addr = std::env::var("BACKEND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|_| ApiError::Internal)?;

    tracing::info!(%addr, %owner, "survey backend listening");

    axum::serve(listener, app).await.map_err(|_| ApiError::Internal)?;

    Ok(())
}

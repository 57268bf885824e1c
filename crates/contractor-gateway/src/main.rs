use std::{net::SocketAddr, sync::Arc};

use anyhow::Result as AnyResult;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, put},
};
use contractor_core::SystemClock;
use contractor_platform::{
    ContractorResponse, ContractorService, SaveContractorRequest, ServiceConfig, ServiceError,
    connect_database,
};
use tracing::{error, info};

const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
struct AppState {
    contractors: ContractorService,
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "contractor_gateway=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;
    let pool = connect_database(&config.database_url).await?;

    let state = AppState {
        contractors: ContractorService::new(pool, Arc::new(SystemClock)),
    };
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/contractor/save", put(save_contractor))
        .route("/contractor/{id}", get(get_contractor))
        .route("/contractor/delete/{id}", delete(delete_contractor))
        .with_state(state);

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn save_contractor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SaveContractorRequest>,
) -> Result<Json<ContractorResponse>, (StatusCode, String)> {
    let contractor = state
        .contractors
        .save(request, user_id(&headers))
        .await
        .map_err(service_error)?;
    Ok(Json(contractor.into()))
}

async fn get_contractor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContractorResponse>, (StatusCode, String)> {
    let contractor = state
        .contractors
        .find_by_id(&id)
        .await
        .map_err(service_error)?;
    Ok(Json(contractor.into()))
}

async fn delete_contractor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.contractors.delete(&id).await.map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

fn user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn service_error(err: ServiceError) -> (StatusCode, String) {
    match err {
        ServiceError::Validation(message) => (StatusCode::BAD_REQUEST, message),
        ServiceError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        other => {
            error!("contractor request failed: {other}");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

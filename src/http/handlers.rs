//! Query surface handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::engine::QueryError;
use crate::http::response::{
    ErrorResponse, PriceResponse, RootResponse, SignedPriceResponse, StatusResponse,
};
use crate::http::server::AppState;

fn error(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
        .into_response()
}

fn query_error(e: QueryError) -> Response {
    match e {
        QueryError::UntrackedPair(_) | QueryError::NoData(_) => {
            tracing::warn!(error = %e, "Price lookup failed");
            error(StatusCode::NOT_FOUND, e.to_string())
        }
        QueryError::NotConnected | QueryError::Signing(_) => {
            tracing::error!(error = %e, "Signed price unavailable");
            error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Price oracle is running".to_string(),
    })
}

pub async fn get_price(State(state): State<AppState>, Path(pair): Path<String>) -> Response {
    tracing::debug!(pair = %pair, "Price request");

    match state.facade.get_latest_price(&pair) {
        Ok(observation) => Json(PriceResponse::from(observation)).into_response(),
        Err(e) => query_error(e),
    }
}

pub async fn get_signed_price(
    State(state): State<AppState>,
    Path(pair): Path<String>,
) -> Response {
    tracing::debug!(pair = %pair, "Signed price request");

    match state.facade.get_signed_price(&pair).await {
        Ok(attestation) => Json(SignedPriceResponse::from(attestation)).into_response(),
        Err(e) => query_error(e),
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::from(state.facade.get_status().await))
}

use crate::error::{AppError, Result};
use crate::model::{CreateUrlRequest, CreateUrlResponse, GetUrlResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use tracing::info;

pub async fn shorten_url_handler(
    State(state): State<AppState>,
    request: std::result::Result<Json<CreateUrlRequest>, JsonRejection>,
) -> Result<Json<CreateUrlResponse>> {
    let Json(request) = request.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    info!(long_url = %request.long_url, "shorten request");

    validate_long_url(&request.long_url)?;

    let code = state
        .shortener()
        .shorten(&request.long_url)
        .await
        .map_err(|e| AppError::from_shortener(e, state.base_url()))?;

    Ok(Json(CreateUrlResponse {
        short_url: code.to_url(state.base_url()),
        short_code: code.to_string(),
    }))
}

pub async fn get_url_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<GetUrlResponse>> {
    info!(code = %short_code, "resolve request");

    let record = state
        .shortener()
        .resolve(&short_code)
        .await
        .map_err(|e| AppError::from_shortener(e, state.base_url()))?;

    Ok(Json(GetUrlResponse {
        short_code: record.canonical_code().to_string(),
        long_url: record.long_url,
    }))
}

/// Accepts absolute URLs with a host, e.g. `https://example.com/a`.
fn validate_long_url(long_url: &str) -> Result<()> {
    let parsed = ::url::Url::parse(long_url)
        .map_err(|e| AppError::BadRequest(format!("input string is not a valid url: {e}")))?;

    if parsed.cannot_be_a_base() || parsed.host_str().is_none_or(str::is_empty) {
        return Err(AppError::BadRequest(format!(
            "url must be absolute with a host: {long_url}"
        )));
    }

    Ok(())
}

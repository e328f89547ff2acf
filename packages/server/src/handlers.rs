//! HTTP handler functions for the occurrence API.

use actix_web::{HttpRequest, HttpResponse, http::header, web};
use dataplane_server_models::{
    ApiHealth, FilterOptionsResponse, OccurrenceQueryParams, OccurrencesResponse,
};

use crate::{API_VERSION, AppState};

/// Name reported as the filter vocabulary source.
const DATA_SOURCE: &str = "ocorrencia_completa";

/// Returns a 401 response unless the request carries the configured
/// bearer token. Always passes when no token is configured.
fn reject_unauthorized(req: &HttpRequest, state: &AppState) -> Option<HttpResponse> {
    let expected = state.token.as_deref()?;
    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    if provided == Some(expected) {
        return None;
    }

    log::debug!("Rejected request to {} without a valid token", req.path());
    Some(
        HttpResponse::Unauthorized()
            .insert_header((header::WWW_AUTHENTICATE, "Bearer"))
            .json(serde_json::json!({
                "error": "Invalid or missing bearer token"
            })),
    )
}

/// `GET /api/v1/health`
pub async fn health(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(rejection) = reject_unauthorized(&req, &state) {
        return rejection;
    }
    HttpResponse::Ok().json(ApiHealth::healthy(API_VERSION))
}

/// `GET /api/v1/occurrences/coordinates`
///
/// Returns one page of occurrences. Without `complete=true` only records
/// with usable coordinates are returned. `limit` is capped server-side.
pub async fn occurrences(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<OccurrenceQueryParams>,
) -> HttpResponse {
    if let Some(rejection) = reject_unauthorized(&req, &state) {
        return rejection;
    }

    let complete = params.complete.unwrap_or(false);
    let limit = params
        .limit
        .unwrap_or(state.max_limit)
        .clamp(1, state.max_limit);
    let skip = params.skip.unwrap_or(0);

    let (total, ocurrences) = state.dataset.page(complete, skip, limit);
    log::info!(
        "Returning {} occurrences of {total} (complete={complete}, skip={skip}, limit={limit})",
        ocurrences.len()
    );
    HttpResponse::Ok().json(OccurrencesResponse { total, ocurrences })
}

/// `GET /api/v1/occurrences/filter-options`
///
/// Returns the filter vocabulary with summary metadata.
pub async fn filter_options(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(rejection) = reject_unauthorized(&req, &state) {
        return rejection;
    }
    let response =
        FilterOptionsResponse::new(state.dataset.filter_options().clone(), DATA_SOURCE);
    log::info!(
        "Returning {} filter options in {} categories",
        response.metadata.total_unique_options,
        response.metadata.fields_available
    );
    HttpResponse::Ok().json(response)
}

//! Meta-facing offer management endpoint.
//!
//! Unlike the admin routes this surface speaks Meta's wire envelope:
//! `{ "data": {...}, "errors": [{error_type, offer_code, error_message}] }`,
//! authenticated by the `jwt_params` token rather than bearer auth. The
//! operation payload (offer items or codes) rides inside the verified JWT
//! claims, not the HTTP body.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use merchsync_offers::{
    check_offer_management_enabled, create_offers, delete_offers, get_offers, ErrorType,
    ItemError, OfferApiError, OfferClaims, RequestVerifier,
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct OfferQuery {
    jwt_params: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OfferBody {
    jwt_params: Option<String>,
}

/// `POST /api/v1/offers` — create offers from the token's `offers` payload.
pub async fn create(
    State(state): State<AppState>,
    body: Option<Json<OfferBody>>,
) -> Response {
    let token = body.and_then(|Json(b)| b.jwt_params);
    let claims = match authorize(&state, token.as_deref()).await {
        Ok(claims) => claims,
        Err(e) => return request_error(&e),
    };

    let Some(items) = claims.offers else {
        return request_error(&OfferApiError::new(
            ErrorType::InvalidRequest,
            "request token carries no offers payload",
        ));
    };

    let result = create_offers(&state.pool, &items).await;
    envelope(
        json!({ "created_offers": result.created_offers }),
        result.errors,
    )
}

/// `GET /api/v1/offers` — read offers named by the token's `offer_codes`.
pub async fn read(State(state): State<AppState>, Query(query): Query<OfferQuery>) -> Response {
    let claims = match authorize(&state, query.jwt_params.as_deref()).await {
        Ok(claims) => claims,
        Err(e) => return request_error(&e),
    };

    let Some(codes) = claims.offer_codes else {
        return request_error(&OfferApiError::new(
            ErrorType::InvalidRequest,
            "request token carries no offer_codes payload",
        ));
    };

    let result = get_offers(&state.pool, &codes).await;
    envelope(json!({ "offers": result.offers }), result.errors)
}

/// `DELETE /api/v1/offers` — delete offers named by the token's `offer_codes`.
pub async fn delete(State(state): State<AppState>, Query(query): Query<OfferQuery>) -> Response {
    let claims = match authorize(&state, query.jwt_params.as_deref()).await {
        Ok(claims) => claims,
        Err(e) => return request_error(&e),
    };

    let Some(codes) = claims.offer_codes else {
        return request_error(&OfferApiError::new(
            ErrorType::InvalidRequest,
            "request token carries no offer_codes payload",
        ));
    };

    let result = delete_offers(&state.pool, &codes).await;
    envelope(
        json!({ "deleted_offer_codes": result.deleted_offer_codes }),
        result.errors,
    )
}

/// Global preconditions, in order: enablement switches, token existence,
/// then full token verification. Any failure short-circuits the request.
async fn authorize(state: &AppState, token: Option<&str>) -> Result<OfferClaims, OfferApiError> {
    check_offer_management_enabled(&state.pool).await?;

    // Existence is checked before the verifier loads its keys, so a request
    // with no token reports the missing token rather than key configuration.
    let token = token.filter(|t| !t.is_empty()).ok_or_else(|| {
        OfferApiError::new(ErrorType::JwtNotFound, "no jwt_params token in request")
    })?;

    let verifier = RequestVerifier::from_settings(&state.pool).await?;
    verifier.verify(Some(token))
}

fn request_error(error: &OfferApiError) -> Response {
    let status = StatusCode::from_u16(error.error_type.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let errors = vec![ItemError::new(error.error_type, None, error.message.clone())];
    (
        status,
        Json(json!({ "data": Value::Null, "errors": errors })),
    )
        .into_response()
}

fn envelope(data: Value, errors: Vec<ItemError>) -> Response {
    (StatusCode::OK, Json(json!({ "data": data, "errors": errors }))).into_response()
}

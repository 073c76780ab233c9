use serde::Serialize;
use thiserror::Error;

/// Wire-level error taxonomy for the offer management surface.
///
/// Serialized with the `ERROR_*` codes Meta's client matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorType {
    #[serde(rename = "ERROR_JWT_NOT_FOUND")]
    JwtNotFound,
    #[serde(rename = "ERROR_JWT_DECODE_FAILURE")]
    JwtDecodeFailure,
    #[serde(rename = "ERROR_JWT_EXPIRED")]
    JwtExpired,
    #[serde(rename = "ERROR_CATALOG_ID_MISMATCH")]
    CatalogIdMismatch,
    #[serde(rename = "ERROR_OFFER_MANAGEMENT_DISABLED")]
    OfferManagementDisabled,
    #[serde(rename = "ERROR_INVALID_REQUEST")]
    InvalidRequest,
    #[serde(rename = "ERROR_OFFER_CODE_ALREADY_EXISTS")]
    OfferCodeAlreadyExists,
    #[serde(rename = "ERROR_OFFER_NOT_FOUND")]
    OfferNotFound,
    #[serde(rename = "ERROR_OFFER_CREATE_FAILURE")]
    OfferCreateFailure,
    #[serde(rename = "ERROR_OFFER_DELETE_FAILURE")]
    OfferDeleteFailure,
    #[serde(rename = "ERROR_INTERNAL")]
    Internal,
}

impl ErrorType {
    /// HTTP status a request-level occurrence of this error maps to.
    /// Item-level errors ride inside a 200 envelope and never reach this.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorType::JwtNotFound | ErrorType::JwtDecodeFailure | ErrorType::JwtExpired => 401,
            ErrorType::CatalogIdMismatch | ErrorType::OfferManagementDisabled => 403,
            ErrorType::InvalidRequest => 400,
            ErrorType::Internal => 500,
            ErrorType::OfferCodeAlreadyExists
            | ErrorType::OfferNotFound
            | ErrorType::OfferCreateFailure
            | ErrorType::OfferDeleteFailure => 200,
        }
    }
}

/// A request-level failure: aborts the whole request before any per-item
/// work happens.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{error_type:?}: {message}")]
pub struct OfferApiError {
    pub error_type: ErrorType,
    pub message: String,
}

impl OfferApiError {
    #[must_use]
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
        }
    }
}

/// A per-item failure, collected into the response `errors` array while
/// sibling items continue processing.
#[derive(Debug, Clone, Serialize)]
pub struct ItemError {
    pub error_type: ErrorType,
    pub offer_code: Option<String>,
    pub error_message: String,
}

impl ItemError {
    #[must_use]
    pub fn new(
        error_type: ErrorType,
        offer_code: Option<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            error_type,
            offer_code,
            error_message: error_message.into(),
        }
    }
}

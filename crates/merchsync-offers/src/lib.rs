//! Offer management: signed-request verification and coupon CRUD.
//!
//! Meta signs every offer-management request as an ES256 JWT. Verification
//! (existence → signature → expiry → audience, in that order) turns the
//! token into trusted claims; the service then applies per-item validation
//! and mutation, collecting item-level errors instead of failing a batch on
//! its first bad item. Only coupons carrying the Facebook-managed marker
//! are visible or mutable through this surface.

mod error;
mod payload;
mod service;
mod verify;

pub use error::{ErrorType, ItemError, OfferApiError};
pub use payload::{parse_offer_item, Discount, ValidatedOffer};
pub use service::{
    check_offer_management_enabled, create_offers, delete_offers, get_offers, CreateResult,
    DeleteResult, FixedAmountView, GetResult, OfferView,
};
pub use verify::{OfferClaims, RequestVerifier};

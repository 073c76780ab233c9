//! Database-backed tests for the offer CRUD flow.

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;

use merchsync_db::{settings, NewCoupon};
use merchsync_offers::{
    check_offer_management_enabled, create_offers, delete_offers, get_offers, ErrorType,
};

#[sqlx::test(migrations = "../../migrations")]
async fn create_get_delete_lifecycle(pool: PgPool) {
    let items = vec![json!({
        "code": "SAVE10",
        "percent_off": 10,
        "offer_class": "order",
        "usage_limit": 1
    })];

    let created = create_offers(&pool, &items).await;
    assert!(created.errors.is_empty(), "unexpected: {:?}", created.errors);
    assert_eq!(created.created_offers.len(), 1);
    assert_eq!(created.created_offers[0].code, "SAVE10");
    assert_eq!(created.created_offers[0].percent_off, Some(10.0));
    assert_eq!(created.created_offers[0].usage_limit, 1);

    let codes = vec!["SAVE10".to_string()];
    let fetched = get_offers(&pool, &codes).await;
    assert!(fetched.errors.is_empty());
    assert_eq!(fetched.offers.len(), 1);
    assert_eq!(fetched.offers[0].code, "SAVE10");

    let deleted = delete_offers(&pool, &codes).await;
    assert!(deleted.errors.is_empty());
    assert_eq!(deleted.deleted_offer_codes, vec!["SAVE10"]);

    // A fresh lookup after delete reports not-found.
    let gone = get_offers(&pool, &codes).await;
    assert!(gone.offers.is_empty());
    assert_eq!(gone.errors.len(), 1);
    assert_eq!(gone.errors[0].error_type, ErrorType::OfferNotFound);
}

#[sqlx::test(migrations = "../../migrations")]
async fn invalid_item_does_not_block_valid_sibling(pool: PgPool) {
    let items = vec![
        json!({
            "code": "GOOD5",
            "fixed_amount_off": {"amount": "5.00", "currency": "USD"},
            "offer_class": "order"
        }),
        // Both discount kinds present, so this item is rejected.
        json!({
            "code": "BAD",
            "percent_off": 10,
            "fixed_amount_off": {"amount": "5.00", "currency": "USD"},
            "offer_class": "order"
        }),
    ];

    let result = create_offers(&pool, &items).await;
    assert_eq!(result.created_offers.len(), 1);
    assert_eq!(result.created_offers[0].code, "GOOD5");
    let fixed = result.created_offers[0]
        .fixed_amount_off
        .as_ref()
        .expect("fixed amount discount");
    assert_eq!(fixed.amount, "5.00");
    assert_eq!(fixed.currency, "USD");

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].error_type, ErrorType::OfferCreateFailure);
    assert_eq!(result.errors[0].offer_code.as_deref(), Some("BAD"));

    // The stored sibling is fully usable.
    let fetched = get_offers(&pool, &["GOOD5".to_string()]).await;
    assert_eq!(fetched.offers.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn item_without_code_field_is_rejected_before_storage(pool: PgPool) {
    // The offer code must arrive under "code"; any other key leaves the
    // item codeless and nothing is written.
    let items = vec![json!({
        "offer_code": "MISKEYED",
        "percent_off": 10,
        "offer_class": "order"
    })];

    let result = create_offers(&pool, &items).await;
    assert!(result.created_offers.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].offer_code.is_none());
    assert!(result.errors[0].error_message.contains("offer code is required"));

    let row = merchsync_db::get_coupon_by_code(&pool, "MISKEYED")
        .await
        .expect("lookup");
    assert!(row.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_code_is_item_level_error(pool: PgPool) {
    let items = vec![json!({
        "code": "ONCE",
        "percent_off": 15,
        "offer_class": "order"
    })];

    let first = create_offers(&pool, &items).await;
    assert_eq!(first.created_offers.len(), 1);

    let second = create_offers(&pool, &items).await;
    assert!(second.created_offers.is_empty());
    assert_eq!(second.errors.len(), 1);
    assert_eq!(second.errors[0].error_type, ErrorType::OfferCodeAlreadyExists);
    assert_eq!(second.errors[0].offer_code.as_deref(), Some("ONCE"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn merchant_created_coupons_are_invisible(pool: PgPool) {
    // Inserted outside the offer API, without the managed marker.
    let coupon = NewCoupon {
        code: "MERCHANT20".to_string(),
        discount_type: "percent".to_string(),
        amount: Decimal::new(20, 0),
        currency: None,
        date_expires: None,
        usage_limit: 0,
        email_restriction: None,
        tags: Vec::new(),
        facebook_managed: false,
    };
    merchsync_db::insert_coupon(&pool, &coupon)
        .await
        .expect("insert merchant coupon");

    let codes = vec!["MERCHANT20".to_string()];
    let fetched = get_offers(&pool, &codes).await;
    assert!(fetched.offers.is_empty());
    assert_eq!(fetched.errors[0].error_type, ErrorType::OfferNotFound);

    let deleted = delete_offers(&pool, &codes).await;
    assert!(deleted.deleted_offer_codes.is_empty());
    assert_eq!(deleted.errors[0].error_type, ErrorType::OfferNotFound);

    // And the coupon itself is untouched.
    let row = merchsync_db::get_coupon_by_code(&pool, "MERCHANT20")
        .await
        .expect("lookup")
        .expect("still present");
    assert!(!row.facebook_managed);
}

#[sqlx::test(migrations = "../../migrations")]
async fn enablement_requires_both_switches(pool: PgPool) {
    let err = check_offer_management_enabled(&pool)
        .await
        .expect_err("disabled by default");
    assert_eq!(err.error_type, ErrorType::OfferManagementDisabled);

    settings::put(&pool, settings::keys::OFFER_MANAGEMENT_ENABLED, "true")
        .await
        .expect("put");
    let err = check_offer_management_enabled(&pool)
        .await
        .expect_err("rollout switch still off");
    assert_eq!(err.error_type, ErrorType::OfferManagementDisabled);

    settings::put(&pool, settings::keys::OFFER_MANAGEMENT_ROLLOUT, "1")
        .await
        .expect("put");
    check_offer_management_enabled(&pool)
        .await
        .expect("both switches on");
}

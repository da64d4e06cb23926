use actix_web::{http::StatusCode, ResponseError};
use chrono::Utc;
use mongodb::bson::doc;
use printkart::db::{ensure_indexes, COUPONS, COUPON_REDEMPTIONS};
use printkart::models::{Coupon, CouponRedemption, CouponState};
use printkart::services::CouponService;

mod common;

const ALICE: &str = "64b7f0c2a1b2c3d4e5f60701";
const BOB: &str = "64b7f0c2a1b2c3d4e5f60702";

fn coupon(code: &str, max_uses: Option<i64>) -> Coupon {
    Coupon {
        id: None,
        code: code.to_string(),
        discount_percentage: 15,
        active: true,
        max_uses,
        used_count: 0,
        expires_at: None,
        created_at: Utc::now(),
    }
}

async fn used_count(db: &mongodb::Database, code: &str) -> i64 {
    db.collection::<Coupon>(COUPONS)
        .find_one(doc! { "code": code })
        .await
        .unwrap()
        .map(|c| c.used_count)
        .unwrap_or_default()
}

#[actix_web::test]
async fn test_coupon_is_single_use_per_user_and_capped() {
    let Some(db) = common::live_db().await else {
        return;
    };
    ensure_indexes(&db).await.unwrap();
    db.collection::<Coupon>(COUPONS)
        .insert_one(coupon("ONCE15", Some(1)))
        .await
        .unwrap();

    // Lowercase input is normalised
    let applied = CouponService::redeem(&db, ALICE, " once15 ").await.unwrap();
    assert_eq!(applied.code, "ONCE15");
    assert_eq!(applied.discount_percentage, 15);

    let again = CouponService::redeem(&db, ALICE, "ONCE15").await.unwrap_err();
    assert_eq!(again.status_code(), StatusCode::CONFLICT);

    let other = CouponService::redeem(&db, BOB, "ONCE15").await.unwrap_err();
    assert_eq!(other.status_code(), StatusCode::CONFLICT);
    assert_eq!(used_count(&db, "ONCE15").await, 1);

    // Bob's failed attempt must not leave a used record behind
    let bob_used = db
        .collection::<CouponRedemption>(COUPON_REDEMPTIONS)
        .count_documents(doc! { "user_id": BOB, "code": "ONCE15", "status": true })
        .await
        .unwrap();
    assert_eq!(bob_used, 0);

    let check = CouponService::check(&db, ALICE, "ONCE15").await.unwrap();
    assert_eq!(check.state, CouponState::Used);

    db.drop().await.unwrap();
}

#[actix_web::test]
async fn test_release_gives_the_code_back() {
    let Some(db) = common::live_db().await else {
        return;
    };
    ensure_indexes(&db).await.unwrap();
    db.collection::<Coupon>(COUPONS)
        .insert_one(coupon("RETRY20", None))
        .await
        .unwrap();

    CouponService::redeem(&db, ALICE, "RETRY20").await.unwrap();
    assert_eq!(used_count(&db, "RETRY20").await, 1);

    CouponService::release(&db, ALICE, "RETRY20").await;
    assert_eq!(used_count(&db, "RETRY20").await, 0);

    let check = CouponService::check(&db, ALICE, "RETRY20").await.unwrap();
    assert_eq!(check.state, CouponState::Available);
    CouponService::redeem(&db, ALICE, "RETRY20").await.unwrap();

    db.drop().await.unwrap();
}

#[actix_web::test]
async fn test_unknown_and_inactive_codes_are_404() {
    let Some(db) = common::live_db().await else {
        return;
    };
    ensure_indexes(&db).await.unwrap();
    let mut inactive = coupon("OFF10", None);
    inactive.active = false;
    db.collection::<Coupon>(COUPONS).insert_one(inactive).await.unwrap();

    let missing = CouponService::redeem(&db, ALICE, "NOPE").await.unwrap_err();
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

    let check = CouponService::check(&db, ALICE, "OFF10").await.unwrap();
    assert_eq!(check.state, CouponState::Invalid);

    db.drop().await.unwrap();
}

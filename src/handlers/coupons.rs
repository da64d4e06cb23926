use actix_web::{web, HttpResponse};
use mongodb::Database;
use serde_json::json;

use crate::errors::ApiResult;
use crate::models::{CouponCodeRequest, CouponState};
use crate::services::CouponService;

/// Check a code for the current user without applying it
pub async fn verify_coupon(
    db: web::Data<Database>,
    user_id: web::ReqData<String>,
    req: web::Json<CouponCodeRequest>,
) -> ApiResult<HttpResponse> {
    let check = CouponService::check(&db, &user_id, &req.code).await?;
    let discount = check.discount_percentage();

    let response = match (check.state, &check.coupon) {
        (CouponState::Available, Some(coupon)) => {
            CouponService::ensure_pending_record(&db, &user_id, coupon).await?;
            HttpResponse::Ok().json(json!({
                "success": true,
                "status": CouponState::Available,
                "code": check.code,
                "discountPercentage": discount,
                "message": "Coupon is valid",
            }))
        }
        (CouponState::Used, _) => HttpResponse::Ok().json(json!({
            "success": false,
            "status": CouponState::Used,
            "code": check.code,
            "discountPercentage": discount,
            "message": "Coupon already used",
        })),
        (CouponState::Exhausted, _) => HttpResponse::Conflict().json(json!({
            "error": "Coupon usage limit reached",
            "status": CouponState::Exhausted,
        })),
        _ => HttpResponse::NotFound().json(json!({
            "error": "Coupon code not found",
            "status": CouponState::Invalid,
        })),
    };
    Ok(response)
}

/// Apply a code once for the current user
pub async fn redeem_coupon(
    db: web::Data<Database>,
    user_id: web::ReqData<String>,
    req: web::Json<CouponCodeRequest>,
) -> ApiResult<HttpResponse> {
    let coupon = CouponService::redeem(&db, &user_id, &req.code).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "code": coupon.code,
        "discountPercentage": coupon.discount_percentage,
        "message": "Coupon applied",
    })))
}

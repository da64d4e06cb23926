/// Coupon checks and redemption.
///
/// A redemption first claims the per-user record (unique on user_id + code),
/// then bumps the global counter with a conditional update that respects
/// `max_uses`. If the counter update loses, the claim is rolled back, so the
/// counter moves exactly once per successful redemption.
use chrono::Utc;
use mongodb::bson::{doc, Bson};
use mongodb::Database;

use crate::db::{self, COUPONS, COUPON_REDEMPTIONS};
use crate::errors::{ApiError, ApiResult};
use crate::models::{normalize_code, timestamps, Coupon, CouponRedemption, CouponState};

pub struct CouponService;

/// Outcome of a coupon check
#[derive(Debug)]
pub struct CouponCheck {
    pub code: String,
    pub state: CouponState,
    pub coupon: Option<Coupon>,
    pub redemption: Option<CouponRedemption>,
}

impl CouponCheck {
    /// Discount the user gets (or got) with this code
    pub fn discount_percentage(&self) -> Option<i32> {
        match self.state {
            CouponState::Used => self.redemption.as_ref().map(|r| r.discount_percentage),
            _ => self.coupon.as_ref().map(|c| c.discount_percentage),
        }
    }
}

fn rejection(state: CouponState) -> ApiError {
    match state {
        CouponState::Invalid => ApiError::not_found("Coupon code not found"),
        CouponState::Used => ApiError::conflict("Coupon already used by this user"),
        CouponState::Exhausted => ApiError::conflict("Coupon usage limit reached"),
        CouponState::Available => ApiError::internal("Available coupon treated as rejection"),
    }
}

impl CouponService {
    pub async fn check(db: &Database, user_id: &str, raw_code: &str) -> ApiResult<CouponCheck> {
        let code = normalize_code(raw_code);
        if code.is_empty() {
            return Err(ApiError::bad_request("Coupon code is required"));
        }

        let coupon = db
            .collection::<Coupon>(COUPONS)
            .find_one(doc! { "code": &code })
            .await?;
        let redemption = db
            .collection::<CouponRedemption>(COUPON_REDEMPTIONS)
            .find_one(doc! { "user_id": user_id, "code": &code })
            .await?;

        let state = Coupon::evaluate(coupon.as_ref(), redemption.as_ref(), Utc::now());
        Ok(CouponCheck {
            code,
            state,
            coupon,
            redemption,
        })
    }

    /// Record that the user has seen an available code (not yet applied)
    pub async fn ensure_pending_record(db: &Database, user_id: &str, coupon: &Coupon) -> ApiResult<()> {
        let result = db
            .collection::<CouponRedemption>(COUPON_REDEMPTIONS)
            .update_one(
                doc! { "user_id": user_id, "code": &coupon.code },
                doc! { "$setOnInsert": {
                    "status": false,
                    "discount_percentage": coupon.discount_percentage,
                    "used_date": Bson::Null,
                } },
            )
            .upsert(true)
            .await;

        match result {
            Ok(_) => Ok(()),
            // A concurrent request created it first
            Err(e) if db::is_duplicate_key(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a code for a user; returns the coupon that was applied
    pub async fn redeem(db: &Database, user_id: &str, raw_code: &str) -> ApiResult<Coupon> {
        let check = Self::check(db, user_id, raw_code).await?;
        let coupon = match (check.state, check.coupon) {
            (CouponState::Available, Some(coupon)) => coupon,
            (state, _) => return Err(rejection(state)),
        };
        let code = check.code;
        let now = timestamps::now();

        let redemptions = db.collection::<CouponRedemption>(COUPON_REDEMPTIONS);
        let claim = redemptions
            .update_one(
                doc! { "user_id": user_id, "code": &code, "status": { "$ne": true } },
                doc! { "$set": {
                    "status": true,
                    "discount_percentage": coupon.discount_percentage,
                    "used_date": now,
                } },
            )
            .upsert(true)
            .await;

        match claim {
            Ok(_) => {}
            // The unique (user_id, code) index rejects the upsert when a redeemed record exists
            Err(e) if db::is_duplicate_key(&e) => return Err(rejection(CouponState::Used)),
            Err(e) => return Err(e.into()),
        }

        let counted = db
            .collection::<Coupon>(COUPONS)
            .update_one(
                doc! {
                    "code": &code,
                    "active": true,
                    "$or": [
                        { "max_uses": Bson::Null },
                        { "$expr": { "$lt": ["$used_count", "$max_uses"] } },
                    ],
                },
                doc! { "$inc": { "used_count": 1 } },
            )
            .await;

        let matched = match counted {
            Ok(result) => result.matched_count > 0,
            Err(e) => {
                Self::unclaim(db, user_id, &code).await;
                return Err(e.into());
            }
        };

        if !matched {
            Self::unclaim(db, user_id, &code).await;
            log::info!("Coupon {} hit its usage cap while user {} was redeeming", code, user_id);
            return Err(rejection(CouponState::Exhausted));
        }

        log::info!("🎟️ Coupon {} redeemed by user {}", code, user_id);
        Ok(Coupon {
            used_count: coupon.used_count + 1,
            ..coupon
        })
    }

    async fn unclaim(db: &Database, user_id: &str, code: &str) {
        if let Err(e) = db
            .collection::<CouponRedemption>(COUPON_REDEMPTIONS)
            .update_one(
                doc! { "user_id": user_id, "code": code, "status": true },
                doc! { "$set": { "status": false, "used_date": Bson::Null } },
            )
            .await
        {
            log::error!("Failed to roll back coupon claim {} for {}: {}", code, user_id, e);
        }
    }

    /// Undo a successful redemption, e.g. when the order that used it could not be saved
    pub async fn release(db: &Database, user_id: &str, code: &str) {
        let released = db
            .collection::<CouponRedemption>(COUPON_REDEMPTIONS)
            .update_one(
                doc! { "user_id": user_id, "code": code, "status": true },
                doc! { "$set": { "status": false, "used_date": Bson::Null } },
            )
            .await;

        match released {
            Ok(result) if result.modified_count > 0 => {
                if let Err(e) = db
                    .collection::<Coupon>(COUPONS)
                    .update_one(
                        doc! { "code": code, "used_count": { "$gt": 0 } },
                        doc! { "$inc": { "used_count": -1 } },
                    )
                    .await
                {
                    log::error!("Failed to decrement coupon {} usage: {}", code, e);
                }
                log::info!("Coupon {} released for user {}", code, user_id);
            }
            Ok(_) => {}
            Err(e) => log::error!("Failed to release coupon {} for {}: {}", code, user_id, e),
        }
    }
}

/// Discount codes and the per-user records that stop a code being reused
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub code: String,
    pub discount_percentage: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Global cap across all users (None = unlimited)
    pub max_uses: Option<i64>,
    #[serde(default)]
    pub used_count: i64,
    #[serde(default, with = "crate::models::timestamps::optional_bson_datetime")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::models::timestamps::bson_datetime")]
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponRedemption {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub code: String,
    /// true once the code has actually been applied
    pub status: bool,
    pub discount_percentage: i32,
    #[serde(default, with = "crate::models::timestamps::optional_bson_datetime")]
    pub used_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CouponState {
    Invalid,
    Exhausted,
    Used,
    Available,
}

/// Uppercased, trimmed form in which codes are stored
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

impl Coupon {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_uses.is_some_and(|max| self.used_count >= max)
    }

    /// What a redemption attempt by a user would run into
    pub fn evaluate(
        coupon: Option<&Coupon>,
        redemption: Option<&CouponRedemption>,
        now: DateTime<Utc>,
    ) -> CouponState {
        let coupon = match coupon {
            Some(c) if c.active && !c.is_expired(now) => c,
            _ => return CouponState::Invalid,
        };
        if redemption.is_some_and(|r| r.status) {
            return CouponState::Used;
        }
        if coupon.is_exhausted() {
            return CouponState::Exhausted;
        }
        CouponState::Available
    }
}

#[derive(Debug, Deserialize)]
pub struct CouponCodeRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    #[serde(default)]
    #[validate(length(min = 3, max = 32, message = "Code must be 3-32 characters"))]
    pub code: String,
    #[validate(range(min = 1, max = 100, message = "Discount must be between 1 and 100"))]
    pub discount_percentage: i32,
    #[validate(range(min = 1, message = "maxUses must be positive"))]
    pub max_uses: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponResponse {
    pub code: String,
    pub discount_percentage: i32,
    pub active: bool,
    pub max_uses: Option<i64>,
    pub used_count: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Coupon> for CouponResponse {
    fn from(c: Coupon) -> Self {
        Self {
            code: c.code,
            discount_percentage: c.discount_percentage,
            active: c.active,
            max_uses: c.max_uses,
            used_count: c.used_count,
            expires_at: c.expires_at,
            created_at: c.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon() -> Coupon {
        Coupon {
            id: None,
            code: "WELCOME10".to_string(),
            discount_percentage: 10,
            active: true,
            max_uses: Some(2),
            used_count: 0,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    fn redemption(status: bool) -> CouponRedemption {
        CouponRedemption {
            id: None,
            user_id: "u1".to_string(),
            code: "WELCOME10".to_string(),
            status,
            discount_percentage: 10,
            used_date: None,
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  welcome10 "), "WELCOME10");
    }

    #[test]
    fn test_unknown_inactive_or_expired_is_invalid() {
        let now = Utc::now();
        assert_eq!(Coupon::evaluate(None, None, now), CouponState::Invalid);

        let mut c = coupon();
        c.active = false;
        assert_eq!(Coupon::evaluate(Some(&c), None, now), CouponState::Invalid);

        let mut c = coupon();
        c.expires_at = Some(now - Duration::minutes(1));
        assert_eq!(Coupon::evaluate(Some(&c), None, now), CouponState::Invalid);
    }

    #[test]
    fn test_used_wins_over_exhausted() {
        let mut c = coupon();
        c.used_count = 2;
        let now = Utc::now();
        assert_eq!(Coupon::evaluate(Some(&c), Some(&redemption(true)), now), CouponState::Used);
        assert_eq!(Coupon::evaluate(Some(&c), Some(&redemption(false)), now), CouponState::Exhausted);
    }

    #[test]
    fn test_pending_record_is_still_available() {
        let now = Utc::now();
        let c = coupon();
        assert_eq!(Coupon::evaluate(Some(&c), Some(&redemption(false)), now), CouponState::Available);
        assert_eq!(Coupon::evaluate(Some(&c), None, now), CouponState::Available);
    }

    #[test]
    fn test_unlimited_coupon_never_exhausts() {
        let mut c = coupon();
        c.max_uses = None;
        c.used_count = 10_000;
        assert!(!c.is_exhausted());
    }
}

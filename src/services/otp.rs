/// OTP (One-Time Password) service for password resets
use rand::Rng;
use redis::AsyncCommands;

use crate::services::mailer::{self, Mailer};

const OTP_PREFIX: &str = "otp:reset:";
const ATTEMPTS_PREFIX: &str = "otp:attempts:";
const OTP_TTL_SECONDS: u64 = 600; // 10 minutes
/// Wrong guesses allowed per issued code
pub const MAX_VERIFY_ATTEMPTS: u64 = 5;

#[derive(Debug, Clone)]
pub struct OtpService {
    redis_url: String,
}

fn otp_key(email: &str) -> String {
    format!("{}{}", OTP_PREFIX, email.trim().to_lowercase())
}

fn attempts_key(email: &str) -> String {
    format!("{}{}", ATTEMPTS_PREFIX, email.trim().to_lowercase())
}

/// Whether the code must be burned after the `attempt`-th guess missed
fn burn_after_miss(attempt: u64) -> bool {
    attempt >= MAX_VERIFY_ATTEMPTS
}

impl OtpService {
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
        }
    }

    /// Generate a 6-digit OTP
    fn generate_otp() -> String {
        let mut rng = rand::rng();
        let otp: u32 = rng.random_range(100000..1000000);
        otp.to_string()
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, String> {
        let client = redis::Client::open(self.redis_url.as_str())
            .map_err(|e| format!("Redis connection error: {}", e))?;
        client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| format!("Redis connection error: {}", e))
    }

    /// Store a fresh code in Redis and email it
    pub async fn send_reset_otp(&self, mailer: &Mailer, email: &str) -> Result<(), String> {
        let otp = Self::generate_otp();

        let mut conn = self.connection().await?;
        // A new code starts with a clean attempt counter
        let _: () = redis::pipe()
            .atomic()
            .set_ex(otp_key(email), &otp, OTP_TTL_SECONDS)
            .ignore()
            .del(attempts_key(email))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| format!("Redis error: {}", e))?;

        log::info!("📧 Sending password reset OTP to {}", email);
        mailer.send(&mailer::password_reset_code(email, &otp)).await
    }

    /// Check a code; a matching code is consumed.
    ///
    /// Every guess counts against the code. After `MAX_VERIFY_ATTEMPTS`
    /// misses the code is deleted and a new one must be requested.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<bool, String> {
        let mut conn = self.connection().await?;
        let key = otp_key(email);
        let counter = attempts_key(email);

        let (attempt, _): (u64, i64) = redis::pipe()
            .atomic()
            .incr(&counter, 1)
            .expire(&counter, OTP_TTL_SECONDS as i64)
            .query_async(&mut conn)
            .await
            .map_err(|e| format!("Redis error: {}", e))?;
        if attempt > MAX_VERIFY_ATTEMPTS {
            log::warn!("🔒 Too many OTP attempts for {}", email);
            return Ok(false);
        }

        let stored_otp: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| format!("Redis error: {}", e))?;

        match stored_otp {
            Some(stored) if stored == otp.trim() => {
                // GETDEL hands the code to exactly one of any concurrent callers
                let taken: Option<String> = redis::cmd("GETDEL")
                    .arg(&key)
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| format!("Redis error: {}", e))?;
                if taken.as_deref() != Some(stored.as_str()) {
                    return Ok(false);
                }
                let _: () = conn
                    .del(&counter)
                    .await
                    .map_err(|e| format!("Redis error: {}", e))?;
                Ok(true)
            }
            Some(_) if burn_after_miss(attempt) => {
                log::warn!("🔒 OTP for {} burned after {} wrong attempts", email, attempt);
                let _: () = conn
                    .del(&key)
                    .await
                    .map_err(|e| format!("Redis error: {}", e))?;
                Ok(false)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_otp_is_six_digits() {
        for _ in 0..50 {
            let otp = OtpService::generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_key_is_normalised() {
        assert_eq!(otp_key(" Reader@Example.com "), "otp:reset:reader@example.com");
        assert_eq!(attempts_key("Reader@Example.com"), "otp:attempts:reader@example.com");
    }

    #[test]
    fn test_code_is_burned_after_max_misses() {
        assert!(!burn_after_miss(1));
        assert!(!burn_after_miss(MAX_VERIFY_ATTEMPTS - 1));
        assert!(burn_after_miss(MAX_VERIFY_ATTEMPTS));
        assert!(burn_after_miss(MAX_VERIFY_ATTEMPTS + 3));
    }
}

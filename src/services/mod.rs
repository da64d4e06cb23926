pub mod coupons;
pub mod file_kind;
pub mod mailer;
pub mod otp;
pub mod storage;

pub use coupons::{CouponCheck, CouponService};
pub use file_kind::FileKind;
pub use mailer::{Email, Mailer};
pub use otp::OtpService;
pub use storage::{BlobStore, LocalStore, StoredFile};

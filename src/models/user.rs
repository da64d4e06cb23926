use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::utils::is_mobile_number;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Vendor,
    Admin,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub fullname: String,
    pub mobile_number: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    pub birthday: Option<String>,
    pub location: Option<String>,
    pub college: Option<String>,
    pub year: Option<String>,
    pub branch: Option<String>,
    pub rollno: Option<String>,
    #[serde(with = "crate::models::timestamps::bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::models::timestamps::bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(fullname: String, mobile_number: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            fullname,
            mobile_number,
            email,
            password_hash,
            role: Role::User,
            birthday: None,
            location: None,
            college: None,
            year: None,
            branch: None,
            rollno: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|oid| oid.to_hex()).unwrap_or_default()
    }
}

pub(crate) fn validate_mobile(value: &str) -> Result<(), ValidationError> {
    if is_mobile_number(value.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("mobile").with_message("Mobile number must be 10 digits".into()))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub fullname: String,
    #[serde(default)]
    #[validate(custom(function = "validate_mobile"))]
    pub mobile_number: String,
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Identifier is required"))]
    pub identifier: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Identifier is required"))]
    pub identifier: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Identifier is required"))]
    pub identifier: String,
    #[serde(default)]
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Full name cannot be empty"))]
    pub fullname: Option<String>,
    pub birthday: Option<String>,
    pub location: Option<String>,
    pub college: Option<String>,
    pub year: Option<String>,
    pub branch: Option<String>,
    pub rollno: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub fullname: String,
    pub mobile_number: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollno: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id_hex(),
            fullname: user.fullname,
            mobile_number: user.mobile_number,
            email: user.email,
            role: user.role,
            birthday: user.birthday,
            location: user.location,
            college: user.college,
            year: user.year,
            branch: user.branch,
            rollno: user.rollno,
            created_at: user.created_at,
        }
    }
}

/// Contact block attached to listings and orders
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub fullname: String,
    pub mobile_number: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id_hex(),
            fullname: user.fullname.clone(),
            mobile_number: user.mobile_number.clone(),
            email: user.email.clone(),
        }
    }
}

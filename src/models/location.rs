use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::utils::{is_mobile_number, is_pincode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub name: String,
    pub mobilenumber: String,
    pub state: String,
    pub district: String,
    pub pincode: String,
    pub address: String,
    pub landmark: Option<String>,
}

fn validate_pincode(value: &str) -> Result<(), ValidationError> {
    if is_pincode(value.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("pincode").with_message("Pincode must be 6 digits".into()))
    }
}

fn validate_optional_mobile(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || is_mobile_number(value.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("mobile").with_message("Mobile number must be 10 digits".into()))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddLocationRequest {
    pub name: Option<String>,
    #[validate(custom(function = "validate_optional_mobile"))]
    pub mobilenumber: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "District is required"))]
    pub district: String,
    #[serde(default)]
    #[validate(custom(function = "validate_pincode"))]
    pub pincode: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 500, message = "Address is required"))]
    pub address: String,
    pub landmark: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub id: String,
    pub name: String,
    pub mobilenumber: String,
    pub state: String,
    pub district: String,
    pub pincode: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
}

impl From<Location> for LocationResponse {
    fn from(l: Location) -> Self {
        Self {
            id: l.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            name: l.name,
            mobilenumber: l.mobilenumber,
            state: l.state,
            district: l.district,
            pincode: l.pincode,
            address: l.address,
            landmark: l.landmark,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_fail_validation() {
        let req: AddLocationRequest = serde_json::from_str(r#"{"state":"AP","pincode":"12"}"#).unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("district"));
        assert!(fields.contains_key("address"));
        assert!(fields.contains_key("pincode"));
        assert!(!fields.contains_key("state"));
    }

    #[test]
    fn test_optional_mobile_is_checked_when_present() {
        let req: AddLocationRequest = serde_json::from_str(
            r#"{"state":"AP","district":"Visakhapatnam","pincode":"530045","address":"Street 1","mobilenumber":"123"}"#,
        )
        .unwrap();
        assert!(req.validate().unwrap_err().field_errors().contains_key("mobilenumber"));
    }
}

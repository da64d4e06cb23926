/// Login identifiers: users sign in with either their email or their 10-digit mobile number
use mongodb::bson::{doc, Document};
use validator::ValidateEmail;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Email(String),
    Phone(String),
}

impl Identifier {
    /// Returns `None` when the value is neither an email nor a 10-digit number
    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim();
        if is_mobile_number(value) {
            Some(Identifier::Phone(value.to_string()))
        } else if value.to_string().validate_email() {
            Some(Identifier::Email(value.to_lowercase()))
        } else {
            None
        }
    }

    /// Filter matching the user owning this identifier
    pub fn user_filter(&self) -> Document {
        match self {
            Identifier::Email(email) => doc! { "email": email },
            Identifier::Phone(phone) => doc! { "mobile_number": phone },
        }
    }
}

pub fn is_mobile_number(value: &str) -> bool {
    value.len() == 10 && value.chars().all(|c| c.is_ascii_digit())
}

pub fn is_pincode(value: &str) -> bool {
    value.len() == 6 && value.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_identifier_is_lowercased() {
        assert_eq!(
            Identifier::parse("  Reader@Example.COM "),
            Some(Identifier::Email("reader@example.com".to_string()))
        );
    }

    #[test]
    fn test_phone_identifier() {
        assert_eq!(
            Identifier::parse("9876543210"),
            Some(Identifier::Phone("9876543210".to_string()))
        );
        assert_eq!(
            Identifier::parse("9876543210").unwrap().user_filter(),
            doc! { "mobile_number": "9876543210" }
        );
    }

    #[test]
    fn test_rejects_other_formats() {
        assert_eq!(Identifier::parse("98765"), None);
        assert_eq!(Identifier::parse("not an email"), None);
        assert_eq!(Identifier::parse(""), None);
    }

    #[test]
    fn test_pincode() {
        assert!(is_pincode("530045"));
        assert!(!is_pincode("53004"));
        assert!(!is_pincode("53004a"));
    }
}

pub mod identifier;
pub mod jwt;
pub mod pagination;

pub use identifier::{is_mobile_number, is_pincode, Identifier};
pub use jwt::{create_token, verify_token, Claims, TokenError};
pub use pagination::{PaginatedResponse, PaginationParams};

use mongodb::bson::oid::ObjectId;

use crate::errors::ApiError;

/// Parse a path/body id, 400 on malformed input
pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("Invalid {} ID", what)))
}

/// Escape user supplied text before it is embedded in HTML emails
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

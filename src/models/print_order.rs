/// Print orders: an uploaded document plus payment proof, produced and delivered by the shop
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::validate_mobile;
use super::UserSummary;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColorMode {
    #[serde(rename = "b/w")]
    BlackWhite,
    #[serde(rename = "colour")]
    Colour,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sides {
    #[serde(rename = "1")]
    Single,
    #[serde(rename = "2")]
    Double,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Binding {
    #[default]
    None,
    Spiral,
    Stick,
    Soft,
    Book,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PrintOrderStatus {
    #[default]
    Pending,
    Accepted,
    Printing,
    Ready,
    Delivered,
    Rejected,
}

impl PrintOrderStatus {
    /// Pending -> Accepted -> Printing -> Ready -> Delivered, with Rejected
    /// reachable until printing starts
    pub fn can_transition_to(self, next: PrintOrderStatus) -> bool {
        use PrintOrderStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Rejected)
                | (Accepted, Printing)
                | (Accepted, Rejected)
                | (Printing, Ready)
                | (Ready, Delivered)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PrintOrderStatus::Delivered | PrintOrderStatus::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrintOrderStatus::Pending => "Pending",
            PrintOrderStatus::Accepted => "Accepted",
            PrintOrderStatus::Printing => "Printing",
            PrintOrderStatus::Ready => "Ready",
            PrintOrderStatus::Delivered => "Delivered",
            PrintOrderStatus::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: PrintOrderStatus,
    pub to: PrintOrderStatus,
    pub changed_by: String,
    pub note: Option<String>,
    #[serde(with = "crate::models::timestamps::bson_datetime")]
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResponse {
    pub from: PrintOrderStatus,
    pub to: PrintOrderStatus,
    pub changed_by: String,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl From<StatusChange> for StatusChangeResponse {
    fn from(change: StatusChange) -> Self {
        Self {
            from: change.from,
            to: change.to,
            changed_by: change.changed_by,
            note: change.note,
            changed_at: change.changed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintOrder {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
    pub file: String,
    pub file_key: String,
    pub file_name: String,
    pub payment_proof: String,
    pub payment_proof_key: String,
    pub transaction_id: Option<String>,
    pub color: ColorMode,
    pub sides: Sides,
    #[serde(default)]
    pub binding: Binding,
    pub copies: i32,
    pub address: Option<String>,
    pub college: Option<String>,
    pub year: Option<String>,
    pub section: Option<String>,
    pub description: Option<String>,
    pub coupon_code: Option<String>,
    pub discount_percentage: Option<i32>,
    #[serde(default)]
    pub status: PrintOrderStatus,
    #[serde(default)]
    pub history: Vec<StatusChange>,
    #[serde(with = "crate::models::timestamps::bson_datetime")]
    pub order_date: DateTime<Utc>,
}

/// Text fields of the print order multipart form
#[derive(Debug, Clone, Validate)]
pub struct NewPrintOrder {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(custom(function = "validate_mobile"))]
    pub mobile: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub color: ColorMode,
    pub sides: Sides,
    pub binding: Binding,
    #[validate(range(min = 1, max = 500, message = "Copies must be between 1 and 500"))]
    pub copies: i32,
    pub transaction_id: Option<String>,
    pub address: Option<String>,
    pub college: Option<String>,
    pub year: Option<String>,
    pub section: Option<String>,
    #[validate(length(max = 2000, message = "Description too long"))]
    pub description: Option<String>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePrintStatusRequest {
    pub status: PrintOrderStatus,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOrderResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub file: String,
    pub file_name: String,
    pub payment_proof: String,
    #[serde(rename = "transctionid")]
    pub transaction_id: String,
    pub color: ColorMode,
    pub sides: Sides,
    pub binding: Binding,
    pub copies: i32,
    pub address: String,
    pub college: String,
    pub year: String,
    pub section: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<i32>,
    pub status: PrintOrderStatus,
    pub history: Vec<StatusChangeResponse>,
    pub order_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

fn or_dash(value: Option<String>) -> String {
    value.filter(|v| !v.trim().is_empty()).unwrap_or_else(|| "-".to_string())
}

impl PrintOrderResponse {
    /// Missing contact details fall back to the customer's profile, then "-"
    pub fn new(order: PrintOrder, user: Option<UserSummary>) -> Self {
        let email = order
            .email
            .filter(|e| !e.trim().is_empty())
            .or_else(|| user.as_ref().map(|u| u.email.clone()));
        let mobile = Some(order.mobile)
            .filter(|m| !m.trim().is_empty())
            .or_else(|| user.as_ref().map(|u| u.mobile_number.clone()));
        let name = Some(order.name)
            .filter(|n| !n.trim().is_empty())
            .or_else(|| user.as_ref().map(|u| u.fullname.clone()));

        Self {
            id: order.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            name: or_dash(name),
            email: or_dash(email),
            mobile: or_dash(mobile),
            file: order.file,
            file_name: order.file_name,
            payment_proof: order.payment_proof,
            transaction_id: or_dash(order.transaction_id),
            color: order.color,
            sides: order.sides,
            binding: order.binding,
            copies: order.copies,
            address: or_dash(order.address),
            college: or_dash(order.college),
            year: or_dash(order.year),
            section: or_dash(order.section),
            description: or_dash(order.description),
            coupon_code: order.coupon_code,
            discount_percentage: order.discount_percentage,
            status: order.status,
            history: order.history.into_iter().map(Into::into).collect(),
            order_date: order.order_date,
            user,
        }
    }
}

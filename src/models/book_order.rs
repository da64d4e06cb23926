use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::UserSummary;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum BookOrderStatus {
    #[default]
    Ordered,
    Confirmed,
    Cancelled,
}

impl BookOrderStatus {
    pub fn can_transition_to(self, next: BookOrderStatus) -> bool {
        matches!(
            (self, next),
            (BookOrderStatus::Ordered, BookOrderStatus::Confirmed)
                | (BookOrderStatus::Ordered, BookOrderStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookOrder {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub buyer_id: String,
    pub seller_id: String,
    pub book_id: String,
    pub quantity: i32,
    pub price: f64,
    #[serde(default)]
    pub status: BookOrderStatus,
    pub review: Option<String>,
    #[serde(with = "crate::models::timestamps::bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::models::timestamps::bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl BookOrder {
    pub fn new(buyer_id: String, seller_id: String, book_id: String, price: f64) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            buyer_id,
            seller_id,
            book_id,
            quantity: 1,
            price,
            status: BookOrderStatus::Ordered,
            review: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyBookRequest {
    #[serde(default)]
    pub book_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Confirm,
    Cancel,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmOrderRequest {
    pub action: Option<String>,
}

impl ConfirmOrderRequest {
    pub fn parsed_action(&self) -> Option<OrderAction> {
        match self.action.as_deref().map(str::trim) {
            Some("confirm") => Some(OrderAction::Confirm),
            Some("cancel") => Some(OrderAction::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 1000, message = "Review must be 1-1000 characters"))]
    pub review: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookOrderResponse {
    pub id: String,
    pub book_id: String,
    pub book_name: Option<String>,
    pub price: f64,
    pub quantity: i32,
    pub status: BookOrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
}

impl BookOrderResponse {
    pub fn new(order: BookOrder, book_name: Option<String>) -> Self {
        Self {
            id: order.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            book_id: order.book_id,
            book_name,
            price: order.price,
            quantity: order.quantity,
            status: order.status,
            review: order.review,
            buyer: None,
            seller: None,
            created_at: order.created_at,
        }
    }

    pub fn with_parties(mut self, buyer: Option<UserSummary>, seller: Option<UserSummary>) -> Self {
        self.buyer = buyer;
        self.seller = seller;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_timestamps_are_stored_as_dates() {
        let order = BookOrder::new("b".into(), "s".into(), "book".into(), 90.0);
        let stored = mongodb::bson::to_document(&order).unwrap();
        assert!(stored.get_datetime("created_at").is_ok());
        assert!(stored.get_datetime("updated_at").is_ok());

        let json = serde_json::to_value(BookOrderResponse::new(order, None)).unwrap();
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_only_open_orders_move() {
        use BookOrderStatus::*;
        assert!(Ordered.can_transition_to(Confirmed));
        assert!(Ordered.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
    }

    #[test]
    fn test_action_parsing() {
        let req = ConfirmOrderRequest { action: Some("confirm".to_string()) };
        assert_eq!(req.parsed_action(), Some(OrderAction::Confirm));
        let req = ConfirmOrderRequest { action: Some("ship".to_string()) };
        assert_eq!(req.parsed_action(), None);
        let req = ConfirmOrderRequest { action: None };
        assert_eq!(req.parsed_action(), None);
    }
}

/// Book listings offered for sale or donation
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::UserSummary;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookCondition {
    New,
    #[serde(rename = "Like New")]
    LikeNew,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookCategory {
    #[serde(rename = "School Books")]
    SchoolBooks,
    #[serde(rename = "College & University Books")]
    CollegeBooks,
    #[serde(rename = "Competitive Exam Books")]
    CompetitiveExamBooks,
    #[serde(rename = "Fictional Books")]
    FictionalBooks,
    #[serde(rename = "Novels & Storybooks")]
    Novels,
    #[serde(rename = "Notes & Study Materials")]
    Notes,
    #[serde(rename = "Previous Year Papers")]
    PreviousYearPapers,
    #[serde(rename = "Non-Fiction Books")]
    NonFiction,
    #[serde(rename = "GATE")]
    Gate,
    #[serde(rename = "CAT")]
    Cat,
    #[serde(rename = "IIT JEE")]
    IitJee,
    #[serde(rename = "PYQ books")]
    PyqBooks,
    #[serde(rename = "others")]
    Others,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SellType {
    Sell,
    Donate,
}

/// Admin moderation state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ModerationStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// Stock state of an accepted listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StockStatus {
    #[default]
    Instock,
    Ordered,
    Soldout,
    Rejected,
}

impl ModerationStatus {
    /// Whether an admin may move a listing from `self` to `next` given its stock state
    pub fn can_transition_to(self, next: ModerationStatus, stock: StockStatus) -> bool {
        use ModerationStatus::*;
        match (self, next) {
            (Pending, Accepted) | (Pending, Rejected) => true,
            // An accepted listing can still be pulled as long as nobody bought it
            (Accepted, Rejected) => stock == StockStatus::Instock,
            _ => false,
        }
    }
}

impl StockStatus {
    /// Transitions the owner may apply by hand.
    ///
    /// `Ordered` is entered by a purchase and left by confirming or cancelling
    /// that order, never by hand.
    pub fn owner_can_set(self, next: StockStatus) -> bool {
        use StockStatus::*;
        matches!((self, next), (Instock, Soldout) | (Soldout, Instock))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub image: String,
    /// Storage key of the image, used for cleanup
    #[serde(default)]
    pub image_key: String,
    pub price: f64,
    pub condition: BookCondition,
    pub description: String,
    pub location: String,
    pub category: BookCategory,
    pub subcategory: Option<String>,
    pub selltype: SellType,
    pub user_id: String,
    #[serde(default)]
    pub status: ModerationStatus,
    pub updated_price: Option<f64>,
    #[serde(default)]
    pub soldstatus: StockStatus,
    #[serde(with = "crate::models::timestamps::bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::models::timestamps::bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    pub fn is_available(&self) -> bool {
        self.status == ModerationStatus::Accepted && self.soldstatus == StockStatus::Instock
    }

    /// Price buyers pay: the admin adjusted price wins
    pub fn effective_price(&self) -> f64 {
        self.updated_price.unwrap_or(self.price)
    }
}

/// Text fields of the sell-book multipart form
#[derive(Debug, Clone, Validate)]
pub struct NewListing {
    #[validate(length(min = 1, max = 200, message = "Book name is required"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
    pub condition: BookCondition,
    #[validate(length(min = 1, max = 1000, message = "Description must be 1-1000 characters"))]
    pub description: String,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    pub category: BookCategory,
    pub subcategory: Option<String>,
    pub selltype: SellType,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    pub soldstatus: StockStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerateListingRequest {
    pub status: ModerationStatus,
    pub updated_price: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub id: String,
    pub name: String,
    pub image: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_price: Option<f64>,
    pub condition: BookCondition,
    pub description: String,
    pub location: String,
    pub category: BookCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    pub sell_type: SellType,
    pub status: ModerationStatus,
    pub soldstatus: StockStatus,
    pub seller: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
}

impl ListingResponse {
    pub fn new(listing: Listing, seller: Option<UserSummary>) -> Self {
        Self {
            id: listing.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            name: listing.name,
            image: listing.image,
            price: listing.price,
            updated_price: listing.updated_price,
            condition: listing.condition,
            description: listing.description,
            location: listing.location,
            category: listing.category,
            subcategory: listing.subcategory,
            sell_type: listing.selltype,
            status: listing.status,
            soldstatus: listing.soldstatus,
            seller,
            created_at: listing.created_at,
        }
    }
}

/// Parse one of the fixed enumerations from a form value ("Like New" -> LikeNew)
pub fn parse_form_enum<T: serde::de::DeserializeOwned>(value: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_string())).ok()
}

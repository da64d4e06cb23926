/// Timestamps are stored as BSON dates so they sort chronologically
use chrono::{DateTime, Utc};
use mongodb::bson;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime as bson_datetime;

/// `Option<DateTime<Utc>>` counterpart of [`bson_datetime`]
pub mod optional_bson_datetime {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        value.map(bson::DateTime::from_chrono).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<bson::DateTime>::deserialize(deserializer)?.map(bson::DateTime::to_chrono))
    }
}

/// Current time as a BSON date, for `$set` updates
pub fn now() -> bson::DateTime {
    bson::DateTime::now()
}

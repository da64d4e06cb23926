/// Previous-year exam papers, loaded into the `papers` collection by the shop
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub subject: String,
    pub branch: Option<String>,
    pub college: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub sem: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub year: Option<String>,
    pub file: String,
}

/// Papers are imported by hand, so `year` and `sem` show up both as text and as numbers
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<mongodb::bson::Bson>::deserialize(deserializer)?;
    Ok(match value {
        Some(mongodb::bson::Bson::String(s)) => Some(s),
        Some(mongodb::bson::Bson::Int32(n)) => Some(n.to_string()),
        Some(mongodb::bson::Bson::Int64(n)) => Some(n.to_string()),
        Some(mongodb::bson::Bson::Double(n)) => Some((n as i64).to_string()),
        _ => None,
    })
}

#[derive(Debug, Serialize)]
pub struct PaperResponse {
    pub id: String,
    pub subject: String,
    pub branch: String,
    pub college: Option<String>,
    pub sem: Option<String>,
    pub year: Option<String>,
    pub file_url: String,
}

impl From<Paper> for PaperResponse {
    fn from(p: Paper) -> Self {
        Self {
            id: p.id.to_hex(),
            subject: p.subject,
            branch: p
                .branch
                .filter(|b| !b.trim().is_empty())
                .unwrap_or_else(|| "N/A".to_string()),
            college: p.college,
            sem: p.sem,
            year: p.year,
            file_url: p.file,
        }
    }
}

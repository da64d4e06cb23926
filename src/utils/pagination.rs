/// Page/sort query parameters for list endpoints
use mongodb::bson::{doc, Document};
use serde::Deserialize;

/// Deepest page a client may request; larger values are clamped.
pub const MAX_PAGE: i64 = 10_000;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl PaginationParams {
    /// Get the page number (defaults to 1, clamped to 1..=MAX_PAGE)
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    /// Get items per page (defaults to 20, min 1, max 100)
    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }

    pub fn skip(&self) -> u64 {
        let offset = (self.page() - 1).saturating_mul(self.per_page());
        u64::try_from(offset).unwrap_or(0)
    }

    pub fn limit(&self) -> i64 {
        self.per_page()
    }

    /// 1 for asc, -1 for desc (default)
    pub fn sort_direction(&self) -> i32 {
        match self.sort_order.as_deref() {
            Some("asc") => 1,
            _ => -1,
        }
    }

    /// Sort document restricted to whitelisted fields.
    ///
    /// `field_map` maps public names (e.g. "price") to stored field names;
    /// unknown names fall back to `default_field`.
    pub fn build_sort_doc(&self, default_field: &str, field_map: &[(&str, &str)]) -> Document {
        let requested = self.sort_by.as_deref().unwrap_or(default_field);
        let db_field = field_map
            .iter()
            .find(|(public, _)| *public == requested)
            .map(|(_, stored)| *stored)
            .unwrap_or(default_field);

        doc! { db_field: self.sort_direction() }
    }

    pub fn calculate_total_pages(&self, total: u64) -> i64 {
        let per_page = self.per_page() as u64;
        total.div_ceil(per_page) as i64
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PaginatedResponse<T> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
    pub total: u64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
            total,
            page: params.page(),
            per_page: params.per_page(),
            total_pages: params.calculate_total_pages(total),
        }
    }
}

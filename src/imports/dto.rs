use serde::{Deserialize, Serialize};

use super::repo_types::ImportedUser;
use super::validation::RowError;

#[derive(Debug, Deserialize)]
pub struct ProcessCsvRequest {
    #[serde(rename = "csvContent")]
    pub csv_content: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessCsvResponse {
    pub success: bool,
    pub users: Vec<ImportedUser>,
    pub count: usize,
    /// Rows that were skipped, with the reason.
    pub errors: Vec<RowError>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 20 }

impl Pagination {
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, 100), self.offset.max(0))
    }
}

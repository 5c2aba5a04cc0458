use serde::{Deserialize, Serialize};

use super::repo_types::Recipe;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}
fn default_limit() -> i64 {
    10
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

impl Pagination {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.skip < 0 {
            return Err(AppError::Validation("skip must be >= 0".into()));
        }
        if self.limit <= 0 {
            return Err(AppError::Validation("limit must be > 0".into()));
        }
        Ok(())
    }
}

/// Kept flat rather than embedding `Pagination`: urlencoded values are
/// strings and do not survive `#[serde(flatten)]` into integer fields.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl SearchParams {
    pub fn page(&self) -> Pagination {
        Pagination::new(self.skip, self.limit)
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub recipes: Vec<Recipe>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.skip, 0);
        assert_eq!(p.limit, 10);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn pagination_bounds() {
        assert!(Pagination::new(-1, 10).validate().is_err());
        assert!(Pagination::new(0, 0).validate().is_err());
        assert!(Pagination::new(5, 1).validate().is_ok());
    }
}

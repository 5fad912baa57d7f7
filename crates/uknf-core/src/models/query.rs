use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::report::ValidationStatus;

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 500;

/// Filter for listing the reports of one entity.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportListQuery {
    pub status: Option<ValidationStatus>,
    #[serde(default)]
    pub include_archived: bool,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIST_LIMIT
}

impl Default for ReportListQuery {
    fn default() -> Self {
        Self {
            status: None,
            include_archived: false,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl ReportListQuery {
    /// Limit clamped to `1..=MAX_LIST_LIMIT`, offset to non-negative.
    pub fn normalized(&self) -> Self {
        Self {
            status: self.status,
            include_archived: self.include_archived,
            limit: self.limit.clamp(1, MAX_LIST_LIMIT),
            offset: self.offset.max(0),
        }
    }
}

/// Report counts for one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportStats {
    pub entity_id: i64,
    pub total: i64,
    pub active: i64,
    pub archived: i64,
    pub by_status: HashMap<ValidationStatus, i64>,
}

impl ReportStats {
    pub fn new(entity_id: i64) -> Self {
        Self {
            entity_id,
            ..Default::default()
        }
    }

    pub fn record(&mut self, status: ValidationStatus, is_archived: bool, count: i64) {
        self.total += count;
        if is_archived {
            self.archived += count;
        } else {
            self.active += count;
        }
        *self.by_status.entry(status).or_insert(0) += count;
    }

    pub fn count(&self, status: ValidationStatus) -> i64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_clamps_limits() {
        let query = ReportListQuery {
            limit: 10_000,
            offset: -3,
            ..Default::default()
        }
        .normalized();
        assert_eq!(query.limit, MAX_LIST_LIMIT);
        assert_eq!(query.offset, 0);

        let query = ReportListQuery {
            limit: 0,
            ..Default::default()
        };
        assert_eq!(query.normalized().limit, 1);
    }

    #[test]
    fn test_stats_record() {
        let mut stats = ReportStats::new(1001);
        stats.record(ValidationStatus::Successful, false, 2);
        stats.record(ValidationStatus::Successful, true, 1);
        stats.record(ValidationStatus::Working, false, 1);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.active, 3);
        assert_eq!(stats.archived, 1);
        assert_eq!(stats.count(ValidationStatus::Successful), 3);
        assert_eq!(stats.count(ValidationStatus::TimeoutError), 0);
    }
}

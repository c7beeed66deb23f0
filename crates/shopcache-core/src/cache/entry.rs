use chrono::{DateTime, Utc};

use crate::resource::{Dataset, ResourceKey};

/// The latest value for one resource and when it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Dataset,
    /// `None` until the first successful load
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn empty(key: ResourceKey) -> Self {
        Self {
            data: Dataset::empty(key),
            fetched_at: None,
        }
    }

    pub fn new(data: Dataset) -> Self {
        Self {
            data,
            fetched_at: Some(Utc::now()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.fetched_at.is_some()
    }

    pub fn age_minutes(&self) -> Option<i64> {
        self.fetched_at.map(|at| (Utc::now() - at).num_minutes())
    }

    pub fn age_display(&self) -> String {
        let Some(minutes) = self.age_minutes() else {
            return "never".to_string();
        };
        if minutes < 1 {
            // Includes clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

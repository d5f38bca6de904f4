//! Budget usage snapshots.

use serde::Serialize;

/// Context usage information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextUsage {
    /// Tokens held by the transcript
    pub used: usize,
    /// Tokens left before the reserve
    pub available: usize,
    /// Configured maximum
    pub total: usize,
    /// Percentage used (0-100)
    pub percentage: f64,
    /// Warning level derived from `percentage`
    pub warning_level: WarningLevel,
}

impl ContextUsage {
    /// Create context usage from token counts
    pub fn new(used: usize, total: usize, reserve: usize) -> Self {
        let available = total.saturating_sub(used).saturating_sub(reserve);
        let percentage = if total == 0 {
            100.0
        } else {
            (used as f64 / total as f64) * 100.0
        };

        Self {
            used,
            available,
            total,
            percentage,
            warning_level: WarningLevel::from_percentage(percentage),
        }
    }

    /// Check if approaching limit
    pub fn is_approaching_limit(&self) -> bool {
        self.percentage >= 70.0
    }

    /// Check if critical
    pub fn is_critical(&self) -> bool {
        matches!(self.warning_level, WarningLevel::Critical)
    }
}

/// Warning level for context usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    /// Below 50%
    None,
    /// 50-70%
    Low,
    /// 70-85%
    Medium,
    /// 85-95%
    High,
    /// 95% and above
    Critical,
}

impl WarningLevel {
    fn from_percentage(percentage: f64) -> Self {
        if percentage >= 95.0 {
            WarningLevel::Critical
        } else if percentage >= 85.0 {
            WarningLevel::High
        } else if percentage >= 70.0 {
            WarningLevel::Medium
        } else if percentage >= 50.0 {
            WarningLevel::Low
        } else {
            WarningLevel::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_levels() {
        assert_eq!(ContextUsage::new(10, 100, 20).warning_level, WarningLevel::None);
        assert_eq!(ContextUsage::new(50, 100, 20).warning_level, WarningLevel::Low);
        assert_eq!(ContextUsage::new(70, 100, 20).warning_level, WarningLevel::Medium);
        assert_eq!(ContextUsage::new(85, 100, 20).warning_level, WarningLevel::High);
        assert!(ContextUsage::new(95, 100, 20).is_critical());
    }

    #[test]
    fn test_available_saturates() {
        let usage = ContextUsage::new(90, 100, 20);
        assert_eq!(usage.available, 0);
        assert!(usage.is_approaching_limit());

        let usage = ContextUsage::new(30, 100, 20);
        assert_eq!(usage.available, 50);
        assert!(!usage.is_approaching_limit());
    }

    #[test]
    fn test_zero_total() {
        let usage = ContextUsage::new(0, 0, 0);
        assert_eq!(usage.available, 0);
        assert!(usage.is_critical());
    }
}

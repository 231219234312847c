//! Task priority constants.

pub const PRIORITY_LOW: &str = "low";
pub const PRIORITY_MEDIUM: &str = "medium";
pub const PRIORITY_HIGH: &str = "high";

/// All accepted task priorities.
pub const PRIORITIES: &[&str] = &[PRIORITY_LOW, PRIORITY_MEDIUM, PRIORITY_HIGH];

/// Check whether `priority` is a known task priority.
pub fn is_valid_priority(priority: &str) -> bool {
    PRIORITIES.contains(&priority)
}

//! Shared builders for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::task::{Assignee, TaskNode, TimeEntry};

/// Fixed reference instant so tests are reproducible.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
}

pub fn assignee(id: &str) -> Assignee {
    Assignee {
        id: id.to_string(),
        name: format!("User {id}"),
        email: format!("{id}@example.com"),
    }
}

/// A valid task with a far-off deadline and one assignee. `created_at` is
/// offset by the id's first byte so alphabetical ids sort as creation order.
pub fn task(id: &str, project_id: &str, parent_id: Option<&str>, percentage: u32) -> TaskNode {
    let created = base_time() + Duration::seconds(id.as_bytes().first().copied().unwrap_or(0) as i64);
    TaskNode {
        id: id.to_string(),
        project_id: project_id.to_string(),
        parent_id: parent_id.map(str::to_string),
        name: format!("Task {id}"),
        description: String::new(),
        percentage,
        hours: None,
        cost_per_hour: None,
        assigned_to: vec![assignee("u1")],
        deadline: base_time() + Duration::days(365),
        completed: false,
        outsource_team_id: None,
        time_entries: Vec::new(),
        created_at: created,
        updated_at: created,
    }
}

pub fn entry(user_id: &str, user_name: &str, minutes: f64) -> TimeEntry {
    TimeEntry {
        id: format!("te-{user_id}"),
        user_id: user_id.to_string(),
        user_name: user_name.to_string(),
        start_time: base_time(),
        duration: minutes,
    }
}

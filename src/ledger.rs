//! Per-user time tracking on tasks.
//!
//! A user has one cumulative [`TimeEntry`] per task; timer stops and manual
//! additions both increment its `duration`. The "timer is running" fact is a
//! durable marker keyed by (task, user) owned by the [`TimerStore`]
//! collaborator, so a page reload or process restart loses nothing: the
//! current total is always `cumulative + (now - started_at)`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::{TaskStore, TimerStore};
use crate::task::{TaskNode, TimeEntry};

/// Durable marker recording that a user's timer is running on a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTimer {
    pub started_at: DateTime<Utc>,
}

/// Begin a timer for a user on a task. Fails with `TimerAlreadyActive` when
/// a marker already exists for the pair.
pub fn start_timer<S: TimerStore>(
    store: &mut S,
    task_id: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<ActiveTimer> {
    if store.active_timer(task_id, user_id)?.is_some() {
        return Err(Error::TimerAlreadyActive {
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
        });
    }
    let marker = ActiveTimer { started_at: now };
    store.set_active_timer(task_id, user_id, marker.clone())?;
    Ok(marker)
}

/// Stop a running timer, folding the elapsed wall-clock minutes into the
/// user's cumulative entry on the task. Fails with `NoActiveTimer` when no
/// marker exists.
///
/// The merged task is persisted before the marker is cleared: a failed save
/// leaves the timer still running, so the elapsed time survives and the
/// stop can simply be retried.
pub fn stop_timer<S: TimerStore + TaskStore>(
    store: &mut S,
    task: &mut TaskNode,
    user_id: &str,
    user_name: &str,
    now: DateTime<Utc>,
) -> Result<TimeEntry> {
    let marker = store
        .active_timer(&task.id, user_id)?
        .ok_or_else(|| Error::NoActiveTimer {
            task_id: task.id.clone(),
            user_id: user_id.to_string(),
        })?;
    let elapsed = elapsed_minutes(marker.started_at, now);
    let entry = merge_minutes(task, user_id, user_name, elapsed, now);
    store.save_task(task)?;
    store.clear_active_timer(&task.id, user_id)?;
    Ok(entry)
}

/// Record minutes entered by hand. Fails with `InvalidDuration` for
/// non-positive amounts.
pub fn add_manual_time(
    task: &mut TaskNode,
    user_id: &str,
    user_name: &str,
    minutes: f64,
    now: DateTime<Utc>,
) -> Result<TimeEntry> {
    if minutes <= 0.0 {
        return Err(Error::InvalidDuration(minutes));
    }
    Ok(merge_minutes(task, user_id, user_name, minutes, now))
}

/// Total minutes per user name, for reporting. Zero-duration entries are
/// skipped so a freshly-started timer does not show up as a ledger row.
pub fn aggregate_by_user(entries: &[TimeEntry]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for entry in entries {
        if entry.duration <= 0.0 {
            continue;
        }
        *totals.entry(entry.user_name.clone()).or_insert(0.0) += entry.duration;
    }
    totals
}

/// Current total minutes for a user on a task: the cumulative entry plus the
/// live elapsed span when a timer marker exists. Works after restarts since
/// both inputs are durable.
pub fn running_total(
    task: &TaskNode,
    active: Option<&ActiveTimer>,
    user_id: &str,
    now: DateTime<Utc>,
) -> f64 {
    let cumulative = task
        .entry_for_user(user_id)
        .map(|e| e.duration)
        .unwrap_or(0.0);
    match active {
        Some(marker) => cumulative + elapsed_minutes(marker.started_at, now),
        None => cumulative,
    }
}

fn elapsed_minutes(start: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - start).num_milliseconds().max(0) as f64 / 60_000.0
}

fn merge_minutes(
    task: &mut TaskNode,
    user_id: &str,
    user_name: &str,
    minutes: f64,
    now: DateTime<Utc>,
) -> TimeEntry {
    task.updated_at = now;
    if let Some(entry) = task
        .time_entries
        .iter_mut()
        .find(|e| e.user_id == user_id)
    {
        entry.duration += minutes;
        entry.start_time = now;
        return entry.clone();
    }
    let entry = TimeEntry {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        user_name: user_name.to_string(),
        start_time: now,
        duration: minutes,
    };
    task.time_entries.push(entry.clone());
    entry
}

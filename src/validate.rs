//! Allocation validation for task creation and edits.
//!
//! Sibling tasks share two budgets: at most 100 percentage points between
//! them, and, when the parent declares `hours`, the parent's hour total.
//! All checks run against a sibling snapshot taken immediately before the
//! write; the candidate's own id is excluded from the sums so an existing
//! task never blocks itself on re-validation and can be re-sized without
//! being zeroed first.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::task::TaskNode;

/// Percentage budget still open among `siblings`, excluding `exclude_id`
/// (the task being created or edited). Saturates at zero for display.
pub fn available_percentage(siblings: &[&TaskNode], exclude_id: &str) -> u32 {
    let allocated: u32 = siblings
        .iter()
        .filter(|t| t.id != exclude_id)
        .map(|t| t.percentage)
        .sum();
    100u32.saturating_sub(allocated)
}

/// Hour budget still open under a parent declaring `parent_hours`, excluding
/// `exclude_id`. Floored at zero for display.
pub fn available_hours(parent_hours: f64, siblings: &[&TaskNode], exclude_id: &str) -> f64 {
    let allocated: f64 = siblings
        .iter()
        .filter(|t| t.id != exclude_id)
        .filter_map(|t| t.hours)
        .sum();
    (parent_hours - allocated).max(0.0)
}

/// Validate a candidate task against its sibling set and parent constraints.
///
/// `siblings` is the current snapshot of tasks sharing the candidate's
/// parent; it may or may not already contain the candidate itself (it does on
/// edit, not on create) — either way the candidate's id is excluded from the
/// budget sums. `parent` is `None` for root-level tasks, in which case
/// `project_due_date` is the deadline ceiling.
///
/// Pure function: no side effects, safe to call speculatively from a UI.
pub fn validate_allocation(
    candidate: &TaskNode,
    siblings: &[&TaskNode],
    parent: Option<&TaskNode>,
    project_due_date: DateTime<Utc>,
) -> Result<()> {
    if candidate.name.trim().is_empty() {
        return Err(Error::MissingRequiredField("name"));
    }
    if candidate.assigned_to.is_empty() {
        return Err(Error::MissingRequiredField("assigned_to"));
    }
    if candidate.percentage == 0 {
        return Err(Error::MissingRequiredField("percentage"));
    }

    let available = available_percentage(siblings, &candidate.id);
    if candidate.percentage > available {
        return Err(Error::PercentageExceeded {
            requested: candidate.percentage,
            available,
        });
    }

    if let (Some(parent), Some(requested)) = (parent, candidate.hours) {
        if let Some(parent_hours) = parent.hours {
            let available = available_hours(parent_hours, siblings, &candidate.id);
            if requested > available {
                return Err(Error::HoursExceeded {
                    requested,
                    available,
                });
            }
        }
    }

    let ceiling = parent.map(|p| p.deadline).unwrap_or(project_due_date);
    if candidate.deadline > ceiling {
        return Err(Error::DeadlineOutOfRange {
            deadline: candidate.deadline,
            ceiling,
        });
    }

    Ok(())
}

/// Validate that a task's direct children still fit inside it, for edits
/// that shrink the task's own budgets. A parent's hour budget must cover the
/// children's current hour sum, and no child deadline may outlive the
/// parent's. Creation never needs this (new tasks have no children); without
/// it an edit could leave the tree in a state no creation path can reach.
pub fn validate_children_fit(candidate: &TaskNode, children: &[&TaskNode]) -> Result<()> {
    if let Some(parent_hours) = candidate.hours {
        let allocated: f64 = children.iter().filter_map(|c| c.hours).sum();
        if allocated > parent_hours {
            return Err(Error::HoursExceeded {
                requested: allocated,
                available: parent_hours,
            });
        }
    }
    for child in children {
        if child.deadline > candidate.deadline {
            return Err(Error::DeadlineOutOfRange {
                deadline: child.deadline,
                ceiling: candidate.deadline,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{base_time, task};
    use chrono::Duration;

    fn due() -> DateTime<Utc> {
        base_time() + Duration::days(400)
    }

    #[test]
    fn percentage_within_budget_passes() {
        // succeeds iff p <= 100 - sum(others)
        let a = task("a", "p1", None, 60);
        let b = task("b", "p1", None, 40);
        assert!(validate_allocation(&b, &[&a], None, due()).is_ok());
    }

    #[test]
    fn percentage_over_budget_fails() {
        // root at 60, second sibling asks 50, only 40 available.
        let a = task("a", "p1", None, 60);
        let b = task("b", "p1", None, 50);
        let err = validate_allocation(&b, &[&a], None, due()).unwrap_err();
        match err {
            Error::PercentageExceeded {
                requested,
                available,
            } => {
                assert_eq!(requested, 50);
                assert_eq!(available, 40);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn existing_task_never_blocks_itself() {
        // re-validating an unmodified task against a snapshot that
        // includes itself succeeds; its own value is added back.
        let a = task("a", "p1", None, 60);
        let b = task("b", "p1", None, 40);
        assert!(validate_allocation(&b, &[&a, &b], None, due()).is_ok());
        assert_eq!(available_percentage(&[&a, &b], "b"), 40);
    }

    #[test]
    fn hour_budget_enforced_against_parent() {
        // parent 10h, sibling A 6h, B asks 5h with 4h left.
        let mut parent = task("p", "p1", None, 100);
        parent.hours = Some(10.0);
        let mut a = task("a", "p1", Some("p"), 40);
        a.hours = Some(6.0);
        let mut b = task("b", "p1", Some("p"), 40);
        b.hours = Some(5.0);
        let err = validate_allocation(&b, &[&a], Some(&parent), due()).unwrap_err();
        match err {
            Error::HoursExceeded {
                requested,
                available,
            } => {
                assert_eq!(requested, 5.0);
                assert_eq!(available, 4.0);
            }
            other => panic!("unexpected error: {other}"),
        }

        b.hours = Some(4.0);
        assert!(validate_allocation(&b, &[&a], Some(&parent), due()).is_ok());
    }

    #[test]
    fn hours_unconstrained_without_parent_budget() {
        let parent = task("p", "p1", None, 100);
        let mut b = task("b", "p1", Some("p"), 40);
        b.hours = Some(500.0);
        assert!(validate_allocation(&b, &[], Some(&parent), due()).is_ok());
    }

    #[test]
    fn deadline_must_fit_parent_ceiling() {
        let mut parent = task("p", "p1", None, 100);
        parent.deadline = base_time() + Duration::days(30);
        let mut child = task("c", "p1", Some("p"), 50);
        child.deadline = base_time() + Duration::days(31);
        assert!(matches!(
            validate_allocation(&child, &[], Some(&parent), due()),
            Err(Error::DeadlineOutOfRange { .. })
        ));

        child.deadline = parent.deadline;
        assert!(validate_allocation(&child, &[], Some(&parent), due()).is_ok());
    }

    #[test]
    fn root_deadline_capped_by_project_due_date() {
        let mut a = task("a", "p1", None, 50);
        a.deadline = due() + Duration::days(1);
        assert!(matches!(
            validate_allocation(&a, &[], None, due()),
            Err(Error::DeadlineOutOfRange { .. })
        ));
    }

    #[test]
    fn required_fields_checked_first() {
        let mut a = task("a", "p1", None, 50);
        a.name = "  ".into();
        assert!(matches!(
            validate_allocation(&a, &[], None, due()),
            Err(Error::MissingRequiredField("name"))
        ));

        let mut b = task("b", "p1", None, 50);
        b.assigned_to.clear();
        assert!(matches!(
            validate_allocation(&b, &[], None, due()),
            Err(Error::MissingRequiredField("assigned_to"))
        ));

        let c = task("c", "p1", None, 0);
        assert!(matches!(
            validate_allocation(&c, &[], None, due()),
            Err(Error::MissingRequiredField("percentage"))
        ));
    }

    #[test]
    fn children_must_fit_a_shrunk_hour_budget() {
        // parent edited down to 5h while children already hold 6h + 4h.
        let mut parent = task("p", "p1", None, 100);
        parent.hours = Some(5.0);
        let mut a = task("a", "p1", Some("p"), 50);
        a.hours = Some(6.0);
        let mut b = task("b", "p1", Some("p"), 50);
        b.hours = Some(4.0);
        let err = validate_children_fit(&parent, &[&a, &b]).unwrap_err();
        match err {
            Error::HoursExceeded {
                requested,
                available,
            } => {
                assert_eq!(requested, 10.0);
                assert_eq!(available, 5.0);
            }
            other => panic!("unexpected error: {other}"),
        }

        parent.hours = Some(10.0);
        assert!(validate_children_fit(&parent, &[&a, &b]).is_ok());
    }

    #[test]
    fn children_must_fit_a_shrunk_deadline() {
        let mut parent = task("p", "p1", None, 100);
        let mut child = task("c", "p1", Some("p"), 50);
        child.deadline = base_time() + Duration::days(60);
        parent.deadline = base_time() + Duration::days(30);
        assert!(matches!(
            validate_children_fit(&parent, &[&child]),
            Err(Error::DeadlineOutOfRange { .. })
        ));

        parent.deadline = child.deadline;
        assert!(validate_children_fit(&parent, &[&child]).is_ok());
    }

    #[test]
    fn available_hours_floors_at_zero() {
        let mut a = task("a", "p1", Some("p"), 40);
        a.hours = Some(12.0);
        assert_eq!(available_hours(10.0, &[&a], "x"), 0.0);
        assert_eq!(available_hours(10.0, &[&a], "a"), 10.0);
    }
}

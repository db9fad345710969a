//! Command layer over the task tree.
//!
//! One engine instance manages one project's tree. Every mutation
//! re-validates against the current arena snapshot, writes through the
//! persistence collaborator first, and only then updates the in-memory
//! arena, so a store failure never leaves the arena ahead of the backend.
//!
//! The engine runs synchronously and holds no locks; callers are expected
//! to serialize writes per project, e.g. with a per-project mutex or the
//! backing store's transactions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::actor::Actor;
use crate::completion;
use crate::error::{Error, Result};
use crate::events::{DomainEvent, EventSink, NullSink};
use crate::ledger::{self, ActiveTimer};
use crate::store::{TaskStore, TimerStore};
use crate::task::{Assignee, TaskNode, TaskView, TimeEntry};
use crate::tree::TaskTree;
use crate::validate;

/// Input for creating a task. The engine assigns the id and timestamps.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub parent_id: Option<String>,
    pub name: String,
    pub description: String,
    pub percentage: u32,
    pub hours: Option<f64>,
    pub cost_per_hour: Option<f64>,
    pub assigned_to: Vec<Assignee>,
    pub deadline: DateTime<Utc>,
    pub outsource_team_id: Option<String>,
}

/// Partial update for an existing task. `None` leaves a field untouched;
/// the nested options clear optional fields when set to `Some(None)`.
/// Re-parenting is deliberately not supported here: moving a subtree
/// changes two sibling budgets at once and goes through delete + re-add.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub percentage: Option<u32>,
    pub hours: Option<Option<f64>>,
    pub cost_per_hour: Option<Option<f64>>,
    pub assigned_to: Option<Vec<Assignee>>,
    pub deadline: Option<DateTime<Utc>>,
    pub outsource_team_id: Option<Option<String>>,
}

/// Synchronous command handler for one project's task tree.
pub struct TaskEngine<S: TaskStore + TimerStore> {
    project_id: String,
    project_due_date: DateTime<Utc>,
    tree: TaskTree,
    store: S,
    sink: Box<dyn EventSink>,
}

impl<S: TaskStore + TimerStore> TaskEngine<S> {
    /// Hydrate an engine from the store's current contents.
    pub fn load(project_id: impl Into<String>, project_due_date: DateTime<Utc>, store: S) -> Result<Self> {
        Self::load_with_sink(project_id, project_due_date, store, Box::new(NullSink))
    }

    /// Hydrate with a custom event sink.
    pub fn load_with_sink(
        project_id: impl Into<String>,
        project_due_date: DateTime<Utc>,
        store: S,
        sink: Box<dyn EventSink>,
    ) -> Result<Self> {
        let project_id = project_id.into();
        let nodes = store.load_task_tree(&project_id)?;
        debug!(project = %project_id, tasks = nodes.len(), "hydrated task tree");
        Ok(TaskEngine {
            project_id,
            project_due_date,
            tree: TaskTree::from_nodes(nodes),
            store,
            sink,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    // ----- writes -----

    /// Create a task after validating it against the live sibling snapshot.
    /// Returns the generated id. Publishes `TaskAssigned` per assignee.
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<String> {
        self.add_task_at(draft, Utc::now())
    }

    pub fn add_task_at(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<String> {
        if let Some(pid) = &draft.parent_id {
            self.tree.find(pid)?;
        }
        let node = TaskNode {
            id: Uuid::new_v4().to_string(),
            project_id: self.project_id.clone(),
            parent_id: draft.parent_id,
            name: draft.name,
            description: draft.description,
            percentage: draft.percentage,
            hours: draft.hours,
            cost_per_hour: draft.cost_per_hour,
            assigned_to: draft.assigned_to,
            deadline: draft.deadline,
            completed: false,
            outsource_team_id: draft.outsource_team_id,
            time_entries: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.validate_against_snapshot(&node)?;
        self.store.save_task(&node)?;
        info!(task = %node.id, parent = ?node.parent_id, pct = node.percentage, "task added");
        for assignee in node.assigned_to.clone() {
            self.sink.publish(DomainEvent::TaskAssigned {
                task_id: node.id.clone(),
                project_id: self.project_id.clone(),
                assignee,
            });
        }
        let id = node.id.clone();
        self.tree.insert(node);
        Ok(id)
    }

    /// Apply a partial edit, re-validating every invariant against the
    /// current snapshot. The task's own existing allocation is excluded
    /// from the budget sums, so re-sizing never requires zeroing first.
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<()> {
        self.update_task_at(id, patch, Utc::now())
    }

    pub fn update_task_at(&mut self, id: &str, patch: TaskPatch, now: DateTime<Utc>) -> Result<()> {
        let before = self.tree.find(id)?.clone();
        let mut candidate = before.clone();
        if let Some(name) = patch.name {
            candidate.name = name;
        }
        if let Some(description) = patch.description {
            candidate.description = description;
        }
        if let Some(percentage) = patch.percentage {
            candidate.percentage = percentage;
        }
        if let Some(hours) = patch.hours {
            candidate.hours = hours;
        }
        if let Some(cost) = patch.cost_per_hour {
            candidate.cost_per_hour = cost;
        }
        if let Some(assigned) = patch.assigned_to {
            candidate.assigned_to = assigned;
        }
        if let Some(deadline) = patch.deadline {
            candidate.deadline = deadline;
        }
        if let Some(team) = patch.outsource_team_id {
            candidate.outsource_team_id = team;
        }
        candidate.updated_at = now;

        self.validate_against_snapshot(&candidate)?;
        // An edit can shrink budgets the children already spend; creation
        // can't, so only this path re-checks downward.
        validate::validate_children_fit(&candidate, &self.tree.children_of(id))?;
        self.store.save_task(&candidate)?;
        debug!(task = %id, "task updated");
        for assignee in &candidate.assigned_to {
            if !before.assigned_to.iter().any(|a| a.id == assignee.id) {
                self.sink.publish(DomainEvent::TaskAssigned {
                    task_id: candidate.id.clone(),
                    project_id: self.project_id.clone(),
                    assignee: assignee.clone(),
                });
            }
        }
        self.tree.insert(candidate);
        Ok(())
    }

    /// Flip a task's completion flag. Meaningful for leaves; whether a
    /// mutation is allowed while the parent is already completed is the
    /// caller's policy, checked via [`ancestors`](Self::ancestors).
    pub fn set_completed(&mut self, id: &str, actor: &Actor, completed: bool) -> Result<()> {
        self.set_completed_at(id, actor, completed, Utc::now())
    }

    pub fn set_completed_at(
        &mut self,
        id: &str,
        actor: &Actor,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut task = self.tree.find(id)?.clone();
        task.completed = completed;
        task.updated_at = now;
        self.store.save_task(&task)?;
        info!(task = %id, completed, actor = %actor.id, "completion flag set");
        if completed {
            self.sink.publish(DomainEvent::TaskCompleted {
                task_id: task.id.clone(),
                project_id: self.project_id.clone(),
                actor_id: actor.id.clone(),
            });
        }
        self.tree.insert(task);
        Ok(())
    }

    /// Delete a task and every descendant, children first so the backend
    /// never holds an orphan pointing at a deleted parent. A mid-cascade
    /// store failure surfaces as `PartialDeleteFailure` naming how far the
    /// cascade got; the arena keeps the surviving nodes.
    pub fn delete_task_cascade(&mut self, id: &str) -> Result<Vec<String>> {
        self.tree.find(id)?;
        let mut order = vec![id.to_string()];
        order.extend(self.tree.descendants_of(id));
        // Preorder lists parents before children; deleting in reverse
        // guarantees children-first.
        order.reverse();

        let mut deleted: Vec<String> = Vec::with_capacity(order.len());
        for victim in &order {
            if let Err(e) = self.store.delete_task(victim) {
                warn!(task = %victim, deleted = deleted.len(), "cascade delete stopped");
                for done in &deleted {
                    self.tree.remove_subtree(done);
                }
                return Err(Error::PartialDeleteFailure {
                    root_id: id.to_string(),
                    failed_id: victim.clone(),
                    deleted: deleted.len(),
                    source: Box::new(e),
                });
            }
            deleted.push(victim.clone());
        }
        self.tree.remove_subtree(id);
        info!(task = %id, removed = deleted.len(), "cascade delete complete");
        Ok(deleted)
    }

    // ----- timers -----

    /// Start the actor's timer on a task. The marker goes straight to the
    /// durable timer store, so it survives restarts.
    pub fn start_timer(&mut self, task_id: &str, actor: &Actor) -> Result<ActiveTimer> {
        self.start_timer_at(task_id, actor, Utc::now())
    }

    pub fn start_timer_at(
        &mut self,
        task_id: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<ActiveTimer> {
        self.tree.find(task_id)?;
        ledger::start_timer(&mut self.store, task_id, &actor.id, now)
    }

    /// Stop the actor's timer, folding the elapsed time into their
    /// cumulative entry and persisting the task.
    pub fn stop_timer(&mut self, task_id: &str, actor: &Actor) -> Result<TimeEntry> {
        self.stop_timer_at(task_id, actor, Utc::now())
    }

    pub fn stop_timer_at(
        &mut self,
        task_id: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<TimeEntry> {
        let mut task = self.tree.find(task_id)?.clone();
        // The ledger saves the merged task before clearing the marker, so a
        // failed save keeps the timer running and retryable.
        let entry = ledger::stop_timer(&mut self.store, &mut task, &actor.id, &actor.name, now)?;
        self.tree.insert(task);
        Ok(entry)
    }

    /// Record hand-entered minutes for the actor on a task.
    pub fn add_manual_time(&mut self, task_id: &str, actor: &Actor, minutes: f64) -> Result<TimeEntry> {
        let mut task = self.tree.find(task_id)?.clone();
        let entry =
            ledger::add_manual_time(&mut task, &actor.id, &actor.name, minutes, Utc::now())?;
        self.store.save_task(&task)?;
        self.tree.insert(task);
        Ok(entry)
    }

    /// Current total minutes for a user on a task, live timer included.
    pub fn running_total(&self, task_id: &str, user_id: &str, now: DateTime<Utc>) -> Result<f64> {
        let task = self.tree.find(task_id)?;
        let marker = self.store.active_timer(task_id, user_id)?;
        Ok(ledger::running_total(task, marker.as_ref(), user_id, now))
    }

    // ----- reads -----

    pub fn task(&self, id: &str) -> Result<&TaskNode> {
        self.tree.find(id)
    }

    /// Nested display views of the whole project forest.
    pub fn views(&self) -> Vec<TaskView> {
        self.tree.to_views(&self.project_id)
    }

    /// Effective completion of one task (0-100 scale).
    pub fn completion(&self, id: &str) -> Result<u32> {
        completion::completion_of(&self.tree, id)
    }

    /// Project-level completion across root tasks.
    pub fn project_completion(&self) -> u32 {
        completion::project_completion(&self.tree, &self.project_id)
    }

    /// Ancestor chain for a task, nearest parent first. Callers use this
    /// for policies like blocking edits under a completed parent.
    pub fn ancestors(&self, id: &str) -> Result<Vec<&TaskNode>> {
        self.tree.ancestors_of(id)
    }

    /// `/`-joined id path from the root down to the task.
    pub fn task_path(&self, id: &str) -> Result<String> {
        self.tree.path_of(id)
    }

    /// Minutes per user name on one task.
    pub fn time_by_user(&self, id: &str) -> Result<BTreeMap<String, f64>> {
        let task = self.tree.find(id)?;
        Ok(ledger::aggregate_by_user(&task.time_entries))
    }

    /// Tasks linked to an outsource team, for settlement reporting.
    pub fn tasks_by_outsource_team(&self, team_id: &str) -> Vec<&TaskNode> {
        self.tree
            .iter()
            .filter(|t| t.outsource_team_id.as_deref() == Some(team_id))
            .collect()
    }

    /// Percentage budget a form may offer for a task under `parent_id`
    /// (`None` for root level). `editing_id` adds an existing task's own
    /// allocation back, mirroring the validator's exclusion rule.
    pub fn percentage_budget(&self, parent_id: Option<&str>, editing_id: Option<&str>) -> Result<u32> {
        let siblings = self.sibling_snapshot(parent_id)?;
        Ok(validate::available_percentage(
            &siblings,
            editing_id.unwrap_or(""),
        ))
    }

    /// Remaining hour budget under a parent, `None` when the parent does
    /// not constrain hours.
    pub fn hour_budget(&self, parent_id: &str, editing_id: Option<&str>) -> Result<Option<f64>> {
        let parent = self.tree.find(parent_id)?;
        let Some(parent_hours) = parent.hours else {
            return Ok(None);
        };
        let siblings = self.tree.children_of(parent_id);
        Ok(Some(validate::available_hours(
            parent_hours,
            &siblings,
            editing_id.unwrap_or(""),
        )))
    }

    // ----- internals -----

    fn sibling_snapshot(&self, parent_id: Option<&str>) -> Result<Vec<&TaskNode>> {
        Ok(match parent_id {
            Some(pid) => {
                self.tree.find(pid)?;
                self.tree.children_of(pid)
            }
            None => self.tree.roots(&self.project_id),
        })
    }

    fn validate_against_snapshot(&self, candidate: &TaskNode) -> Result<()> {
        let siblings = self.sibling_snapshot(candidate.parent_id.as_deref())?;
        let parent = match candidate.parent_id.as_deref() {
            Some(pid) => Some(self.tree.find(pid)?),
            None => None,
        };
        validate::validate_allocation(candidate, &siblings, parent, self.project_due_date)
    }
}

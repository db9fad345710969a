//! # Task Allocation Engine
//!
//! A standalone, storage-agnostic core for hierarchical project tasks with
//! percentage and hour allocation, completion roll-up, and per-user time
//! tracking.
//!
//! ## Key Features
//!
//! - **Hierarchical Task Trees**: a flat id-keyed arena per project, with
//!   children derived from parent pointers — no duplicated child lists to
//!   drift out of sync
//! - **Allocation Budgets**: sibling percentages never exceed 100, child
//!   hours never exceed the parent's hour budget, deadlines stay inside the
//!   parent's (or the project's) ceiling
//! - **Completion Roll-Up**: effective completion recomputed on demand as a
//!   pure fold, never cached
//! - **Time Ledger**: start/stop timers and manual entries converge on one
//!   cumulative per-user total, with a durable active-timer marker that
//!   survives restarts
//! - **Narrow Collaborator Seams**: persistence, identity and notification
//!   stay behind small traits; the crate ships an in-memory store and a
//!   JSON file store
//!
//! ## Quick Start
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use task_engine::{Assignee, JsonStore, TaskDraft, TaskEngine};
//!
//! # fn main() -> task_engine::Result<()> {
//! let store = JsonStore::open("p1_tasks.json")?;
//! let due = Utc::now() + Duration::days(90);
//! let mut engine = TaskEngine::load("p1", due, store)?;
//!
//! let hull = engine.add_task(TaskDraft {
//!     parent_id: None,
//!     name: "Hull design".into(),
//!     description: String::new(),
//!     percentage: 60,
//!     hours: Some(120.0),
//!     cost_per_hour: Some(85.0),
//!     assigned_to: vec![Assignee {
//!         id: "u1".into(),
//!         name: "Asha".into(),
//!         email: "asha@example.com".into(),
//!     }],
//!     deadline: Utc::now() + Duration::days(30),
//!     outsource_team_id: None,
//! })?;
//!
//! println!("project at {}%", engine.project_completion());
//! println!("path: {}", engine.task_path(&hull)?);
//! # Ok(())
//! # }
//! ```
//!
//! The engine runs synchronously and holds no locks; serialize writes per
//! project in the embedding application.

pub mod actor;
pub mod completion;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod store;
pub mod task;
pub mod tree;
pub mod validate;

#[cfg(test)]
pub(crate) mod testutil;

pub use actor::{Actor, Role};
pub use completion::{completion_of, project_completion};
pub use engine::{TaskDraft, TaskEngine, TaskPatch};
pub use error::{Error, Result};
pub use events::{DomainEvent, EventSink, NullSink, RecordingSink};
pub use ledger::ActiveTimer;
pub use store::{JsonStore, MemoryStore, TaskStore, TimerStore};
pub use task::{Assignee, TaskNode, TaskView, TimeEntry};
pub use tree::TaskTree;
pub use validate::{available_hours, available_percentage, validate_allocation};

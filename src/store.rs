//! Persistence collaborators for tasks and timer markers.
//!
//! The engine never talks to a backend directly; it goes through the
//! [`TaskStore`] and [`TimerStore`] traits. Two implementations ship with
//! the crate: an in-memory store for tests and embedding, and a JSON file
//! store (pretty-printed, written atomically via temp file + rename,
//! load-or-default on read).

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ledger::ActiveTimer;
use crate::task::TaskNode;

/// Backend for task documents.
pub trait TaskStore {
    /// Flat list of every task in a project.
    fn load_task_tree(&self, project_id: &str) -> Result<Vec<TaskNode>>;
    /// Insert or overwrite one task document.
    fn save_task(&mut self, task: &TaskNode) -> Result<()>;
    /// Delete one task document. Cascading is the engine's job; the store
    /// deletes exactly the id it is given.
    fn delete_task(&mut self, task_id: &str) -> Result<()>;
}

/// Backend for durable active-timer markers, keyed by (task, user).
pub trait TimerStore {
    fn active_timer(&self, task_id: &str, user_id: &str) -> Result<Option<ActiveTimer>>;
    fn set_active_timer(&mut self, task_id: &str, user_id: &str, marker: ActiveTimer)
        -> Result<()>;
    fn clear_active_timer(&mut self, task_id: &str, user_id: &str) -> Result<()>;
}

/// In-memory store for tests and single-process embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: HashMap<String, TaskNode>,
    // Tuple key: externally supplied ids may contain any separator text.
    timers: HashMap<(String, String), ActiveTimer>,
    #[cfg(test)]
    failing_deletes: std::collections::HashSet<String>,
    #[cfg(test)]
    failing_saves: std::collections::HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Make `delete_task` fail for one id, to exercise partial-delete paths.
    #[cfg(test)]
    pub fn fail_delete_of(&mut self, task_id: &str) {
        self.failing_deletes.insert(task_id.to_string());
    }

    /// Make `save_task` fail for one id, to exercise failed-write paths.
    #[cfg(test)]
    pub fn fail_save_of(&mut self, task_id: &str) {
        self.failing_saves.insert(task_id.to_string());
    }
}

impl TaskStore for MemoryStore {
    fn load_task_tree(&self, project_id: &str) -> Result<Vec<TaskNode>> {
        Ok(self
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    fn save_task(&mut self, task: &TaskNode) -> Result<()> {
        #[cfg(test)]
        if self.failing_saves.contains(&task.id) {
            return Err(crate::error::Error::Store(format!(
                "injected failure for {}",
                task.id
            )));
        }
        self.tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    fn delete_task(&mut self, task_id: &str) -> Result<()> {
        #[cfg(test)]
        if self.failing_deletes.contains(task_id) {
            return Err(crate::error::Error::Store(format!(
                "injected failure for {task_id}"
            )));
        }
        self.tasks.remove(task_id);
        Ok(())
    }
}

impl TimerStore for MemoryStore {
    fn active_timer(&self, task_id: &str, user_id: &str) -> Result<Option<ActiveTimer>> {
        Ok(self
            .timers
            .get(&(task_id.to_string(), user_id.to_string()))
            .cloned())
    }

    fn set_active_timer(
        &mut self,
        task_id: &str,
        user_id: &str,
        marker: ActiveTimer,
    ) -> Result<()> {
        self.timers
            .insert((task_id.to_string(), user_id.to_string()), marker);
        Ok(())
    }

    fn clear_active_timer(&mut self, task_id: &str, user_id: &str) -> Result<()> {
        self.timers
            .remove(&(task_id.to_string(), user_id.to_string()));
        Ok(())
    }
}

/// On-disk layout of the JSON store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    tasks: Vec<TaskNode>,
    // Nested per-task map rather than a joined string key, so task and
    // user ids containing arbitrary separator text can never collide.
    #[serde(default)]
    timers: HashMap<String, HashMap<String, ActiveTimer>>,
}

/// Single-file JSON store. The whole file is rewritten on every mutation;
/// fine at this domain's scale (tens to low hundreds of tasks).
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    data: StoreFile,
}

impl JsonStore {
    /// Open a store file, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let mut buf = String::new();
            File::open(&path)?.read_to_string(&mut buf)?;
            serde_json::from_str(&buf)?
        } else {
            StoreFile::default()
        };
        Ok(JsonStore { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomic-ish write via temp + rename.
    fn persist(&self) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(&self.data)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TaskStore for JsonStore {
    fn load_task_tree(&self, project_id: &str) -> Result<Vec<TaskNode>> {
        Ok(self
            .data
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    fn save_task(&mut self, task: &TaskNode) -> Result<()> {
        match self.data.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task.clone(),
            None => self.data.tasks.push(task.clone()),
        }
        self.persist()
    }

    fn delete_task(&mut self, task_id: &str) -> Result<()> {
        self.data.tasks.retain(|t| t.id != task_id);
        self.persist()
    }
}

impl TimerStore for JsonStore {
    fn active_timer(&self, task_id: &str, user_id: &str) -> Result<Option<ActiveTimer>> {
        Ok(self
            .data
            .timers
            .get(task_id)
            .and_then(|by_user| by_user.get(user_id))
            .cloned())
    }

    fn set_active_timer(
        &mut self,
        task_id: &str,
        user_id: &str,
        marker: ActiveTimer,
    ) -> Result<()> {
        self.data
            .timers
            .entry(task_id.to_string())
            .or_default()
            .insert(user_id.to_string(), marker);
        self.persist()
    }

    fn clear_active_timer(&mut self, task_id: &str, user_id: &str) -> Result<()> {
        if let Some(by_user) = self.data.timers.get_mut(task_id) {
            by_user.remove(user_id);
            if by_user.is_empty() {
                self.data.timers.remove(task_id);
            }
        }
        self.persist()
    }
}

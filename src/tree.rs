//! In-memory task arena and tree lookups.
//!
//! Tasks live in a flat map keyed by id, with a children index derived from
//! each node's `parent_id`. That single source of truth avoids the classic
//! drift between a node's embedded child list and the children actually
//! stored, and makes lookup by id O(1). Traversals are plain recursion:
//! task trees in this domain are shallow (a handful of levels) and small
//! (tens to low hundreds of nodes), so no further indexing is warranted.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::task::{TaskNode, TaskView};

/// Flat arena holding every task of one or more projects.
#[derive(Debug, Default)]
pub struct TaskTree {
    nodes: HashMap<String, TaskNode>,
    /// parent id -> child ids. Order is not maintained here; accessors sort
    /// by creation time (then id) for deterministic output.
    children: HashMap<String, Vec<String>>,
}

impl TaskTree {
    pub fn new() -> Self {
        TaskTree::default()
    }

    /// Build an arena from a flat node list, e.g. as loaded from a store.
    pub fn from_nodes(nodes: Vec<TaskNode>) -> Self {
        let mut tree = TaskTree::new();
        for node in nodes {
            tree.insert(node);
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&TaskNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TaskNode> {
        self.nodes.get_mut(id)
    }

    /// Get a task by id, failing with `TaskNotFound` on a miss.
    pub fn find(&self, id: &str) -> Result<&TaskNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.values()
    }

    /// Insert or replace a task, keeping the children index in sync.
    /// Re-parenting a task moves it between child lists.
    pub fn insert(&mut self, node: TaskNode) {
        if let Some(old) = self.nodes.get(&node.id) {
            if old.parent_id != node.parent_id {
                if let Some(old_parent) = &old.parent_id {
                    if let Some(ids) = self.children.get_mut(old_parent) {
                        ids.retain(|c| c != &node.id);
                    }
                }
            }
        }
        if let Some(parent) = &node.parent_id {
            let ids = self.children.entry(parent.clone()).or_default();
            if !ids.contains(&node.id) {
                ids.push(node.id.clone());
            }
        }
        self.nodes.insert(node.id.clone(), node);
    }

    /// Root-level tasks of a project, in creation order.
    pub fn roots(&self, project_id: &str) -> Vec<&TaskNode> {
        let mut roots: Vec<&TaskNode> = self
            .nodes
            .values()
            .filter(|t| t.parent_id.is_none() && t.project_id == project_id)
            .collect();
        sort_by_creation(&mut roots);
        roots
    }

    /// Direct children of a task, in creation order.
    pub fn children_of(&self, id: &str) -> Vec<&TaskNode> {
        let mut out: Vec<&TaskNode> = self
            .children
            .get(id)
            .map(|ids| ids.iter().filter_map(|c| self.nodes.get(c)).collect())
            .unwrap_or_default();
        sort_by_creation(&mut out);
        out
    }

    pub fn is_leaf(&self, id: &str) -> bool {
        self.children.get(id).map_or(true, |ids| ids.is_empty())
    }

    /// The parent of a task, or `None` for roots.
    pub fn parent_of(&self, id: &str) -> Result<Option<&TaskNode>> {
        let task = self.find(id)?;
        match &task.parent_id {
            Some(pid) => Ok(Some(self.find(pid)?)),
            None => Ok(None),
        }
    }

    /// All tasks sharing the given task's parent (fellow roots of the same
    /// project when it has no parent), the task itself included. Allocation
    /// math excludes the candidate by id; display uses the full set.
    pub fn siblings_of(&self, id: &str) -> Result<Vec<&TaskNode>> {
        let task = self.find(id)?;
        Ok(match &task.parent_id {
            Some(pid) => self.children_of(pid),
            None => self.roots(&task.project_id),
        })
    }

    /// Ancestors by walking the `parent_id` chain, nearest parent first.
    pub fn ancestors_of(&self, id: &str) -> Result<Vec<&TaskNode>> {
        let mut chain = Vec::new();
        let mut current = self.find(id)?;
        while let Some(pid) = &current.parent_id {
            let parent = self.find(pid)?;
            chain.push(parent);
            current = parent;
        }
        Ok(chain)
    }

    /// Ids of every descendant of a task, depth-first.
    pub fn descendants_of(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: &str, out: &mut Vec<String>) {
        for child in self.children_of(id) {
            out.push(child.id.clone());
            self.collect_descendants(&child.id, out);
        }
    }

    /// `/`-joined id path from the root down to the given task.
    pub fn path_of(&self, id: &str) -> Result<String> {
        let mut ids: Vec<String> = self
            .ancestors_of(id)?
            .into_iter()
            .map(|t| t.id.clone())
            .collect();
        ids.reverse();
        ids.push(id.to_string());
        Ok(ids.join("/"))
    }

    /// Remove a task and its whole subtree from the arena, returning the
    /// removed nodes (the root of the removed subtree first).
    pub fn remove_subtree(&mut self, id: &str) -> Vec<TaskNode> {
        let mut ids = vec![id.to_string()];
        ids.extend(self.descendants_of(id));

        let mut removed = Vec::with_capacity(ids.len());
        for rid in &ids {
            if let Some(node) = self.nodes.remove(rid) {
                if let Some(pid) = &node.parent_id {
                    if let Some(list) = self.children.get_mut(pid) {
                        list.retain(|c| c != rid);
                    }
                }
                self.children.remove(rid);
                removed.push(node);
            }
        }
        removed
    }

    /// Nested display views for a project, children recursively attached.
    pub fn to_views(&self, project_id: &str) -> Vec<TaskView> {
        self.roots(project_id)
            .into_iter()
            .map(|t| self.view_of(t))
            .collect()
    }

    fn view_of(&self, task: &TaskNode) -> TaskView {
        TaskView {
            task: task.clone(),
            children: self
                .children_of(&task.id)
                .into_iter()
                .map(|c| self.view_of(c))
                .collect(),
        }
    }
}

fn sort_by_creation(tasks: &mut [&TaskNode]) {
    tasks.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::task;

    fn sample_tree() -> TaskTree {
        // p1 forest:
        //   a
        //   ├── b
        //   │   └── d
        //   └── c
        //   e (second root)
        TaskTree::from_nodes(vec![
            task("a", "p1", None, 50),
            task("b", "p1", Some("a"), 60),
            task("c", "p1", Some("a"), 30),
            task("d", "p1", Some("b"), 100),
            task("e", "p1", None, 20),
        ])
    }

    #[test]
    fn find_hits_and_misses() {
        let tree = sample_tree();
        assert_eq!(tree.find("d").unwrap().id, "d");
        assert!(matches!(tree.find("zz"), Err(Error::TaskNotFound(_))));
    }

    #[test]
    fn roots_and_children_are_creation_ordered() {
        let tree = sample_tree();
        let roots: Vec<&str> = tree.roots("p1").iter().map(|t| t.id.as_str()).collect();
        assert_eq!(roots, ["a", "e"]);
        let kids: Vec<&str> = tree.children_of("a").iter().map(|t| t.id.as_str()).collect();
        assert_eq!(kids, ["b", "c"]);
    }

    #[test]
    fn siblings_include_self_and_cover_roots() {
        let tree = sample_tree();
        let sibs: Vec<&str> = tree
            .siblings_of("b")
            .unwrap()
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(sibs, ["b", "c"]);

        let root_sibs: Vec<&str> = tree
            .siblings_of("e")
            .unwrap()
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(root_sibs, ["a", "e"]);
    }

    #[test]
    fn ancestors_walk_to_root() {
        let tree = sample_tree();
        let chain: Vec<&str> = tree
            .ancestors_of("d")
            .unwrap()
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(chain, ["b", "a"]);
        assert!(tree.ancestors_of("a").unwrap().is_empty());
    }

    #[test]
    fn descendants_and_path() {
        let tree = sample_tree();
        let mut desc = tree.descendants_of("a");
        desc.sort();
        assert_eq!(desc, ["b", "c", "d"]);
        assert_eq!(tree.path_of("d").unwrap(), "a/b/d");
        assert_eq!(tree.path_of("a").unwrap(), "a");
    }

    #[test]
    fn remove_subtree_takes_descendants() {
        let mut tree = sample_tree();
        let removed = tree.remove_subtree("b");
        let mut ids: Vec<&str> = removed.iter().map(|t| t.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, ["b", "d"]);
        assert!(!tree.contains("d"));
        assert!(tree.contains("a"));
        assert!(tree.children_of("a").iter().all(|t| t.id != "b"));
    }

    #[test]
    fn reparenting_moves_child_lists() {
        let mut tree = sample_tree();
        let mut moved = tree.get("c").unwrap().clone();
        moved.parent_id = Some("b".to_string());
        tree.insert(moved);
        assert!(tree.children_of("a").iter().all(|t| t.id != "c"));
        assert!(tree.children_of("b").iter().any(|t| t.id == "c"));
    }

    #[test]
    fn views_nest_recursively() {
        let tree = sample_tree();
        let views = tree.to_views("p1");
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].task.id, "a");
        assert_eq!(views[0].children.len(), 2);
        assert_eq!(views[0].children[0].children[0].task.id, "d");
    }

    #[test]
    fn leaf_detection() {
        let tree = sample_tree();
        assert!(tree.is_leaf("d"));
        assert!(tree.is_leaf("e"));
        assert!(!tree.is_leaf("a"));
    }
}

//! Completion roll-up over the task tree.
//!
//! Completion is always recomputed on demand as a pure fold over the arena;
//! nothing caches a counter that could drift from the tree. A non-leaf task
//! delivers the sum of its completed children's percentage shares, without
//! normalising by the total assigned to children — an under-allocated
//! subtree therefore caps below 100 until its full budget is assigned.

use crate::error::Result;
use crate::tree::TaskTree;

/// Effective completion of a task on the 0-100 scale.
///
/// Leaf: `completed ? percentage : 0`, where a completed leaf with an
/// unset (zero) percentage counts as fully delivered. Non-leaf: sum over
/// direct children of `child.completed ? child.percentage : 0`.
pub fn completion_of(tree: &TaskTree, id: &str) -> Result<u32> {
    let task = tree.find(id)?;
    let children = tree.children_of(id);
    if children.is_empty() {
        return Ok(if task.completed {
            if task.percentage == 0 {
                100
            } else {
                task.percentage
            }
        } else {
            0
        });
    }
    Ok(children
        .iter()
        .map(|c| if c.completed { c.percentage } else { 0 })
        .sum())
}

/// Project-level completion: sum of each root task's effective completion.
/// Root percentages are expected (not enforced here) to total at most 100.
pub fn project_completion(tree: &TaskTree, project_id: &str) -> u32 {
    tree.roots(project_id)
        .iter()
        .map(|t| completion_of(tree, &t.id).unwrap_or(0))
        .sum()
}

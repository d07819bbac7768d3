//! # Priority Allocator
//!
//! Computes priorities for a user's ordered task list without renumbering other rows.
//!
//! Display order is `priority DESC`. New tasks go to the head (`current max + create
//! delta`). A moved task lands between two neighbors at their integer midpoint, or one
//! gap beyond the last neighbor when moved to either end. Clients name "no neighbor" with
//! the sentinels `i32::MAX` (above) and `i32::MIN` (below).
//!
//! Integer midpoints run out: once `prev - next <= 1` there is no value strictly between
//! the neighbors. The allocator reports that as [`Placement::Collision`] and the caller
//! renumbers the user's open list with [`PriorityAllocator::plan_move`], which spaces every
//! open task evenly and puts the moved task directly below the last task whose priority is
//! `>= prev`. Boundary placements that would reach a sentinel are collisions as well.

use crate::config::PriorityConfig;
use crate::constants::priority::{MAX_SENTINEL, MIN_SENTINEL};
use crate::error::{Result, TodoError};

/// Outcome of a placement request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A free value strictly inside the requested bounds
    At(i32),
    /// No free value; the open list must be renumbered
    Collision,
}

impl Placement {
    pub fn value(self) -> Option<i32> {
        match self {
            Placement::At(priority) => Some(priority),
            Placement::Collision => None,
        }
    }
}

/// An open task as seen by the rebalance planner, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedTask {
    pub task_id: i64,
    pub priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityChange {
    pub task_id: i64,
    pub from: i32,
    pub to: i32,
}

/// Renumbering of a user's open list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RebalancePlan {
    /// Rows whose priority differs from the stored value, in new display order
    pub changes: Vec<PriorityChange>,
    /// Priority assigned to the moved (or newly created) task
    pub target_priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityAllocator {
    baseline: i32,
    create_delta: i32,
    gap_delta: i32,
}

impl Default for PriorityAllocator {
    fn default() -> Self {
        Self::from_config(&PriorityConfig::default())
    }
}

impl PriorityAllocator {
    pub fn from_config(config: &PriorityConfig) -> Self {
        Self {
            baseline: config.baseline,
            create_delta: config.create_delta.max(1),
            gap_delta: config.gap_delta.max(1),
        }
    }

    pub fn gap_delta(&self) -> i32 {
        self.gap_delta
    }

    pub fn create_delta(&self) -> i32 {
        self.create_delta
    }

    /// Priority for a new task placed at the head of the list.
    ///
    /// `current_max` is the highest priority among the owner's open tasks, `None` when the
    /// owner has none (the baseline is used instead).
    pub fn next_creation_priority(&self, current_max: Option<i32>) -> Placement {
        let max = current_max.unwrap_or(self.baseline);
        Self::place(i64::from(max) + i64::from(self.create_delta))
    }

    /// Priority for a task placed between `prev` (above) and `next` (below).
    pub fn between_priority(&self, prev: i32, next: i32) -> Result<Placement> {
        Self::validate_neighbors(prev, next)?;

        if prev == MAX_SENTINEL {
            return Ok(Self::place(i64::from(next) + i64::from(self.gap_delta)));
        }
        if next == MIN_SENTINEL {
            return Ok(Self::place(i64::from(prev) - i64::from(self.gap_delta)));
        }
        if i64::from(prev) - i64::from(next) <= 1 {
            return Ok(Placement::Collision);
        }

        let midpoint = (i64::from(prev) + i64::from(next)).div_euclid(2);
        Ok(Self::place(midpoint))
    }

    /// Evenly spaced descending priorities for `count` open tasks
    pub fn spread(&self, count: usize) -> Vec<i32> {
        let count = count as i64;
        let room = (i64::from(MAX_SENTINEL) - 1) / (count + 1);
        let step = room.min(i64::from(self.gap_delta)).max(1);

        (0..count)
            .map(|index| ((count - index) * step) as i32)
            .collect()
    }

    /// Plan moving `task_id` directly below the last open task whose priority is `>= prev`.
    ///
    /// `open_tasks` must be the owner's open tasks in display order. Returns `None` when the
    /// task is not among them.
    pub fn plan_move(
        &self,
        open_tasks: &[RankedTask],
        task_id: i64,
        prev: i32,
    ) -> Option<RebalancePlan> {
        let target = *open_tasks.iter().find(|t| t.task_id == task_id)?;

        let mut order: Vec<RankedTask> = open_tasks
            .iter()
            .copied()
            .filter(|t| t.task_id != task_id)
            .collect();

        let insert_at = if prev == MAX_SENTINEL {
            0
        } else {
            order.iter().filter(|t| t.priority >= prev).count()
        };
        order.insert(insert_at, target);

        let priorities = self.spread(order.len());
        let target_priority = priorities[insert_at];

        Some(RebalancePlan {
            changes: Self::diff(&order, &priorities),
            target_priority,
        })
    }

    /// Plan renumbering so that a new task fits at the head of the list.
    pub fn plan_head_insert(&self, open_tasks: &[RankedTask]) -> RebalancePlan {
        let priorities = self.spread(open_tasks.len() + 1);

        RebalancePlan {
            changes: Self::diff(open_tasks, &priorities[1..]),
            target_priority: priorities[0],
        }
    }

    fn diff(order: &[RankedTask], priorities: &[i32]) -> Vec<PriorityChange> {
        order
            .iter()
            .zip(priorities)
            .filter(|(task, to)| task.priority != **to)
            .map(|(task, to)| PriorityChange {
                task_id: task.task_id,
                from: task.priority,
                to: *to,
            })
            .collect()
    }

    fn validate_neighbors(prev: i32, next: i32) -> Result<()> {
        if next == MAX_SENTINEL {
            return Err(TodoError::validation(
                "next_task_priority cannot be the top sentinel",
            ));
        }
        if prev == MIN_SENTINEL {
            return Err(TodoError::validation(
                "prev_task_priority cannot be the bottom sentinel",
            ));
        }
        if prev < next {
            return Err(TodoError::validation(format!(
                "prev_task_priority {prev} is below next_task_priority {next}"
            )));
        }
        Ok(())
    }

    fn place(candidate: i64) -> Placement {
        if candidate > i64::from(MIN_SENTINEL) && candidate < i64::from(MAX_SENTINEL) {
            Placement::At(candidate as i32)
        } else {
            Placement::Collision
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator() -> PriorityAllocator {
        PriorityAllocator::default()
    }

    fn ranked(pairs: &[(i64, i32)]) -> Vec<RankedTask> {
        pairs
            .iter()
            .map(|&(task_id, priority)| RankedTask { task_id, priority })
            .collect()
    }

    #[test]
    fn test_creation_uses_baseline_then_max() {
        let alloc = allocator();
        assert_eq!(alloc.next_creation_priority(None), Placement::At(10_000));
        assert_eq!(alloc.next_creation_priority(Some(10_000)), Placement::At(20_000));
        assert_eq!(alloc.next_creation_priority(Some(-35_000)), Placement::At(-25_000));
    }

    #[test]
    fn test_creation_overflow_is_a_collision() {
        let alloc = allocator();
        assert_eq!(
            alloc.next_creation_priority(Some(i32::MAX - 10)),
            Placement::Collision
        );
    }

    #[test]
    fn test_between_midpoint() {
        let alloc = allocator();
        assert_eq!(alloc.between_priority(20_000, 10_000).unwrap(), Placement::At(15_000));
        assert_eq!(alloc.between_priority(3, 0).unwrap(), Placement::At(1));
        assert_eq!(alloc.between_priority(-1, -4).unwrap(), Placement::At(-3));
    }

    #[test]
    fn test_between_boundaries() {
        let alloc = allocator();
        assert_eq!(
            alloc.between_priority(i32::MAX, 20_000).unwrap(),
            Placement::At(30_000)
        );
        assert_eq!(
            alloc.between_priority(20_000, i32::MIN).unwrap(),
            Placement::At(10_000)
        );
        assert_eq!(
            alloc.between_priority(i32::MAX, i32::MIN).unwrap(),
            Placement::At(i32::MIN + 10_000)
        );
    }

    #[test]
    fn test_between_collisions() {
        let alloc = allocator();
        assert_eq!(alloc.between_priority(5, 5).unwrap(), Placement::Collision);
        assert_eq!(alloc.between_priority(6, 5).unwrap(), Placement::Collision);
        assert_eq!(
            alloc.between_priority(i32::MAX, i32::MAX - 5).unwrap(),
            Placement::Collision
        );
        assert_eq!(
            alloc.between_priority(i32::MIN + 5, i32::MIN).unwrap(),
            Placement::Collision
        );
    }

    #[test]
    fn test_between_rejects_malformed_sentinels() {
        let alloc = allocator();
        assert!(alloc.between_priority(10, i32::MAX).is_err());
        assert!(alloc.between_priority(i32::MIN, -10).is_err());
        assert!(matches!(
            alloc.between_priority(10, 20),
            Err(TodoError::ValidationError(_))
        ));
    }

    #[test]
    fn test_spread_is_strictly_descending() {
        let alloc = allocator();
        assert_eq!(alloc.spread(3), vec![30_000, 20_000, 10_000]);
        assert!(alloc.spread(0).is_empty());

        let wide = alloc.spread(1_000_000);
        assert!(wide.windows(2).all(|w| w[0] > w[1]));
        assert!(wide[wide.len() - 1] > i32::MIN);
    }

    #[test]
    fn test_plan_move_between_adjacent_neighbors() {
        let alloc = allocator();
        let open = ranked(&[(1, 101), (2, 100), (3, 50)]);

        // move task 3 between 1 (101) and 2 (100)
        let plan = alloc.plan_move(&open, 3, 101).unwrap();

        assert_eq!(plan.target_priority, 20_000);
        assert_eq!(
            plan.changes,
            vec![
                PriorityChange { task_id: 1, from: 101, to: 30_000 },
                PriorityChange { task_id: 3, from: 50, to: 20_000 },
                PriorityChange { task_id: 2, from: 100, to: 10_000 },
            ]
        );
    }

    #[test]
    fn test_plan_move_to_top_and_skip_unchanged() {
        let alloc = allocator();
        let open = ranked(&[(1, 30_000), (2, 20_000), (3, 10_000)]);

        let plan = alloc.plan_move(&open, 3, i32::MAX).unwrap();
        assert_eq!(plan.target_priority, 30_000);
        assert_eq!(plan.changes.len(), 3);

        let same = alloc.plan_move(&open, 2, 30_000).unwrap();
        assert_eq!(same.target_priority, 20_000);
        assert!(same.changes.is_empty());
    }

    #[test]
    fn test_plan_move_unknown_task() {
        let alloc = allocator();
        assert!(alloc.plan_move(&ranked(&[(1, 10)]), 9, 10).is_none());
    }

    #[test]
    fn test_plan_head_insert_leaves_room_at_top() {
        let alloc = allocator();
        let open = ranked(&[(1, i32::MAX - 1), (2, 0)]);

        let plan = alloc.plan_head_insert(&open);
        assert_eq!(plan.target_priority, 30_000);
        assert_eq!(
            plan.changes,
            vec![
                PriorityChange { task_id: 1, from: i32::MAX - 1, to: 20_000 },
                PriorityChange { task_id: 2, from: 0, to: 10_000 },
            ]
        );
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid pathfinding over the belief map.
//!
//! Two searches are offered. [`Pathfinder::find_path`] is an A* search toward
//! a concrete cell or toward the first cell of a category in scan order.
//! [`Pathfinder::shortest_path_to_category`] is a breadth-first search that
//! stops at whichever cell of the category it reaches first. Both move in the
//! four cardinal directions at a uniform cost of one per step, treat every
//! non-wall cell (including unknown ones) as traversable, and reuse their
//! scratch buffers between calls.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, VecDeque},
};

use fog_harvest_core::{BeliefView, CellCoord, Direction, TileCategory};

/// Destination requested from the pathfinder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Goal {
    /// A specific cell.
    Cell(CellCoord),
    /// The first cell of the category in row-major scan order.
    Category(TileCategory),
}

/// Ordered sequence of cells leading from a start cell to a goal.
///
/// The start cell is excluded and the goal is the last element. An empty
/// path means the start already satisfied the goal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    steps: Vec<CellCoord>,
}

impl Path {
    /// First cell to enter, if the path has any steps.
    #[must_use]
    pub fn first_step(&self) -> Option<CellCoord> {
        self.steps.first().copied()
    }

    /// Final cell of the path, if the path has any steps.
    #[must_use]
    pub fn destination(&self) -> Option<CellCoord> {
        self.steps.last().copied()
    }

    /// Number of steps required to reach the goal.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Reports whether the start already satisfied the goal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Cells along the path in travel order.
    #[must_use]
    pub fn steps(&self) -> &[CellCoord] {
        &self.steps
    }

    /// Consumes the path, yielding its cells in travel order.
    #[must_use]
    pub fn into_vec(self) -> Vec<CellCoord> {
        self.steps
    }
}

/// Reusable search workspace for A* and breadth-first queries.
#[derive(Debug, Default)]
pub struct Pathfinder {
    columns: u32,
    costs: Vec<u32>,
    came_from: Vec<Option<usize>>,
    frontier: BinaryHeap<FrontierEntry>,
    queue: VecDeque<usize>,
    sequence: u64,
}

impl Pathfinder {
    /// Creates a pathfinder with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a cost-optimal path from `start` to `goal` using A*.
    ///
    /// Category goals are resolved to the first matching cell in scan order
    /// before the search begins. Returns `None` when no such cell exists or
    /// when the frontier empties before the goal is reached.
    pub fn find_path(&mut self, view: BeliefView<'_>, start: CellCoord, goal: Goal) -> Option<Path> {
        let target = match goal {
            Goal::Cell(cell) => cell,
            Goal::Category(category) => view.nearest_of_category(category)?,
        };

        let start_index = self.prepare(&view, start)?;
        if !view.in_bounds(target) {
            return None;
        }
        if start == target {
            return Some(Path::default());
        }
        if !view.is_passable(target) {
            return None;
        }

        self.costs[start_index] = 0;
        self.push_frontier(start_index, 0, start.manhattan_distance(target));

        while let Some(entry) = self.frontier.pop() {
            if entry.cost > self.costs[entry.index] {
                continue;
            }

            let cell = self.cell_at(entry.index);
            if cell == target {
                return Some(self.reconstruct(entry.index));
            }

            let next_cost = entry.cost.saturating_add(1);
            for neighbor in passable_neighbors(view, cell) {
                let Some(neighbor_index) = self.index(neighbor) else {
                    continue;
                };
                if next_cost >= self.costs[neighbor_index] {
                    continue;
                }

                self.costs[neighbor_index] = next_cost;
                self.came_from[neighbor_index] = Some(entry.index);
                self.push_frontier(
                    neighbor_index,
                    next_cost,
                    neighbor.manhattan_distance(target),
                );
            }
        }

        None
    }

    /// Finds the shortest path by hop count to the nearest cell of `category`
    /// using breadth-first search.
    pub fn shortest_path_to_category(
        &mut self,
        view: BeliefView<'_>,
        start: CellCoord,
        category: TileCategory,
    ) -> Option<Path> {
        let start_index = self.prepare(&view, start)?;
        if view.category(start) == Some(category) {
            return Some(Path::default());
        }

        self.costs[start_index] = 0;
        self.queue.push_back(start_index);

        while let Some(current_index) = self.queue.pop_front() {
            let cell = self.cell_at(current_index);
            let next_cost = self.costs[current_index].saturating_add(1);

            for neighbor in passable_neighbors(view, cell) {
                let Some(neighbor_index) = self.index(neighbor) else {
                    continue;
                };
                if self.costs[neighbor_index] != u32::MAX {
                    continue;
                }

                self.costs[neighbor_index] = next_cost;
                self.came_from[neighbor_index] = Some(current_index);
                if view.category(neighbor) == Some(category) {
                    return Some(self.reconstruct(neighbor_index));
                }
                self.queue.push_back(neighbor_index);
            }
        }

        None
    }

    /// Resets the scratch buffers for the view and returns the start index.
    fn prepare(&mut self, view: &BeliefView<'_>, start: CellCoord) -> Option<usize> {
        let (columns, rows) = view.dimensions();
        let cell_count = usize::try_from(u64::from(columns) * u64::from(rows)).ok()?;

        self.columns = columns;
        if self.costs.len() != cell_count {
            self.costs = vec![u32::MAX; cell_count];
            self.came_from = vec![None; cell_count];
        } else {
            self.costs.fill(u32::MAX);
            self.came_from.fill(None);
        }
        self.frontier.clear();
        self.queue.clear();
        self.sequence = 0;

        if !view.in_bounds(start) {
            return None;
        }
        self.index(start)
    }

    fn push_frontier(&mut self, index: usize, cost: u32, heuristic: u32) {
        self.sequence = self.sequence.wrapping_add(1);
        self.frontier.push(FrontierEntry {
            estimate: cost.saturating_add(heuristic),
            heuristic,
            sequence: self.sequence,
            cost,
            index,
        });
    }

    fn reconstruct(&self, goal_index: usize) -> Path {
        let mut steps = Vec::new();
        let mut cursor = goal_index;
        while let Some(previous) = self.came_from[cursor] {
            steps.push(self.cell_at(cursor));
            cursor = previous;
        }
        steps.reverse();
        Path { steps }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        let column = usize::try_from(cell.column()).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    fn cell_at(&self, index: usize) -> CellCoord {
        let width = usize::try_from(self.columns).unwrap_or(usize::MAX).max(1);
        let column = u32::try_from(index % width).unwrap_or(u32::MAX);
        let row = u32::try_from(index / width).unwrap_or(u32::MAX);
        CellCoord::new(column, row)
    }
}

/// Heap entry ordered so that the lowest estimate pops first, then the entry
/// closest to the goal, then the oldest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FrontierEntry {
    estimate: u32,
    heuristic: u32,
    sequence: u64,
    cost: u32,
    index: usize,
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (
            other.estimate,
            other.heuristic,
            other.sequence,
            other.cost,
            other.index,
        )
            .cmp(&(
                self.estimate,
                self.heuristic,
                self.sequence,
                self.cost,
                self.index,
            ))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn passable_neighbors<'v>(
    view: BeliefView<'v>,
    cell: CellCoord,
) -> impl Iterator<Item = CellCoord> + 'v {
    Direction::ALL
        .into_iter()
        .filter_map(move |direction| cell.step(direction))
        .filter(move |neighbor| view.is_passable(*neighbor))
}

#[cfg(test)]
mod tests {
    use fog_harvest_core::Tile;

    use super::*;

    fn grid(rows: &[&str]) -> (Vec<Tile>, u32, u32) {
        let height = u32::try_from(rows.len()).expect("row count fits");
        let width = u32::try_from(rows[0].len()).expect("column count fits");
        let tiles = rows
            .iter()
            .flat_map(|row| row.chars())
            .map(|symbol| match symbol {
                '#' => Tile::Wall,
                'b' => Tile::FriendlyBase,
                '?' => Tile::Unknown,
                _ => Tile::Empty,
            })
            .collect();
        (tiles, width, height)
    }

    #[test]
    fn frontier_pops_lowest_estimate_first() {
        let mut heap = BinaryHeap::new();
        for (estimate, heuristic, sequence) in [(5, 1, 1), (3, 2, 2), (3, 1, 3), (3, 1, 4)] {
            heap.push(FrontierEntry {
                estimate,
                heuristic,
                sequence,
                cost: 0,
                index: 0,
            });
        }

        let order: Vec<_> = std::iter::from_fn(|| heap.pop())
            .map(|entry| entry.sequence)
            .collect();
        assert_eq!(order, vec![3, 4, 2, 1]);
    }

    #[test]
    fn open_grid_example_reaches_base_in_two_steps() {
        let (tiles, width, height) = grid(&["...", ".b.", "..."]);
        let view = BeliefView::new(&tiles, width, height);
        let mut pathfinder = Pathfinder::new();

        let path = pathfinder
            .find_path(view, CellCoord::new(0, 0), Goal::Cell(CellCoord::new(1, 1)))
            .expect("open grid is connected");

        assert_eq!(path.len(), 2);
        assert_eq!(path.destination(), Some(CellCoord::new(1, 1)));
        assert!(
            path.steps() == [CellCoord::new(1, 0), CellCoord::new(1, 1)]
                || path.steps() == [CellCoord::new(0, 1), CellCoord::new(1, 1)]
        );
    }

    #[test]
    fn category_goal_resolves_before_searching() {
        let (tiles, width, height) = grid(&["....", ".#..", "...b"]);
        let view = BeliefView::new(&tiles, width, height);
        let mut pathfinder = Pathfinder::new();

        let path = pathfinder
            .find_path(
                view,
                CellCoord::new(0, 0),
                Goal::Category(TileCategory::FriendlyBase),
            )
            .expect("base reachable");

        assert_eq!(path.len(), 5);
        assert_eq!(path.destination(), Some(CellCoord::new(3, 2)));
    }

    #[test]
    fn start_on_goal_is_an_empty_success() {
        let (tiles, width, height) = grid(&["b."]);
        let view = BeliefView::new(&tiles, width, height);
        let mut pathfinder = Pathfinder::new();

        let astar = pathfinder.find_path(
            view,
            CellCoord::new(0, 0),
            Goal::Category(TileCategory::FriendlyBase),
        );
        let bfs = pathfinder.shortest_path_to_category(
            view,
            CellCoord::new(0, 0),
            TileCategory::FriendlyBase,
        );

        assert_eq!(astar, Some(Path::default()));
        assert_eq!(bfs, Some(Path::default()));
    }

    #[test]
    fn detours_around_walls() {
        let (tiles, width, height) = grid(&[".#..", ".#.#", "...."]);
        let view = BeliefView::new(&tiles, width, height);
        let mut pathfinder = Pathfinder::new();

        let path = pathfinder
            .find_path(view, CellCoord::new(0, 0), Goal::Cell(CellCoord::new(2, 0)))
            .expect("detour exists");

        assert_eq!(
            path.into_vec(),
            vec![
                CellCoord::new(0, 1),
                CellCoord::new(0, 2),
                CellCoord::new(1, 2),
                CellCoord::new(2, 2),
                CellCoord::new(2, 1),
                CellCoord::new(2, 0),
            ]
        );
    }

    #[test]
    fn unknown_tiles_are_planned_through() {
        let (tiles, width, height) = grid(&["???", "?#?", "??b"]);
        let view = BeliefView::new(&tiles, width, height);
        let mut pathfinder = Pathfinder::new();

        let path = pathfinder
            .shortest_path_to_category(view, CellCoord::new(0, 0), TileCategory::FriendlyBase)
            .expect("unknown cells are traversable");

        assert_eq!(path.len(), 4);
    }

    #[test]
    fn out_of_bounds_start_or_goal_is_not_found() {
        let (tiles, width, height) = grid(&["..", ".."]);
        let view = BeliefView::new(&tiles, width, height);
        let mut pathfinder = Pathfinder::new();

        assert!(pathfinder
            .find_path(view, CellCoord::new(5, 5), Goal::Cell(CellCoord::new(0, 0)))
            .is_none());
        assert!(pathfinder
            .find_path(view, CellCoord::new(0, 0), Goal::Cell(CellCoord::new(2, 0)))
            .is_none());
        assert!(pathfinder
            .find_path(view, CellCoord::new(0, 0), Goal::Category(TileCategory::FriendlyBase))
            .is_none());
    }

    #[test]
    fn scratch_buffers_survive_dimension_changes() {
        let mut pathfinder = Pathfinder::new();
        let (large, large_width, large_height) = grid(&["....b", ".....", "....."]);
        let (small, small_width, small_height) = grid(&[".b"]);

        let first = pathfinder.find_path(
            BeliefView::new(&large, large_width, large_height),
            CellCoord::new(0, 2),
            Goal::Category(TileCategory::FriendlyBase),
        );
        let second = pathfinder.find_path(
            BeliefView::new(&small, small_width, small_height),
            CellCoord::new(0, 0),
            Goal::Category(TileCategory::FriendlyBase),
        );

        assert_eq!(first.map(|path| path.len()), Some(6));
        assert_eq!(second.map(|path| path.len()), Some(1));
    }
}

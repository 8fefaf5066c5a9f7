//! A* pathfinding.
//!
//! Two layers:
//! - A graph-agnostic best-first search ([`find_path`]) over any node type
//!   implementing [`HasNeighbours`], producing a persistent [`Path`].
//! - A tile navigation grid ([`NavGrid`]) whose cells are exposed as graph
//!   nodes, and [`plan_route`] which turns a grid search into world
//!   waypoints.
//!
//! Costs are fixed-point so that searches are reproducible on every client.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

// ============================================================================
// Generic search
// ============================================================================

/// Capability of a graph node to enumerate its neighbours.
pub trait HasNeighbours: Sized {
    /// Iterator (or collection) of neighbouring nodes.
    type Neighbours: IntoIterator<Item = Self>;

    /// Nodes reachable from this one in a single step.
    fn neighbours(&self) -> Self::Neighbours;
}

struct PathStep<N> {
    last_step: N,
    previous: Option<Rc<PathStep<N>>>,
    total_cost: Fixed,
}

impl<N> Drop for PathStep<N> {
    // Unlink iteratively so long chains don't recurse on drop.
    fn drop(&mut self) {
        let mut previous = self.previous.take();
        while let Some(step) = previous {
            match Rc::try_unwrap(step) {
                Ok(mut inner) => previous = inner.previous.take(),
                Err(_) => break,
            }
        }
    }
}

/// An immutable chain of steps ending at [`last_step`](Path::last_step).
///
/// Extending a path never mutates it: [`add_step`](Path::add_step) returns
/// a new path that shares this one as its tail. Iteration runs from the
/// most recent step back to the start.
pub struct Path<N> {
    head: Rc<PathStep<N>>,
}

impl<N> Path<N> {
    /// Create a zero-cost path containing only `start`.
    #[must_use]
    pub fn new(start: N) -> Self {
        Self {
            head: Rc::new(PathStep {
                last_step: start,
                previous: None,
                total_cost: Fixed::ZERO,
            }),
        }
    }

    /// Extend the path by one step costing `step_cost`.
    #[must_use]
    pub fn add_step(&self, step: N, step_cost: Fixed) -> Self {
        Self {
            head: Rc::new(PathStep {
                last_step: step,
                previous: Some(Rc::clone(&self.head)),
                total_cost: self.head.total_cost + step_cost,
            }),
        }
    }

    /// The most recent node on the path.
    #[must_use]
    pub fn last_step(&self) -> &N {
        &self.head.last_step
    }

    /// The path without its most recent step, or `None` at the start.
    #[must_use]
    pub fn previous_steps(&self) -> Option<Self> {
        self.head
            .previous
            .as_ref()
            .map(|previous| Self {
                head: Rc::clone(previous),
            })
    }

    /// Sum of all step costs.
    #[must_use]
    pub fn total_cost(&self) -> Fixed {
        self.head.total_cost
    }

    /// Number of nodes on the path, start included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Always false: a path holds at least its start node.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of steps taken from the start.
    #[must_use]
    pub fn hops(&self) -> usize {
        self.len() - 1
    }

    /// Iterate from the most recent step back to the start.
    pub fn iter(&self) -> PathIter<'_, N> {
        PathIter {
            next: Some(&self.head),
        }
    }

    /// Collect the nodes in travel order (start first).
    #[must_use]
    pub fn to_vec_from_start(&self) -> Vec<N>
    where
        N: Clone,
    {
        let mut nodes: Vec<N> = self.iter().cloned().collect();
        nodes.reverse();
        nodes
    }
}

impl<N> Clone for Path<N> {
    fn clone(&self) -> Self {
        Self {
            head: Rc::clone(&self.head),
        }
    }
}

impl<N: fmt::Debug> fmt::Debug for Path<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Path")
            .field("steps", &self.iter().collect::<Vec<_>>())
            .field("total_cost", &self.total_cost())
            .finish()
    }
}

/// Iterator over a [`Path`], most recent step first.
pub struct PathIter<'a, N> {
    next: Option<&'a PathStep<N>>,
}

impl<'a, N> Iterator for PathIter<'a, N> {
    type Item = &'a N;

    fn next(&mut self) -> Option<Self::Item> {
        let step = self.next?;
        self.next = step.previous.as_deref();
        Some(&step.last_step)
    }
}

impl<'a, N> IntoIterator for &'a Path<N> {
    type Item = &'a N;
    type IntoIter = PathIter<'a, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Priority queue with FIFO ordering among equal priorities.
///
/// Entries come out in ascending priority order.
#[derive(Debug, Clone)]
pub struct PriorityQueue<P, V> {
    buckets: BTreeMap<P, VecDeque<V>>,
    len: usize,
}

impl<P: Ord, V> PriorityQueue<P, V> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
            len: 0,
        }
    }

    /// Add a value with the given priority.
    pub fn enqueue(&mut self, priority: P, value: V) {
        self.buckets.entry(priority).or_default().push_back(value);
        self.len += 1;
    }

    /// Remove the oldest value of the lowest priority.
    pub fn dequeue(&mut self) -> Option<V> {
        let mut bucket = self.buckets.first_entry()?;
        let value = bucket.get_mut().pop_front();
        if bucket.get().is_empty() {
            bucket.remove();
        }
        if value.is_some() {
            self.len -= 1;
        }
        value
    }

    /// Lowest priority currently queued.
    #[must_use]
    pub fn peek_priority(&self) -> Option<&P> {
        self.buckets.keys().next()
    }

    /// Number of queued values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<P: Ord, V> Default for PriorityQueue<P, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a search that may be cancelled.
#[derive(Debug, Clone)]
pub enum SearchOutcome<N> {
    /// The destination was reached.
    Found(Path<N>),
    /// Every reachable node was expanded without reaching the destination.
    NotFound,
    /// The caller asked the search to stop.
    Cancelled {
        /// Nodes expanded before stopping.
        expanded: usize,
    },
}

impl<N> SearchOutcome<N> {
    /// Convert to the found path, if any.
    #[must_use]
    pub fn into_path(self) -> Option<Path<N>> {
        match self {
            Self::Found(path) => Some(path),
            Self::NotFound | Self::Cancelled { .. } => None,
        }
    }
}

/// Find the cheapest path from `start` to `destination`.
///
/// * `distance` - exact cost of moving between two neighbouring nodes
/// * `estimate` - estimated remaining cost from a node to the destination
///
/// Returns `None` when the destination is unreachable. The result is only
/// guaranteed optimal when `estimate` never overestimates.
pub fn find_path<N, D, E>(start: N, destination: &N, distance: D, estimate: E) -> Option<Path<N>>
where
    N: HasNeighbours + Clone + Eq + Hash,
    D: FnMut(&N, &N) -> Fixed,
    E: FnMut(&N) -> Fixed,
{
    find_path_with(start, destination, distance, estimate, |_| true).into_path()
}

/// [`find_path`] with a cooperative cancellation check.
///
/// `keep_going` is called before each pop with the number of nodes expanded
/// so far; returning `false` stops the search.
pub fn find_path_with<N, D, E, C>(
    start: N,
    destination: &N,
    mut distance: D,
    mut estimate: E,
    mut keep_going: C,
) -> SearchOutcome<N>
where
    N: HasNeighbours + Clone + Eq + Hash,
    D: FnMut(&N, &N) -> Fixed,
    E: FnMut(&N) -> Fixed,
    C: FnMut(usize) -> bool,
{
    let mut closed: HashSet<N> = HashSet::new();
    let mut queue: PriorityQueue<Fixed, Path<N>> = PriorityQueue::new();
    queue.enqueue(Fixed::ZERO, Path::new(start));

    while !queue.is_empty() {
        if !keep_going(closed.len()) {
            tracing::debug!(expanded = closed.len(), "Path search cancelled");
            return SearchOutcome::Cancelled {
                expanded: closed.len(),
            };
        }

        let Some(path) = queue.dequeue() else {
            break;
        };

        // Stale entry for a node that was already expanded more cheaply.
        if closed.contains(path.last_step()) {
            continue;
        }

        if path.last_step() == destination {
            tracing::trace!(
                expanded = closed.len(),
                hops = path.hops(),
                "Path found"
            );
            return SearchOutcome::Found(path);
        }

        closed.insert(path.last_step().clone());

        for neighbour in path.last_step().neighbours() {
            let step_cost = distance(path.last_step(), &neighbour);
            let priority = path.total_cost() + step_cost + estimate(&neighbour);
            let new_path = path.add_step(neighbour, step_cost);
            queue.enqueue(priority, new_path);
        }
    }

    tracing::trace!(expanded = closed.len(), "No path found");
    SearchOutcome::NotFound
}

// ============================================================================
// Navigation grid
// ============================================================================

/// Cell types for navigation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellType {
    /// Normal walkable terrain (cost: 1).
    #[default]
    Walkable,
    /// Impassable terrain.
    Blocked,
    /// Slow terrain with 2x movement cost.
    SlowTerrain,
}

impl CellType {
    /// Returns the movement cost for this cell type.
    /// Returns `None` for blocked cells.
    #[must_use]
    pub const fn movement_cost(self) -> Option<Fixed> {
        match self {
            Self::Walkable => Some(Fixed::ONE),
            Self::Blocked => None,
            Self::SlowTerrain => Some(Fixed::const_from_int(2)),
        }
    }

    /// Returns true if this cell is walkable.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Blocked)
    }
}

/// Tile grid used for route planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavGrid {
    /// Grid width in cells.
    width: u32,
    /// Grid height in cells.
    height: u32,
    /// Cell data stored in row-major order.
    cells: Vec<CellType>,
    /// Size of each cell in world units.
    #[serde(with = "fixed_serde")]
    cell_size: Fixed,
}

impl NavGrid {
    /// Create a new navigation grid with all cells walkable.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero, or if `cell_size` is not positive.
    #[must_use]
    pub fn new(width: u32, height: u32, cell_size: Fixed) -> Self {
        Self::from_fn(width, height, cell_size, |_, _| CellType::Walkable)
    }

    /// Create a grid whose cell types come from `cell_at(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero, or if `cell_size` is not positive.
    #[must_use]
    pub fn from_fn<F>(width: u32, height: u32, cell_size: Fixed, mut cell_at: F) -> Self
    where
        F: FnMut(u32, u32) -> CellType,
    {
        assert!(width > 0, "NavGrid width must be positive");
        assert!(height > 0, "NavGrid height must be positive");
        assert!(
            cell_size > Fixed::ZERO,
            "NavGrid cell_size must be positive"
        );

        let mut cells = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                cells.push(cell_at(x, y));
            }
        }

        Self {
            width,
            height,
            cells,
            cell_size,
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Cell size in world units.
    #[must_use]
    pub const fn cell_size(&self) -> Fixed {
        self.cell_size
    }

    #[inline]
    fn coords_to_index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Check if coordinates are within grid bounds.
    #[must_use]
    pub fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Get cell type at coordinates.
    /// Returns `None` if out of bounds.
    #[must_use]
    pub fn get_cell(&self, x: u32, y: u32) -> Option<CellType> {
        if self.in_bounds(x, y) {
            Some(self.cells[self.coords_to_index(x, y)])
        } else {
            None
        }
    }

    /// Set cell type at coordinates.
    /// Returns `false` if out of bounds.
    pub fn set_cell(&mut self, x: u32, y: u32, cell_type: CellType) -> bool {
        if self.in_bounds(x, y) {
            let index = self.coords_to_index(x, y);
            self.cells[index] = cell_type;
            true
        } else {
            false
        }
    }

    /// Check if a cell is walkable. Out-of-bounds cells are not.
    #[must_use]
    pub fn is_walkable(&self, x: u32, y: u32) -> bool {
        self.get_cell(x, y).is_some_and(|c| c.is_walkable())
    }

    /// Convert world position to grid coordinates.
    ///
    /// Returns `None` if the position is outside the grid bounds.
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec2Fixed) -> Option<(u32, u32)> {
        if pos.x < Fixed::ZERO || pos.y < Fixed::ZERO {
            return None;
        }

        let x = (pos.x / self.cell_size).to_num::<i64>();
        let y = (pos.y / self.cell_size).to_num::<i64>();

        if x < self.width as i64 && y < self.height as i64 {
            Some((x as u32, y as u32))
        } else {
            None
        }
    }

    /// Convert grid coordinates to world position (center of cell).
    #[must_use]
    pub fn grid_to_world(&self, x: u32, y: u32) -> Vec2Fixed {
        let half = self.cell_size / Fixed::from_num(2);
        Vec2Fixed::new(
            Fixed::from_num(x) * self.cell_size + half,
            Fixed::from_num(y) * self.cell_size + half,
        )
    }

    /// Get movement cost for a cell.
    /// Returns `None` for blocked or out-of-bounds cells.
    #[must_use]
    pub fn movement_cost(&self, x: u32, y: u32) -> Option<Fixed> {
        self.get_cell(x, y).and_then(|c| c.movement_cost())
    }

    /// Graph node for the cell at `(x, y)`.
    #[must_use]
    pub fn node(&self, x: u32, y: u32) -> GridNode<'_> {
        GridNode { grid: self, x, y }
    }
}

/// Direction offsets for 8-directional movement.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// A cell of a [`NavGrid`] viewed as a graph node.
///
/// Equality and hashing use the coordinates only.
#[derive(Debug, Clone, Copy)]
pub struct GridNode<'a> {
    grid: &'a NavGrid,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl PartialEq for GridNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Eq for GridNode<'_> {}

impl Hash for GridNode<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.hash(state);
        self.y.hash(state);
    }
}

impl<'a> HasNeighbours for GridNode<'a> {
    type Neighbours = Vec<GridNode<'a>>;

    fn neighbours(&self) -> Self::Neighbours {
        DIRECTIONS
            .iter()
            .filter_map(|&(dx, dy)| {
                let nx = self.x.checked_add_signed(dx)?;
                let ny = self.y.checked_add_signed(dy)?;
                if !self.grid.is_walkable(nx, ny) {
                    return None;
                }
                // No corner cutting past blocked cells.
                if dx != 0 && dy != 0
                    && (!self.grid.is_walkable(nx, self.y) || !self.grid.is_walkable(self.x, ny))
                {
                    return None;
                }
                Some(self.grid.node(nx, ny))
            })
            .collect()
    }
}

/// Chebyshev distance between two cells (admissible for 8-directional moves).
#[inline]
fn chebyshev_heuristic(x1: u32, y1: u32, x2: u32, y2: u32) -> Fixed {
    Fixed::from_num(x1.abs_diff(x2).max(y1.abs_diff(y2)))
}

/// Plan a route across the grid from `start` to `goal` (world positions).
///
/// Returns cell-center waypoints in travel order, starting with the start cell.
///
/// # Errors
///
/// Returns `NavError::InvalidState` if:
/// - Start or goal position is outside the grid
/// - Start or goal position is blocked
/// - No path exists between start and goal
pub fn plan_route(grid: &NavGrid, start: Vec2Fixed, goal: Vec2Fixed) -> Result<Vec<Vec2Fixed>> {
    let (start_x, start_y) = grid
        .world_to_grid(start)
        .ok_or_else(|| NavError::InvalidState("Start position outside grid".into()))?;

    let (goal_x, goal_y) = grid
        .world_to_grid(goal)
        .ok_or_else(|| NavError::InvalidState("Goal position outside grid".into()))?;

    if !grid.is_walkable(start_x, start_y) {
        return Err(NavError::InvalidState("Start position is blocked".into()));
    }
    if !grid.is_walkable(goal_x, goal_y) {
        return Err(NavError::InvalidState("Goal position is blocked".into()));
    }

    let goal_node = grid.node(goal_x, goal_y);
    let path = find_path(
        grid.node(start_x, start_y),
        &goal_node,
        |_, to| grid.movement_cost(to.x, to.y).unwrap_or(Fixed::MAX),
        |node| chebyshev_heuristic(node.x, node.y, goal_x, goal_y),
    )
    .ok_or_else(|| {
        NavError::InvalidState(format!(
            "No path from ({start_x}, {start_y}) to ({goal_x}, {goal_y})"
        ))
    })?;

    tracing::debug!(
        from = ?(start_x, start_y),
        to = ?(goal_x, goal_y),
        hops = path.hops(),
        "Planned route"
    );

    Ok(path
        .to_vec_from_start()
        .into_iter()
        .map(|node| grid.grid_to_world(node.x, node.y))
        .collect())
}

/// Smooth a route by removing unnecessary waypoints.
///
/// Uses line-of-sight checks to skip intermediate waypoints while
/// ensuring the route doesn't cut through obstacles.
#[must_use]
pub fn smooth_path(grid: &NavGrid, path: Vec<Vec2Fixed>) -> Vec<Vec2Fixed> {
    if path.len() <= 2 {
        return path;
    }

    let mut smoothed = Vec::with_capacity(path.len());
    smoothed.push(path[0]);

    let mut current_idx = 0;

    while current_idx < path.len() - 1 {
        let mut furthest_visible = current_idx + 1;

        for check_idx in (current_idx + 2)..path.len() {
            if has_line_of_sight(grid, path[current_idx], path[check_idx]) {
                furthest_visible = check_idx;
            }
        }

        smoothed.push(path[furthest_visible]);
        current_idx = furthest_visible;
    }

    smoothed
}

/// Plan a smoothed route and turn it into waypoints to queue.
///
/// The start cell is dropped and the last waypoint is `goal` itself rather
/// than the center of its cell.
///
/// # Errors
///
/// Same as [`plan_route`].
pub fn plan_waypoints(grid: &NavGrid, start: Vec2Fixed, goal: Vec2Fixed) -> Result<Vec<Vec2Fixed>> {
    let route = smooth_path(grid, plan_route(grid, start, goal)?);

    let mut waypoints: Vec<Vec2Fixed> = route.into_iter().skip(1).collect();
    match waypoints.last_mut() {
        Some(last) => *last = goal,
        None => waypoints.push(goal),
    }
    Ok(waypoints)
}

/// Check if there's a clear line of sight between two world positions.
///
/// Steps through grid cells Bresenham-style, refusing diagonal squeezes.
fn has_line_of_sight(grid: &NavGrid, start: Vec2Fixed, end: Vec2Fixed) -> bool {
    let Some((x0, y0)) = grid.world_to_grid(start) else {
        return false;
    };
    let Some((x1, y1)) = grid.world_to_grid(end) else {
        return false;
    };

    let walkable = |x: i64, y: i64| {
        x >= 0 && y >= 0 && grid.is_walkable(x as u32, y as u32)
    };

    let (x1, y1) = (i64::from(x1), i64::from(y1));
    let dx = (x1 - i64::from(x0)).abs();
    let dy = (y1 - i64::from(y0)).abs();
    let sx = if i64::from(x0) < x1 { 1 } else { -1 };
    let sy = if i64::from(y0) < y1 { 1 } else { -1 };
    let mut err = dx - dy;

    let mut x = i64::from(x0);
    let mut y = i64::from(y0);

    loop {
        if !walkable(x, y) {
            return false;
        }

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 > -dy && e2 < dx && (!walkable(x + sx, y) || !walkable(x, y + sy)) {
            return false;
        }

        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn vec2(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::from_ints(x, y)
    }

    /// Directed weighted graph for exercising the generic search.
    #[derive(Debug)]
    struct Graph {
        edges: Vec<Vec<(usize, i32)>>,
    }

    impl Graph {
        fn new(nodes: usize, edges: &[(usize, usize, i32)]) -> Rc<Self> {
            let mut adjacency = vec![Vec::new(); nodes];
            for &(from, to, cost) in edges {
                adjacency[from].push((to, cost));
            }
            Rc::new(Self { edges: adjacency })
        }

        fn cost(&self, from: usize, to: usize) -> Fixed {
            self.edges[from]
                .iter()
                .filter(|(target, _)| *target == to)
                .map(|(_, cost)| Fixed::from_num(*cost))
                .min()
                .unwrap_or(Fixed::MAX)
        }

        /// Reference Dijkstra over the same graph.
        fn shortest(&self, start: usize, goal: usize) -> Option<Fixed> {
            let mut best: Vec<Option<Fixed>> = vec![None; self.edges.len()];
            let mut done = vec![false; self.edges.len()];
            best[start] = Some(Fixed::ZERO);
            loop {
                let current = (0..self.edges.len())
                    .filter(|&n| !done[n] && best[n].is_some())
                    .min_by_key(|&n| best[n])?;
                if current == goal {
                    return best[goal];
                }
                done[current] = true;
                let base = best[current]?;
                for &(to, cost) in &self.edges[current] {
                    let candidate = base + Fixed::from_num(cost);
                    if best[to].map_or(true, |b| candidate < b) {
                        best[to] = Some(candidate);
                    }
                }
            }
        }
    }

    #[derive(Debug, Clone)]
    struct Node {
        id: usize,
        graph: Rc<Graph>,
    }

    impl PartialEq for Node {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    impl Eq for Node {}

    impl Hash for Node {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl HasNeighbours for Node {
        type Neighbours = Vec<Node>;

        fn neighbours(&self) -> Vec<Node> {
            self.graph.edges[self.id]
                .iter()
                .map(|&(id, _)| Node {
                    id,
                    graph: Rc::clone(&self.graph),
                })
                .collect()
        }
    }

    fn node(graph: &Rc<Graph>, id: usize) -> Node {
        Node {
            id,
            graph: Rc::clone(graph),
        }
    }

    fn search(graph: &Rc<Graph>, start: usize, goal: usize) -> Option<Path<Node>> {
        let g = Rc::clone(graph);
        find_path(
            node(graph, start),
            &node(graph, goal),
            move |a, b| g.cost(a.id, b.id),
            |_| Fixed::ZERO,
        )
    }

    #[test]
    fn test_chain_degenerates_to_uniform_cost() {
        // A - B - C with unit edges, both directions.
        let graph = Graph::new(3, &[(0, 1, 1), (1, 0, 1), (1, 2, 1), (2, 1, 1)]);
        let path = search(&graph, 0, 2).unwrap();

        let ids: Vec<usize> = path.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 1, 0]);
        assert_eq!(path.total_cost(), fixed(2));
        assert_eq!(path.hops(), 2);
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_start_is_destination() {
        let graph = Graph::new(2, &[(0, 1, 1)]);
        let path = search(&graph, 0, 0).unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path.total_cost(), Fixed::ZERO);
        assert!(path.previous_steps().is_none());
    }

    #[test]
    fn test_prefers_cheaper_longer_route() {
        // Direct edge costs 10, detour via 1 costs 2.
        let graph = Graph::new(3, &[(0, 2, 10), (0, 1, 1), (1, 2, 1)]);
        let path = search(&graph, 0, 2).unwrap();
        assert_eq!(path.total_cost(), fixed(2));
        assert_eq!(path.to_vec_from_start().iter().map(|n| n.id).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_disconnected_graph_returns_none() {
        let graph = Graph::new(4, &[(0, 1, 1), (1, 0, 1), (2, 3, 1)]);
        assert!(search(&graph, 0, 3).is_none());
    }

    #[test]
    fn test_cycles_terminate() {
        let graph = Graph::new(
            4,
            &[(0, 1, 1), (1, 2, 1), (2, 0, 1), (2, 1, 1), (1, 0, 1)],
        );
        assert!(search(&graph, 0, 3).is_none());
    }

    #[test]
    fn test_cancellation_stops_search() {
        let graph = Graph::new(3, &[(0, 1, 1), (1, 2, 1)]);
        let g = Rc::clone(&graph);
        let outcome = find_path_with(
            node(&graph, 0),
            &node(&graph, 2),
            move |a, b| g.cost(a.id, b.id),
            |_| Fixed::ZERO,
            |expanded| expanded < 1,
        );
        assert!(matches!(outcome, SearchOutcome::Cancelled { expanded: 1 }));
        assert!(outcome.into_path().is_none());
    }

    #[test]
    fn test_path_is_persistent() {
        let base = Path::new('a').add_step('b', fixed(1));
        let left = base.add_step('c', fixed(2));
        let right = base.add_step('d', fixed(5));

        assert_eq!(left.iter().copied().collect::<String>(), "cba");
        assert_eq!(right.iter().copied().collect::<String>(), "dba");
        assert_eq!(base.total_cost(), fixed(1));
        assert_eq!(left.total_cost(), fixed(3));
        assert_eq!(right.total_cost(), fixed(6));
        assert_eq!(*right.previous_steps().unwrap().last_step(), 'b');
    }

    #[test]
    fn test_long_path_drops_without_overflow() {
        let mut path = Path::new(0u32);
        for i in 1..200_000 {
            path = path.add_step(i, Fixed::ONE);
        }
        assert_eq!(*path.last_step(), 199_999);
        drop(path);
    }

    #[test]
    fn test_priority_queue_fifo_within_priority() {
        let mut queue = PriorityQueue::new();
        queue.enqueue(2, "late");
        queue.enqueue(1, "first");
        queue.enqueue(1, "second");
        queue.enqueue(0, "zero");

        assert_eq!(queue.len(), 4);
        assert_eq!(queue.peek_priority(), Some(&0));
        assert_eq!(queue.dequeue(), Some("zero"));
        assert_eq!(queue.dequeue(), Some("first"));
        assert_eq!(queue.dequeue(), Some("second"));
        assert_eq!(queue.dequeue(), Some("late"));
        assert_eq!(queue.dequeue(), None);
        assert!(queue.is_empty());
    }

    proptest! {
        #[test]
        fn prop_search_matches_dijkstra(
            nodes in 2usize..8,
            raw_edges in proptest::collection::vec((0usize..8, 0usize..8, 1i32..10), 0..24),
        ) {
            let edges: Vec<_> = raw_edges
                .into_iter()
                .filter(|(from, to, _)| *from < nodes && *to < nodes)
                .collect();
            let graph = Graph::new(nodes, &edges);
            let found = search(&graph, 0, nodes - 1);
            let expected = graph.shortest(0, nodes - 1);
            prop_assert_eq!(found.as_ref().map(Path::total_cost), expected);
            if let Some(path) = found {
                prop_assert_eq!(path.last_step().id, nodes - 1);
                prop_assert_eq!(path.iter().last().map(|n| n.id), Some(0));
                prop_assert_eq!(path.len(), path.hops() + 1);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Grid routes
    // ------------------------------------------------------------------------

    #[test]
    fn test_cell_type_costs() {
        assert_eq!(CellType::Walkable.movement_cost(), Some(Fixed::ONE));
        assert_eq!(CellType::Blocked.movement_cost(), None);
        assert_eq!(
            CellType::SlowTerrain.movement_cost(),
            Some(Fixed::from_num(2))
        );
    }

    #[test]
    fn test_world_to_grid_conversion() {
        let grid = NavGrid::new(10, 10, fixed(2));

        assert_eq!(grid.world_to_grid(vec2(1, 1)), Some((0, 0)));
        assert_eq!(grid.world_to_grid(vec2(3, 3)), Some((1, 1)));
        assert_eq!(grid.world_to_grid(vec2(19, 19)), Some((9, 9)));
        assert_eq!(grid.world_to_grid(vec2(20, 20)), None);
        assert_eq!(grid.world_to_grid(vec2(-1, 0)), None);
        assert_eq!(grid.grid_to_world(1, 1), vec2(3, 3));
    }

    #[test]
    fn test_from_fn_layout_is_row_major() {
        let grid = NavGrid::from_fn(3, 2, fixed(1), |x, y| {
            if x == 2 && y == 1 {
                CellType::Blocked
            } else {
                CellType::Walkable
            }
        });
        assert!(grid.is_walkable(2, 0));
        assert!(!grid.is_walkable(2, 1));
        assert!(!grid.is_walkable(3, 0));
    }

    #[test]
    fn test_grid_node_neighbours_skip_corners() {
        let mut grid = NavGrid::new(3, 3, fixed(1));
        grid.set_cell(1, 0, CellType::Blocked);

        let neighbours: Vec<(u32, u32)> = grid
            .node(0, 0)
            .neighbours()
            .into_iter()
            .map(|n| (n.x, n.y))
            .collect();
        // (1, 0) blocked, diagonal (1, 1) would cut its corner.
        assert_eq!(neighbours, vec![(0, 1)]);
    }

    #[test]
    fn test_route_around_wall() {
        let mut grid = NavGrid::new(10, 10, fixed(1));
        for y in 2..8 {
            grid.set_cell(5, y, CellType::Blocked);
        }

        let route = plan_route(&grid, vec2(2, 5), vec2(8, 5)).unwrap();
        assert_eq!(grid.world_to_grid(route[0]), Some((2, 5)));
        assert_eq!(grid.world_to_grid(*route.last().unwrap()), Some((8, 5)));
        for point in &route {
            let (gx, gy) = grid.world_to_grid(*point).unwrap();
            assert!(grid.is_walkable(gx, gy), "route crosses ({gx}, {gy})");
        }
    }

    #[test]
    fn test_route_errors() {
        let mut grid = NavGrid::new(10, 10, fixed(1));
        for y in 0..10 {
            grid.set_cell(5, y, CellType::Blocked);
        }
        assert!(plan_route(&grid, vec2(2, 5), vec2(8, 5)).is_err());
        assert!(plan_route(&grid, vec2(5, 5), vec2(8, 5)).is_err());
        assert!(plan_route(&grid, vec2(2, 5), vec2(5, 1)).is_err());
        assert!(plan_route(&grid, vec2(2, 5), vec2(50, 1)).is_err());
    }

    #[test]
    fn test_route_to_same_cell() {
        let grid = NavGrid::new(10, 10, fixed(1));
        let route = plan_route(&grid, vec2(5, 5), vec2(5, 5)).unwrap();
        assert_eq!(route.len(), 1);
    }

    #[test]
    fn test_route_avoids_slow_terrain_when_cheaper() {
        let mut grid = NavGrid::new(7, 3, fixed(1));
        for x in 1..6 {
            grid.set_cell(x, 1, CellType::SlowTerrain);
        }
        let route = plan_route(&grid, vec2(0, 1), vec2(6, 1)).unwrap();
        let slow_cells = route
            .iter()
            .filter_map(|p| grid.world_to_grid(*p))
            .filter(|&(x, y)| grid.get_cell(x, y) == Some(CellType::SlowTerrain))
            .count();
        assert_eq!(slow_cells, 0);
    }

    #[test]
    fn test_route_is_deterministic() {
        let mut grid = NavGrid::new(20, 20, fixed(1));
        for i in 5..15 {
            grid.set_cell(10, i, CellType::Blocked);
        }
        let first = plan_route(&grid, vec2(5, 10), vec2(15, 10)).unwrap();
        let second = plan_route(&grid, vec2(5, 10), vec2(15, 10)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_path_smoothing() {
        let grid = NavGrid::new(10, 10, fixed(1));
        let path = vec![vec2(0, 0), vec2(1, 1), vec2(2, 2), vec2(3, 3), vec2(4, 4)];
        let smoothed = smooth_path(&grid, path);

        assert_eq!(smoothed, vec![vec2(0, 0), vec2(4, 4)]);
    }

    #[test]
    fn test_smoothing_keeps_corner_around_obstacle() {
        let mut grid = NavGrid::new(10, 10, fixed(1));
        for y in 0..8 {
            grid.set_cell(5, y, CellType::Blocked);
        }
        let route = plan_route(&grid, vec2(2, 2), vec2(8, 2)).unwrap();
        let smoothed = smooth_path(&grid, route.clone());
        assert!(smoothed.len() >= 3);
        assert!(smoothed.len() <= route.len());
        assert_eq!(smoothed.first(), route.first());
        assert_eq!(smoothed.last(), route.last());
    }

    #[test]
    fn test_plan_waypoints_ends_on_goal() {
        let mut grid = NavGrid::new(10, 10, fixed(10));
        for y in 0..8 {
            grid.set_cell(5, y, CellType::Blocked);
        }
        let goal = Vec2Fixed::from_ints(83, 21);
        let waypoints = plan_waypoints(&grid, vec2(22, 22), goal).unwrap();

        assert!(waypoints.len() >= 2);
        assert_eq!(waypoints.last().copied(), Some(goal));
        assert_ne!(waypoints.first().copied(), Some(grid.grid_to_world(2, 2)));

        // Same cell: just the goal.
        let goal = Vec2Fixed::from_ints(24, 27);
        assert_eq!(plan_waypoints(&grid, vec2(22, 22), goal).unwrap(), vec![goal]);
    }

    #[test]
    fn test_chebyshev_heuristic() {
        assert_eq!(chebyshev_heuristic(0, 0, 5, 5), fixed(5));
        assert_eq!(chebyshev_heuristic(0, 0, 3, 7), fixed(7));
        assert_eq!(chebyshev_heuristic(5, 5, 5, 5), fixed(0));
    }
}

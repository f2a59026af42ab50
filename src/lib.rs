use std::ops::Index;
use std::rc::Rc;

use anyhow::{ensure, Result};

pub mod encode;
mod fmt;
mod parse;
pub mod solve;

pub use fmt::moves_to_string;

type IndexSet<K> = indexmap::IndexSet<K, fxhash::FxBuildHasher>;

/// Barrier flags are packed into a single `u64`.
pub const MAX_SWITCHES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GoError {
    OutOfBounds,
    Wall,
    Obstacle,
    Barrier,
}

/// `(row, column)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vec2(pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Right = 0,
    Down,
    Left,
    Up,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Right, Self::Down, Self::Left, Self::Up];

    pub fn symbol(self) -> char {
        match self {
            Direction::Right => 'R',
            Direction::Down => 'D',
            Direction::Left => 'L',
            Direction::Up => 'U',
        }
    }

    pub fn from_symbol(ch: char) -> Option<Self> {
        Some(match ch {
            'R' => Direction::Right,
            'D' => Direction::Down,
            'L' => Direction::Left,
            'U' => Direction::Up,
            _ => return None,
        })
    }
}

/// The immutable grid: walls, start, target and the switch/barrier pairs.
#[derive(Debug, Clone)]
pub struct Board {
    height: u8,
    width: u8,
    grid: Box<[bool]>,
    start: Vec2,
    target: Vec2,
    switches: IndexSet<Vec2>,
    barriers: Box<[Vec2]>,
    // Bit `i` is set on every cell covered by barrier `i`.
    barrier_masks: Box<[u64]>,
}

impl Index<Vec2> for Board {
    type Output = bool;
    fn index(&self, pos: Vec2) -> &Self::Output {
        &self.grid[self.offset(pos)]
    }
}

impl Board {
    /// Validates and builds a board. `grid` is row-major with `true` for free cells,
    /// and switch `i` toggles barrier `i`.
    pub fn new(
        height: u8,
        width: u8,
        grid: Vec<bool>,
        start: Vec2,
        target: Vec2,
        switches: Vec<Vec2>,
        barriers: Vec<Vec2>,
    ) -> Result<Self> {
        ensure!(height > 0 && width > 0, "Empty grid {height}x{width}");
        ensure!(
            grid.len() == height as usize * width as usize,
            "Grid has {} cells, expecting {height}x{width}",
            grid.len(),
        );
        ensure!(
            switches.len() == barriers.len(),
            "{} switches but {} barriers",
            switches.len(),
            barriers.len(),
        );
        ensure!(
            switches.len() <= MAX_SWITCHES,
            "Too many switches: {}, at most {MAX_SWITCHES} are supported",
            switches.len(),
        );

        let in_bounds = |pos: Vec2| pos.0 < height && pos.1 < width;
        ensure!(in_bounds(start), "Start {start:?} out of bounds");
        ensure!(in_bounds(target), "Target {target:?} out of bounds");
        for (i, (&switch, &barrier)) in switches.iter().zip(&barriers).enumerate() {
            ensure!(in_bounds(switch), "Switch {i} at {switch:?} out of bounds");
            ensure!(in_bounds(barrier), "Barrier {i} at {barrier:?} out of bounds");
        }

        let switch_set = switches.iter().copied().collect::<IndexSet<_>>();
        ensure!(
            switch_set.len() == switches.len(),
            "Multiple switches on the same cell"
        );

        let mut barrier_masks = vec![0u64; grid.len()];
        for (i, &pos) in barriers.iter().enumerate() {
            barrier_masks[pos.0 as usize * width as usize + pos.1 as usize] |= 1u64 << i;
        }

        Ok(Self {
            height,
            width,
            grid: grid.into(),
            start,
            target,
            switches: switch_set,
            barriers: barriers.into(),
            barrier_masks: barrier_masks.into(),
        })
    }

    fn offset(&self, pos: Vec2) -> usize {
        pos.0 as usize * self.width as usize + pos.1 as usize
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn start(&self) -> Vec2 {
        self.start
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn contains(&self, pos: Vec2) -> bool {
        pos.0 < self.height && pos.1 < self.width
    }

    pub fn switch_count(&self) -> usize {
        self.switches.len()
    }

    /// Switch cells in index order.
    pub fn switches(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.switches.iter().copied()
    }

    pub fn switch_index(&self, pos: Vec2) -> Option<usize> {
        self.switches.get_index_of(&pos)
    }

    pub fn barriers(&self) -> &[Vec2] {
        &self.barriers
    }

    /// Whether an active barrier covers `pos`.
    pub fn is_barred(&self, pos: Vec2, barriers: &BarrierSet) -> bool {
        self.barrier_masks[self.offset(pos)] & barriers.bits != 0
    }

    pub fn cells(&self) -> impl Iterator<Item = (Vec2, bool)> + '_ {
        (0..self.height)
            .flat_map(move |row| (0..self.width).map(move |col| Vec2(row, col)))
            .map(move |pos| (pos, self[pos]))
    }

    pub fn sibling_pos(&self, pos: Vec2, dir: Direction) -> Option<Vec2> {
        const DIRECTIONS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
        let row = pos.0.checked_add_signed(DIRECTIONS[dir as usize].0)?;
        let col = pos.1.checked_add_signed(DIRECTIONS[dir as usize].1)?;
        if self.height <= row || self.width <= col {
            return None;
        }
        Some(Vec2(row, col))
    }

    /// Walls off dead ends: free cells with at most one free neighbour, repeated until
    /// nothing changes. Start, target, switch and barrier cells are kept.
    /// Returns the number of cells walled.
    pub fn prune_dead_ends(&mut self) -> usize {
        let mut pruned = 0;
        loop {
            let dead_ends = self
                .cells()
                .filter(|&(pos, free)| {
                    free && pos != self.start
                        && pos != self.target
                        && self.switch_index(pos).is_none()
                        && self.barrier_masks[self.offset(pos)] == 0
                })
                .filter(|&(pos, _)| {
                    let open = Direction::ALL
                        .into_iter()
                        .filter_map(|dir| self.sibling_pos(pos, dir))
                        .filter(|&next| self[next])
                        .count();
                    open <= 1
                })
                .map(|(pos, _)| pos)
                .collect::<Vec<_>>();
            if dead_ends.is_empty() {
                return pruned;
            }
            for pos in dead_ends {
                let offset = self.offset(pos);
                self.grid[offset] = false;
                pruned += 1;
            }
        }
    }
}

/// Ordered barrier flags, `true` meaning the barrier blocks its cell.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BarrierSet {
    bits: u64,
    len: u8,
}

impl BarrierSet {
    pub fn new(active: &[bool]) -> Result<Self> {
        ensure!(
            active.len() <= MAX_SWITCHES,
            "Too many barriers: {}, at most {MAX_SWITCHES} are supported",
            active.len(),
        );
        let mut bits = 0u64;
        for (i, &on) in active.iter().enumerate() {
            if on {
                bits |= 1u64 << i;
            }
        }
        Ok(Self {
            bits,
            len: active.len() as u8,
        })
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_active(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len());
        (self.bits >> idx) & 1 != 0
    }

    pub fn toggle(&mut self, idx: usize) {
        debug_assert!(idx < self.len());
        self.bits ^= 1u64 << idx;
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len()).map(move |idx| self.is_active(idx))
    }

    /// The flags read as a binary number, barrier 0 being the most significant bit.
    pub fn fingerprint(&self) -> u64 {
        self.iter().fold(0, |acc, on| (acc << 1) | on as u64)
    }
}

/// Everything that changes while walking a board: barrier flags, obstacles and
/// the moves taken so far. Branches of a search clone it instead of sharing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    barriers: BarrierSet,
    // Sorted. Obstacles never move, so branches share them.
    obstacles: Rc<[Vec2]>,
    moves: Vec<Direction>,
    switch_log: Vec<usize>,
}

impl State {
    pub fn new(board: &Board, active: &[bool], mut obstacles: Vec<Vec2>) -> Result<Self> {
        ensure!(
            active.len() == board.switch_count(),
            "{} barrier states for {} switches",
            active.len(),
            board.switch_count(),
        );
        for &pos in &obstacles {
            ensure!(board.contains(pos), "Obstacle {pos:?} out of bounds");
        }
        obstacles.sort_unstable();
        obstacles.dedup();
        Ok(Self {
            barriers: BarrierSet::new(active)?,
            obstacles: obstacles.into(),
            moves: Vec::new(),
            switch_log: Vec::new(),
        })
    }

    pub fn barriers(&self) -> &BarrierSet {
        &self.barriers
    }

    pub fn fingerprint(&self) -> u64 {
        self.barriers.fingerprint()
    }

    pub fn moves(&self) -> &[Direction] {
        &self.moves
    }

    /// Indices of the switches entered so far, in order.
    pub fn switch_log(&self) -> &[usize] {
        &self.switch_log
    }

    pub fn obstacles(&self) -> &[Vec2] {
        &self.obstacles
    }

    pub fn has_obstacle(&self, pos: Vec2) -> bool {
        self.obstacles.binary_search(&pos).is_ok()
    }

    pub fn is_blocked(&self, board: &Board, pos: Vec2) -> bool {
        !board[pos] || self.has_obstacle(pos) || board.is_barred(pos, &self.barriers)
    }

    pub fn press(&mut self, switch_idx: usize) {
        self.barriers.toggle(switch_idx);
        self.switch_log.push(switch_idx);
    }

    /// Records a step onto `pos`, toggling the switch there if any.
    pub fn enter(&mut self, board: &Board, pos: Vec2, dir: Direction) {
        self.moves.push(dir);
        if let Some(idx) = board.switch_index(pos) {
            self.press(idx);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Puzzle {
    pub board: Board,
    pub player: Vec2,
    pub state: State,
}

impl Puzzle {
    pub fn new(board: Board, state: State) -> Self {
        Self {
            player: board.start(),
            board,
            state,
        }
    }

    pub fn is_success(&self) -> bool {
        self.player == self.board.target()
    }

    pub fn go(&mut self, dir: Direction) -> Result<(), GoError> {
        let pos = self
            .board
            .sibling_pos(self.player, dir)
            .ok_or(GoError::OutOfBounds)?;
        if !self.board[pos] {
            return Err(GoError::Wall);
        }
        if self.state.has_obstacle(pos) {
            return Err(GoError::Obstacle);
        }
        if self.board.is_barred(pos, &self.state.barriers) {
            return Err(GoError::Barrier);
        }
        self.state.enter(&self.board, pos, dir);
        self.player = pos;
        Ok(())
    }
}

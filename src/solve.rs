use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use log::{debug, warn};

use crate::{BarrierSet, Board, Direction, State, Vec2};

type IndexMap<K, V> = indexmap::IndexMap<K, V, fxhash::FxBuildHasher>;
type IndexSet<K> = indexmap::IndexSet<K, fxhash::FxBuildHasher>;

pub const DEFAULT_MAX_EXPANSIONS: usize = 1_000_000;

/// Moves walked and the state after walking them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub moves: Vec<Direction>,
    pub state: State,
}

/// Shortest walk from `from` to `to` with the barriers frozen except for the
/// switches stepped on along the way.
///
/// With `avoid_switches`, no switch other than `to` itself may be entered.
/// The returned route holds only the moves of this walk, while its state has
/// them appended to whatever `state` had already accumulated.
pub fn find_path(
    from: Vec2,
    to: Vec2,
    board: &Board,
    state: &State,
    avoid_switches: bool,
) -> Option<Route> {
    if from == to {
        return Some(Route {
            moves: Vec::new(),
            state: state.clone(),
        });
    }

    // Keyed by cell and barrier flags on arrival. Values are the parent index
    // and the step from it.
    let mut visited = IndexMap::<(Vec2, BarrierSet), (usize, Direction)>::default();
    visited.insert((from, *state.barriers()), (!0usize, Direction::Right)); // Sentinel.

    let mut cursor = 0;
    let found = 'bfs: loop {
        let (&(pos, barriers), _) = visited.get_index(cursor)?;

        for dir in Direction::ALL {
            let Some(next) = board.sibling_pos(pos, dir) else { continue };
            if !board[next] || state.has_obstacle(next) || board.is_barred(next, &barriers) {
                continue;
            }

            let switch_idx = board.switch_index(next);
            if avoid_switches && next != to && switch_idx.is_some() {
                continue;
            }

            let mut next_barriers = barriers;
            if let Some(idx) = switch_idx {
                next_barriers.toggle(idx);
            }
            if visited.contains_key(&(next, next_barriers)) {
                continue;
            }
            visited.insert((next, next_barriers), (cursor, dir));
            if next == to {
                break 'bfs visited.len() - 1;
            }
        }
        cursor += 1;
    };

    let mut moves = Vec::new();
    let mut idx = found;
    while idx != 0 {
        let (parent, dir) = visited[idx];
        moves.push(dir);
        idx = parent;
    }
    moves.reverse();

    // Replay to apply the toggles and extend the move log.
    let mut next_state = state.clone();
    let mut pos = from;
    for &dir in &moves {
        pos = board
            .sibling_pos(pos, dir)
            .expect("Replayed step must stay on the board");
        next_state.enter(board, pos, dir);
    }
    debug_assert_eq!(pos, to);

    Some(Route {
        moves,
        state: next_state,
    })
}

pub fn solve(start: Vec2, target: Vec2, board: &Board, state: &State) -> Option<Route> {
    Search::new(board, start, target, state.clone()).run(|| {})
}

struct Node {
    cost: usize,
    seq: usize,
    pos: Vec2,
    state: State,
}

impl Node {
    fn key(&self) -> (usize, usize) {
        (self.cost, self.seq)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Debug)]
pub enum Step {
    Pending,
    Solved(Route),
    Exhausted,
}

/// Best-first search over legs between switches, cheapest accumulated move count first.
pub struct Search<'a> {
    board: &'a Board,
    target: Vec2,
    queue: BinaryHeap<Reverse<Node>>,
    // (position, switch, barrier fingerprint) of every leg attempted so far.
    tried: IndexSet<(Vec2, Vec2, u64)>,
    pushed: usize,
    expansions: usize,
    max_expansions: usize,
}

impl<'a> Search<'a> {
    pub fn new(board: &'a Board, start: Vec2, target: Vec2, state: State) -> Self {
        let mut search = Self {
            board,
            target,
            queue: BinaryHeap::new(),
            tried: IndexSet::default(),
            pushed: 0,
            expansions: 0,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
        };
        search.push(start, state);
        search
    }

    pub fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = max_expansions;
        self
    }

    pub fn tried_len(&self) -> usize {
        self.tried.len()
    }

    pub fn expansions(&self) -> usize {
        self.expansions
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    fn push(&mut self, pos: Vec2, state: State) {
        let node = Node {
            cost: state.moves().len(),
            seq: self.pushed,
            pos,
            state,
        };
        self.pushed += 1;
        self.queue.push(Reverse(node));
    }

    pub fn step(&mut self) -> Step {
        #[cfg(feature = "coz")]
        coz::scope!("Expand");

        let board = self.board;
        let Some(Reverse(node)) = self.queue.pop() else {
            return Step::Exhausted;
        };
        if self.expansions >= self.max_expansions {
            warn!(
                "Giving up after {} expansions with {} nodes queued",
                self.expansions,
                self.queue.len() + 1,
            );
            self.queue.clear();
            return Step::Exhausted;
        }
        self.expansions += 1;

        #[cfg(feature = "coz")]
        coz::progress!("Expansion");

        if let Some(leg) = find_path(node.pos, self.target, board, &node.state, true) {
            debug!(
                "Reached {:?} from {:?} after {} expansions, {} moves in total",
                self.target,
                node.pos,
                self.expansions,
                leg.state.moves().len(),
            );
            let state = leg.state;
            return Step::Solved(Route {
                moves: state.moves().to_vec(),
                state,
            });
        }
        let fingerprint = node.state.fingerprint();
        for switch in board.switches() {
            if switch == node.pos {
                continue;
            }
            // Never retry the same leg under the same barrier layout.
            if !self.tried.insert((node.pos, switch, fingerprint)) {
                continue;
            }
            let Some(leg) = find_path(node.pos, switch, board, &node.state, true) else {
                continue;
            };
            debug!(
                "Switch {switch:?} reachable from {:?} in {} moves (barriers {:#b})",
                node.pos,
                leg.moves.len(),
                leg.state.fingerprint(),
            );
            self.push(switch, leg.state);
        }
        Step::Pending
    }

    pub fn run(&mut self, mut on_step: impl FnMut()) -> Option<Route> {
        loop {
            on_step();
            match self.step() {
                Step::Pending => {}
                Step::Solved(route) => return Some(route),
                Step::Exhausted => return None,
            }
        }
    }
}

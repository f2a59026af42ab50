use std::fmt;

use crate::{Direction, Puzzle};

pub fn moves_to_string(moves: &[Direction]) -> String {
    moves.iter().map(|dir| dir.symbol()).collect()
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl fmt::Display for Puzzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            board,
            player,
            state,
        } = self;

        for (pos, free) in board.cells() {
            let ch = if pos == *player {
                'p'
            } else if state.has_obstacle(pos) {
                '+'
            } else if board.switch_index(pos).is_some() {
                's'
            } else if board.barriers().contains(&pos) {
                if board.is_barred(pos, state.barriers()) {
                    'X'
                } else {
                    '_'
                }
            } else if pos == board.target() {
                '='
            } else if free {
                '.'
            } else {
                '#'
            };
            write!(f, "{ch}")?;
            if pos.1 + 1 == board.width() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

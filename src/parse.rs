use std::str::FromStr;

use anyhow::{anyhow, bail, ensure, Context, Result};
use arrayvec::ArrayVec;

use crate::{Board, Puzzle, State, Vec2};

fn parse_fields<const N: usize>(line: &str) -> Result<[u8; N]> {
    let mut fields = ArrayVec::<u8, N>::new();
    for field in line.split_whitespace() {
        let value = field
            .parse::<u8>()
            .with_context(|| format!("Invalid number {field:?}"))?;
        fields
            .try_push(value)
            .map_err(|_| anyhow!("Too many fields in {line:?}, expecting {N}"))?;
    }
    fields
        .into_inner()
        .map_err(|fields| anyhow!("Expecting {N} fields in {line:?}, got {}", fields.len()))
}

/// Positions in the text are `x y`, that is column first.
fn parse_pos(line: Option<&str>, what: &str) -> Result<Vec2> {
    let line = line.with_context(|| format!("Missing {what}"))?;
    let [x, y] = parse_fields(line).with_context(|| format!("Invalid {what}"))?;
    Ok(Vec2(y, x))
}

impl FromStr for Puzzle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty());

        let [width, height] = parse_fields(lines.next().context("Missing grid size")?)
            .context("Invalid grid size")?;
        ensure!(width > 0 && height > 0, "Empty grid {width}x{height}");

        let mut grid = Vec::with_capacity(width as usize * height as usize);
        let mut obstacles = Vec::new();
        for row in 0..height {
            let line = lines
                .next()
                .with_context(|| format!("Missing grid row {row}"))?;
            ensure!(
                line.chars().count() == width as usize,
                "Width mismatch on row {row}, expecting width {width}",
            );
            for (col, ch) in line.chars().enumerate() {
                let free = match ch {
                    '.' => true,
                    '#' => false,
                    '+' => {
                        obstacles.push(Vec2(row, col as u8));
                        true
                    }
                    _ => bail!("Invalid cell {ch:?} at row {row}, column {col}"),
                };
                grid.push(free);
            }
        }

        let start = parse_pos(lines.next(), "start")?;
        let target = parse_pos(lines.next(), "target")?;

        let [count] = parse_fields(lines.next().context("Missing switch count")?)
            .context("Invalid switch count")?;
        let mut switches = Vec::with_capacity(count as usize);
        let mut barriers = Vec::with_capacity(count as usize);
        let mut active = Vec::with_capacity(count as usize);
        for i in 0..count {
            let line = lines
                .next()
                .with_context(|| format!("Missing switch {i}"))?;
            let [switch_x, switch_y, barrier_x, barrier_y, init] =
                parse_fields(line).with_context(|| format!("Invalid switch {i}"))?;
            switches.push(Vec2(switch_y, switch_x));
            barriers.push(Vec2(barrier_y, barrier_x));
            active.push(match init {
                0 => false,
                1 => true,
                _ => bail!("Invalid initial state {init} of switch {i}, expecting 0 or 1"),
            });
        }

        if let Some(line) = lines.next() {
            bail!("Unexpected trailing line {line:?}");
        }

        let board = Board::new(height, width, grid, start, target, switches, barriers)
            .context("Invalid board")?;
        let state = State::new(&board, &active, obstacles).context("Invalid initial state")?;
        Ok(Puzzle::new(board, state))
    }
}

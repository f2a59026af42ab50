use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::{style, Key, Term};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use switch_maze_solver::solve::{Search, DEFAULT_MAX_EXPANSIONS};
use switch_maze_solver::{encode, moves_to_string, Direction, Puzzle};

/// Find the shortest walk through a maze whose barriers are toggled by switches.
#[derive(Debug, Parser)]
struct Args {
    /// Puzzle file. Read from stdin when omitted.
    path: Option<PathBuf>,

    /// Print the plain move string instead of the macro-compressed one.
    #[arg(long)]
    raw: bool,

    /// Give up after expanding this many search nodes.
    #[arg(long, default_value_t = DEFAULT_MAX_EXPANSIONS)]
    max_expansions: usize,

    /// Play the puzzle in the terminal.
    #[arg(short, long)]
    interactive: bool,
}

enum Action {
    Exit,
    Go(Direction),
    Undo,
    Reset,
    Hint,
}

impl TryFrom<Key> for Action {
    type Error = ();

    fn try_from(key: Key) -> Result<Self, Self::Error> {
        Ok(match key {
            Key::ArrowLeft | Key::Char('a') => Self::Go(Direction::Left),
            Key::ArrowRight | Key::Char('d') => Self::Go(Direction::Right),
            Key::ArrowUp | Key::Char('w') => Self::Go(Direction::Up),
            Key::ArrowDown | Key::Char('s') => Self::Go(Direction::Down),
            Key::Escape | Key::Char('q') => Self::Exit,
            Key::Char('z') => Self::Undo,
            Key::Char('r') => Self::Reset,
            Key::Char('h') => Self::Hint,
            _ => return Err(()),
        })
    }
}

fn new_search<'a>(puzzle: &'a Puzzle, max_expansions: usize) -> Search<'a> {
    let board = &puzzle.board;
    Search::new(board, puzzle.player, board.target(), puzzle.state.clone())
        .with_max_expansions(max_expansions)
}

fn play(init_puzzle: Puzzle, max_expansions: usize) -> Result<()> {
    let mut puzzle = init_puzzle.clone();
    let mut history = Vec::new();

    let term = Term::stderr();
    loop {
        eprintln!("{puzzle}");
        if puzzle.is_success() {
            eprintln!(
                "{} in {} moves",
                style("Solved").green().bold(),
                puzzle.state.moves().len(),
            );
        }

        let action = loop {
            if let Ok(action) = Action::try_from(term.read_key()?) {
                break action;
            }
        };

        match action {
            Action::Exit => break,
            Action::Go(dir) => {
                let mut new_puzzle = puzzle.clone();
                match new_puzzle.go(dir) {
                    Ok(()) => {
                        history.push(puzzle);
                        puzzle = new_puzzle;
                    }
                    Err(err) => debug!("Cannot go {dir}: {err:?}"),
                }
            }
            Action::Undo => {
                if let Some(last_puzzle) = history.pop() {
                    puzzle = last_puzzle;
                }
            }
            Action::Reset => {
                history.push(puzzle);
                puzzle = init_puzzle.clone();
            }
            Action::Hint => {
                let done = puzzle.state.moves().len();
                let next = new_search(&puzzle, max_expansions)
                    .run(|| {})
                    .and_then(|route| route.moves.get(done).copied());
                match next {
                    Some(dir) => {
                        let mut new_puzzle = puzzle.clone();
                        new_puzzle
                            .go(dir)
                            .ok()
                            .context("Hinted move must be valid")?;
                        history.push(puzzle);
                        puzzle = new_puzzle;
                    }
                    None => eprintln!("{}", style("No solution from here").red()),
                }
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let timer = Instant::now();
    let map_data = match &args.path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    let puzzle = map_data
        .parse::<Puzzle>()
        .context("Failed to parse the puzzle")?;
    info!("Parsing the puzzle took {:?}", timer.elapsed());
    debug!("Puzzle:\n{puzzle}");

    if args.interactive {
        return play(puzzle, args.max_expansions);
    }

    let mut puzzle = puzzle;
    let step_timer = Instant::now();
    let pruned = puzzle.board.prune_dead_ends();
    info!("Walling {pruned} dead-end cells took {:?}", step_timer.elapsed());

    let step_timer = Instant::now();
    let progress = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} {elapsed} {pos} nodes expanded")
            .context("Invalid progress template")?,
    );
    let mut search = new_search(&puzzle, args.max_expansions);
    let route = search.run(|| progress.inc(1));
    progress.finish_and_clear();
    let moves = match route {
        Some(route) => {
            info!(
                "Found {} moves in {:?} after {} expansions",
                route.moves.len(),
                step_timer.elapsed(),
                search.expansions(),
            );
            moves_to_string(&route.moves)
        }
        None => {
            info!(
                "No solution found in {:?} after {} expansions",
                step_timer.elapsed(),
                search.expansions(),
            );
            String::new()
        }
    };

    let output = if args.raw {
        moves
    } else {
        let step_timer = Instant::now();
        let output = encode::encode(&moves);
        info!(
            "Encoding {} moves into {} characters took {:?}",
            moves.len(),
            output.len(),
            step_timer.elapsed(),
        );
        output
    };
    info!("Total time: {:?}", timer.elapsed());

    println!("{output}");
    Ok(())
}

//! Deterministic card generation from a phrase pool.

use std::collections::HashSet;

use rand::{SeedableRng, seq::SliceRandom};
use rand_pcg::Pcg32;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::state::game::{BOARD_SIZE, Board, ClickedSet, FREE_SPACE, FREE_SPACE_TEXT};

/// Number of phrases drawn for one card (every cell except the free space).
pub const PHRASES_PER_BOARD: usize = BOARD_SIZE * BOARD_SIZE - 1;
/// Row-major index of the free space.
const FREE_SPACE_INDEX: usize = PHRASES_PER_BOARD / 2;

/// A freshly generated card and its initial marks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBoard {
    /// The card itself.
    pub board: Board,
    /// Initial marks: only the free space.
    pub clicked: ClickedSet,
    /// True when the pool was too small and synthetic phrases filled the gap.
    pub degraded: bool,
}

/// Build a card from `pool` using `seed`.
///
/// The same seed and pool always produce the same card. Pools smaller than
/// [`PHRASES_PER_BOARD`] are topped up with `PHRASE <n>` placeholders instead of
/// failing.
pub fn generate(seed: u64, pool: &[String]) -> GeneratedBoard {
    let (mut phrases, degraded) = padded_pool(pool);

    let mut rng = Pcg32::seed_from_u64(seed);
    phrases.shuffle(&mut rng);
    phrases.truncate(PHRASES_PER_BOARD);
    phrases.insert(FREE_SPACE_INDEX, FREE_SPACE_TEXT.to_string());

    let mut drawn = phrases.into_iter();
    let board = Board::new(std::array::from_fn(|_| {
        std::array::from_fn(|_| drawn.next().unwrap_or_default())
    }));

    info!(seed, degraded, "board generated");

    GeneratedBoard {
        board,
        clicked: ClickedSet::from([FREE_SPACE]),
        degraded,
    }
}

/// Human-readable seed label shown to players: `YYYYMMDD.<seed>` for today (UTC).
pub fn seed_label(seed: u64) -> String {
    let date = OffsetDateTime::now_utc().date();
    format!(
        "{:04}{:02}{:02}.{seed}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

fn padded_pool(pool: &[String]) -> (Vec<String>, bool) {
    let mut phrases = pool.to_vec();
    if phrases.len() >= PHRASES_PER_BOARD {
        return (phrases, false);
    }

    warn!(
        available = pool.len(),
        required = PHRASES_PER_BOARD,
        "not enough phrases; filling the board with placeholders"
    );

    let taken: HashSet<String> = phrases.iter().cloned().collect();
    let fillers = (1..)
        .map(|n| format!("PHRASE {n}"))
        .filter(|candidate| !taken.contains(candidate))
        .take(PHRASES_PER_BOARD - phrases.len())
        .collect::<Vec<_>>();
    phrases.extend(fillers);

    (phrases, true)
}

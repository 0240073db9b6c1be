//! Winning shapes and the messages announcing them.

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

use crate::state::game::{BOARD_SIZE, ClickedSet, Coord, PatternSet};

/// A winning shape on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// A full row.
    Row(usize),
    /// A full column.
    Column(usize),
    /// Top-left to bottom-right diagonal.
    DiagonalMain,
    /// Top-right to bottom-left diagonal.
    DiagonalAnti,
    /// Every cell.
    Blackout,
    /// The four corner cells.
    FourCorners,
    /// Center row and center column.
    Plus,
    /// Both diagonals.
    XShape,
    /// Every border cell.
    Perimeter,
}

impl Pattern {
    /// Every shape in evaluation order.
    pub fn catalogue() -> Vec<Pattern> {
        let lines = (0..BOARD_SIZE).flat_map(|i| [Pattern::Row(i), Pattern::Column(i)]);
        lines
            .chain([
                Pattern::DiagonalMain,
                Pattern::DiagonalAnti,
                Pattern::Blackout,
                Pattern::FourCorners,
                Pattern::Plus,
                Pattern::XShape,
                Pattern::Perimeter,
            ])
            .collect()
    }

    /// Stable identifier stored in the pattern set.
    pub fn id(&self) -> String {
        match self {
            Pattern::Row(i) => format!("row{i}"),
            Pattern::Column(i) => format!("col{i}"),
            Pattern::DiagonalMain => "diag_main".into(),
            Pattern::DiagonalAnti => "diag_anti".into(),
            Pattern::Blackout => "blackout".into(),
            Pattern::FourCorners => "four_corners".into(),
            Pattern::Plus => "plus".into(),
            Pattern::XShape => "x_shape".into(),
            Pattern::Perimeter => "perimeter".into(),
        }
    }

    /// Special shapes are announced one by one instead of being counted.
    pub fn is_special(&self) -> bool {
        !matches!(
            self,
            Pattern::Row(_) | Pattern::Column(_) | Pattern::DiagonalMain | Pattern::DiagonalAnti
        )
    }

    /// Whether every cell of the shape is marked.
    pub fn is_complete(&self, clicked: &ClickedSet) -> bool {
        self.cells().iter().all(|cell| clicked.contains(cell))
    }

    fn cells(&self) -> Vec<Coord> {
        let last = BOARD_SIZE - 1;
        let mid = BOARD_SIZE / 2;
        let range = 0..BOARD_SIZE;
        match *self {
            Pattern::Row(row) => range.map(|col| Coord::cell(row, col)).collect(),
            Pattern::Column(col) => range.map(|row| Coord::cell(row, col)).collect(),
            Pattern::DiagonalMain => range.map(|i| Coord::cell(i, i)).collect(),
            Pattern::DiagonalAnti => range.map(|i| Coord::cell(i, last - i)).collect(),
            Pattern::Blackout => Coord::all().collect(),
            Pattern::FourCorners => vec![
                Coord::cell(0, 0),
                Coord::cell(0, last),
                Coord::cell(last, 0),
                Coord::cell(last, last),
            ],
            Pattern::Plus => Coord::all()
                .filter(|c| c.row() == mid || c.col() == mid)
                .collect(),
            Pattern::XShape => Coord::all()
                .filter(|c| c.row() == c.col() || c.row() + c.col() == last)
                .collect(),
            Pattern::Perimeter => Coord::all()
                .filter(|c| c.row() == 0 || c.row() == last || c.col() == 0 || c.col() == last)
                .collect(),
        }
    }

    fn special_title(&self) -> String {
        self.id()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Shapes completed by `clicked` that are not yet in `known`, in catalogue order.
///
/// Callers merge the result into their pattern set, so evaluating again with
/// the same marks yields nothing.
pub fn evaluate(clicked: &ClickedSet, known: &PatternSet) -> Vec<Pattern> {
    Pattern::catalogue()
        .into_iter()
        .filter(|pattern| !known.contains(&pattern.id()))
        .filter(|pattern| pattern.is_complete(clicked))
        .collect()
}

/// Flavor of a win message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementKind {
    /// Aggregated row/column/diagonal message.
    Standard,
    /// One of the special shapes.
    Special,
}

/// Message shown to every viewer when shapes complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Announcement {
    /// Text to display, e.g. `DOUBLE BINGO!`.
    pub message: String,
    /// Message flavor.
    pub kind: AnnouncementKind,
}

/// Messages for the shapes in `new`, given the pattern set after merging them.
///
/// Rows, columns and diagonals collapse into one message counting every
/// non-special shape found so far; each special shape gets its own message,
/// even when several complete at once.
pub fn announcements(new: &[Pattern], known_after: &PatternSet) -> Vec<Announcement> {
    let mut messages = Vec::new();

    if new.iter().any(|pattern| !pattern.is_special()) {
        let standard_total = Pattern::catalogue()
            .iter()
            .filter(|pattern| !pattern.is_special() && known_after.contains(&pattern.id()))
            .count();
        messages.push(Announcement {
            message: standard_message(standard_total),
            kind: AnnouncementKind::Standard,
        });
    }

    messages.extend(
        new.iter()
            .filter(|pattern| pattern.is_special())
            .map(|pattern| Announcement {
                message: format!("{} Bingo!", pattern.special_title()),
                kind: AnnouncementKind::Special,
            }),
    );

    messages
}

fn standard_message(total: usize) -> String {
    match total {
        0 | 1 => "BINGO!".into(),
        2 => "DOUBLE BINGO!".into(),
        3 => "TRIPLE BINGO!".into(),
        4 => "QUADRUPLE BINGO!".into(),
        5 => "QUINTUPLE BINGO!".into(),
        n => format!("{n}-WAY BINGO!"),
    }
}

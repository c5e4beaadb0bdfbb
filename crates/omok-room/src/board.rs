//! The Gomoku board and win detection.
//!
//! A win is checked only around the stone just placed: from that cell the
//! detector walks both ways along each of the four axes and counts
//! same-symbol neighbors. The walk is capped at `win_length - 1` steps per
//! direction, so the cost does not depend on the board size.

use omok_protocol::{BoardRows, Symbol};

/// Stones in a row needed to win a standard match.
pub const WIN_LENGTH: usize = 5;

/// Horizontal, vertical, diagonal, anti-diagonal.
const AXES: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// A square grid of cells, each empty or holding one symbol.
///
/// Cells are addressed `(x, y)` with `x` the column and `y` the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Option<Symbol>>,
}

impl Board {
    /// Creates an empty `size` x `size` board.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    /// Width and height.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Converts signed wire coordinates into a cell address, if on the board.
    pub fn cell(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        (x < self.size && y < self.size).then_some((x, y))
    }

    /// The stone at `(x, y)`; `None` for an empty or off-board cell.
    pub fn get(&self, x: usize, y: usize) -> Option<Symbol> {
        if x < self.size && y < self.size {
            self.cells[y * self.size + x]
        } else {
            None
        }
    }

    /// Puts `symbol` on `(x, y)`. Returns `false`, leaving the board as it
    /// was, if the cell is off the board or already occupied.
    pub fn place(&mut self, x: usize, y: usize, symbol: Symbol) -> bool {
        if x >= self.size || y >= self.size {
            return false;
        }
        let cell = &mut self.cells[y * self.size + x];
        if cell.is_some() {
            return false;
        }
        *cell = Some(symbol);
        true
    }

    /// Number of occupied cells.
    pub fn stones(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// `true` once no empty cell remains.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Rows as sent on the wire: `rows[y][x]`.
    pub fn rows(&self) -> BoardRows {
        self.cells
            .chunks(self.size.max(1))
            .take(self.size)
            .map(<[Option<Symbol>]>::to_vec)
            .collect()
    }

    fn get_signed(&self, x: isize, y: isize) -> Option<Symbol> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        self.get(x, y)
    }
}

/// `true` if the stone at `(x, y)` is part of a run of at least
/// [`WIN_LENGTH`] same-symbol stones along any axis.
pub fn is_win(board: &Board, x: usize, y: usize) -> bool {
    is_win_with(board, x, y, WIN_LENGTH)
}

/// Like [`is_win`] with a custom run length. Runs longer than
/// `win_length` also count. An empty cell never wins.
pub fn is_win_with(board: &Board, x: usize, y: usize, win_length: usize) -> bool {
    let Some(symbol) = board.get(x, y) else {
        return false;
    };
    let reach = win_length.saturating_sub(1);
    AXES.iter().any(|&(dx, dy)| {
        let forward = count_from(board, x, y, dx, dy, symbol, reach);
        let backward = count_from(board, x, y, -dx, -dy, symbol, reach);
        1 + forward + backward >= win_length
    })
}

/// Counts consecutive `symbol` stones stepping `(dx, dy)` away from
/// `(x, y)`, not counting the origin and stopping after `limit`.
fn count_from(
    board: &Board,
    x: usize,
    y: usize,
    dx: isize,
    dy: isize,
    symbol: Symbol,
    limit: usize,
) -> usize {
    let (mut cx, mut cy) = (x as isize, y as isize);
    let mut count = 0;
    while count < limit {
        cx += dx;
        cy += dy;
        if board.get_signed(cx, cy) != Some(symbol) {
            break;
        }
        count += 1;
    }
    count
}

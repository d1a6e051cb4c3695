use std::collections::BTreeMap;

use super::XlsCellValue;

#[derive(Debug, Clone)]
pub(super) struct WritableCell {
    /// Row index (0-based)
    pub row: u32,
    /// Column index (0-based)
    pub col: u16,
    /// Cell value
    pub value: XlsCellValue,
}

/// Represents a worksheet in the writer
#[derive(Debug)]
pub(super) struct WritableWorksheet {
    /// Worksheet name
    pub name: String,
    /// Cells to write, keyed and therefore ordered by (row, col)
    pub cells: BTreeMap<(u32, u16), WritableCell>,
    /// First used row
    pub first_row: u32,
    /// Last used row (exclusive)
    pub last_row: u32,
    /// First used column
    pub first_col: u16,
    /// Last used column (exclusive)
    pub last_col: u16,
}

impl WritableWorksheet {
    pub(super) fn new(name: String) -> Self {
        Self {
            name,
            cells: BTreeMap::new(),
            first_row: 0,
            last_row: 0,
            first_col: 0,
            last_col: 0,
        }
    }

    /// Store a cell, replacing any earlier value at the same position
    pub(super) fn add_cell(&mut self, cell: WritableCell) {
        if self.cells.is_empty() {
            self.first_row = cell.row;
            self.last_row = cell.row + 1;
            self.first_col = cell.col;
            self.last_col = cell.col + 1;
        } else {
            self.first_row = self.first_row.min(cell.row);
            self.last_row = self.last_row.max(cell.row + 1);
            self.first_col = self.first_col.min(cell.col);
            self.last_col = self.last_col.max(cell.col + 1);
        }

        self.cells.insert((cell.row, cell.col), cell);
    }
}

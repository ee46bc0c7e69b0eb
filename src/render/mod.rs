pub mod bars;
pub mod terminal;

use std::io;

/// Cell-addressed drawing target.
pub trait Surface {
    /// `(rows, columns)` currently available.
    fn dimensions(&self) -> io::Result<(usize, usize)>;
    fn clear(&mut self) -> io::Result<()>;
    fn draw_cell(&mut self, row: usize, col: usize, glyph: char) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory grid that records how many frames were flushed.
    pub(crate) struct GridSurface {
        pub rows: usize,
        pub cols: usize,
        pub cells: Vec<Vec<char>>,
        pub frames: usize,
    }

    impl GridSurface {
        pub fn new(rows: usize, cols: usize) -> Self {
            Self {
                rows,
                cols,
                cells: vec![vec![' '; cols]; rows],
                frames: 0,
            }
        }

        /// Number of non-blank cells in `col`.
        pub fn column_height(&self, col: usize) -> usize {
            self.cells.iter().filter(|row| row[col] != ' ').count()
        }
    }

    impl Surface for GridSurface {
        fn dimensions(&self) -> io::Result<(usize, usize)> {
            Ok((self.rows, self.cols))
        }

        fn clear(&mut self) -> io::Result<()> {
            for row in &mut self.cells {
                row.fill(' ');
            }
            Ok(())
        }

        fn draw_cell(&mut self, row: usize, col: usize, glyph: char) -> io::Result<()> {
            let cell = self
                .cells
                .get_mut(row)
                .and_then(|r| r.get_mut(col))
                .ok_or_else(|| io::Error::other(format!("cell ({}, {}) out of range", row, col)))?;
            *cell = glyph;
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.frames += 1;
            Ok(())
        }
    }
}

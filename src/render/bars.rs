use std::io;

use super::Surface;
use crate::config::BAR_GLYPH;

/// Draws one vertical bar per value, bottom-aligned at row `rows`.
///
/// A value `v` fills rows `rows - v ..= rows`, so the baseline row is always
/// drawn. Values above `rows` are treated as `rows`.
pub fn draw_bars<S: Surface + ?Sized>(
    surface: &mut S,
    values: &[usize],
    rows: usize,
) -> io::Result<()> {
    surface.clear()?;
    for (col, &value) in values.iter().enumerate() {
        let top = rows - value.min(rows);
        for row in top..=rows {
            surface.draw_cell(row, col, BAR_GLYPH)?;
        }
    }
    surface.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::GridSurface;

    #[test]
    fn bar_heights() {
        let mut grid = GridSurface::new(11, 4);
        draw_bars(&mut grid, &[0, 3, 10, 25], 10).unwrap();

        assert_eq!(grid.column_height(0), 1);
        assert_eq!(grid.column_height(1), 4);
        assert_eq!(grid.column_height(2), 11);
        assert_eq!(grid.column_height(3), 11);
        assert_eq!(grid.cells[10][0], BAR_GLYPH);
        assert_eq!(grid.cells[7][1], BAR_GLYPH);
        assert_eq!(grid.cells[6][1], ' ');
        assert_eq!(grid.frames, 1);
    }

    #[test]
    fn redraw_clears_previous_frame() {
        let mut grid = GridSurface::new(6, 2);
        draw_bars(&mut grid, &[5, 5], 5).unwrap();
        draw_bars(&mut grid, &[1], 5).unwrap();

        assert_eq!(grid.column_height(0), 2);
        assert_eq!(grid.column_height(1), 0);
        assert_eq!(grid.frames, 2);
    }
}

use crossterm::{cursor, execute, queue, style, terminal};
use std::io::{self, BufWriter, Stdout, Write};

use super::Surface;

/// Crossterm-backed surface on the alternate screen.
///
/// Raw mode stays off so Ctrl-C still ends the process.
pub struct TerminalSurface {
    out: BufWriter<Stdout>,
    active: bool,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self {
            out: BufWriter::new(io::stdout()),
            active: false,
        }
    }

    pub fn enter_mode(&mut self) -> io::Result<()> {
        execute!(self.out, terminal::EnterAlternateScreen, cursor::Hide)?;
        self.active = true;
        Ok(())
    }

    pub fn exit_mode(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen)
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        let _ = self.exit_mode();
    }
}

impl Surface for TerminalSurface {
    fn dimensions(&self) -> io::Result<(usize, usize)> {
        let (cols, rows) = terminal::size()?;
        Ok((rows as usize, cols as usize))
    }

    fn clear(&mut self) -> io::Result<()> {
        queue!(self.out, terminal::Clear(terminal::ClearType::All))
    }

    fn draw_cell(&mut self, row: usize, col: usize, glyph: char) -> io::Result<()> {
        queue!(self.out, cursor::MoveTo(col as u16, row as u16), style::Print(glyph))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

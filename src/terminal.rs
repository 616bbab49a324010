//! [`Screen`] on a real terminal through crossterm.

use crate::error::DisplayError;
use crate::screen::{Glyph, Key, MessageStyle, Screen};
use crate::tile::Tile;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use std::io::{self, Stdout, Write};
use std::time::Duration;

/// The terminal in raw mode on the alternate screen.
///
/// The terminal is restored when this is dropped.
pub struct TerminalScreen {
    out: Stdout,
}

impl TerminalScreen {
    pub fn open() -> Result<Self, DisplayError> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            out,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(ClearType::All)
        )?;
        Ok(Self { out })
    }

    fn colors(glyph: Glyph) -> (Color, Option<Color>) {
        match glyph {
            Glyph::Tile(Tile::Wall) => (Color::White, Some(Color::White)),
            Glyph::Tile(Tile::Beeper(_) | Tile::Treasure) => (Color::Green, None),
            Glyph::Tile(Tile::Empty) => (Color::Yellow, None),
            Glyph::Robot {
                on_beeper: true, ..
            } => (Color::Red, None),
            Glyph::Robot { .. } => (Color::Cyan, None),
        }
    }
}

impl Drop for TerminalScreen {
    fn drop(&mut self) {
        let _ = execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

impl Screen for TerminalScreen {
    fn size(&self) -> Result<(u16, u16), DisplayError> {
        Ok(terminal::size()?)
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        queue!(self.out, terminal::Clear(ClearType::All))?;
        Ok(())
    }

    fn draw(&mut self, column: u16, row: u16, glyph: Glyph) -> Result<(), DisplayError> {
        let (fg, bg) = Self::colors(glyph);
        queue!(
            self.out,
            cursor::MoveTo(column, row),
            SetForegroundColor(fg),
            SetBackgroundColor(bg.unwrap_or(Color::Reset)),
            Print(glyph.char()),
            ResetColor
        )?;
        Ok(())
    }

    fn message(&mut self, row: u16, text: &str, style: MessageStyle) -> Result<(), DisplayError> {
        let color = match style {
            MessageStyle::Status => Color::Reset,
            MessageStyle::Error => Color::Red,
            MessageStyle::Complete => Color::Green,
        };
        queue!(
            self.out,
            cursor::MoveTo(0, row),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(color),
            Print(text),
            ResetColor
        )?;
        Ok(())
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        self.out.flush()?;
        Ok(())
    }

    fn next_key(&mut self, timeout: Option<Duration>) -> Result<Option<Key>, DisplayError> {
        loop {
            if let Some(timeout) = timeout
                && !event::poll(timeout)?
            {
                return Ok(None);
            }
            let key = match event::read()? {
                Event::Resize(..) => Some(Key::Resize),
                Event::Key(key) if key.kind != KeyEventKind::Release => match key.code {
                    KeyCode::Up => Some(Key::Up),
                    KeyCode::Down => Some(Key::Down),
                    KeyCode::Left => Some(Key::Left),
                    KeyCode::Right => Some(Key::Right),
                    KeyCode::F(1) => Some(Key::Help),
                    KeyCode::Esc => Some(Key::Char('q')),
                    KeyCode::Char(c) => Some(Key::Char(c)),
                    _ => None,
                },
                _ => None,
            };
            if key.is_some() || timeout.is_some() {
                return Ok(key);
            }
        }
    }

    fn alert(&mut self) -> Result<(), DisplayError> {
        queue!(self.out, Print('\x07'))?;
        Ok(())
    }
}

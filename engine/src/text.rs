//! Text layout on indexed buffers.
//!
//! Glyph rendering belongs to the game's font manager; the movie code only
//! needs line metrics and a way to draw a single line, which the
//! [`TextRenderer`] trait provides.

use common::Rect;

use crate::surface::PixelBuffer;

pub trait TextRenderer {
    fn line_height(&self) -> i32;

    fn char_width(&self, ch: char) -> i32;

    fn text_width(&self, text: &str) -> i32 {
        text.chars().map(|ch| self.char_width(ch)).sum()
    }

    /// Draw one line with its top-left corner at `(x, y)`, clipped to the buffer
    fn draw_text(&self, buffer: &mut PixelBuffer, text: &str, x: i32, y: i32, color: u8);
}

/// Fixed-size block glyphs. Every visible character is a filled cell one
/// pixel smaller than its advance.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceFont {
    glyph_width: i32,
    line_height: i32,
}

impl MonospaceFont {
    pub fn new(glyph_width: i32, line_height: i32) -> Self {
        Self {
            glyph_width: glyph_width.max(1),
            line_height: line_height.max(1),
        }
    }
}

impl Default for MonospaceFont {
    fn default() -> Self {
        Self::new(8, 10)
    }
}

impl TextRenderer for MonospaceFont {
    fn line_height(&self) -> i32 {
        self.line_height
    }

    fn char_width(&self, _ch: char) -> i32 {
        self.glyph_width
    }

    fn draw_text(&self, buffer: &mut PixelBuffer, text: &str, x: i32, y: i32, color: u8) {
        let mut pen = x;
        for ch in text.chars() {
            if !ch.is_whitespace() {
                let cell = Rect::new(pen, y, self.glyph_width - 1, self.line_height - 1);
                buffer.fill_rect(cell, color);
            }
            pen += self.glyph_width;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
}

/// Greedy word wrap on spaces. Words wider than `max_width` are broken
/// at the last character that still fits.
pub fn wrap_text(text: &str, max_width: i32, font: &dyn TextRenderer) -> Vec<String> {
    let mut lines = Vec::new();
    if max_width <= 0 {
        return lines;
    }

    let space = font.char_width(' ');
    let mut current = String::new();
    let mut current_width = 0;

    for word in text.split(' ').filter(|w| !w.is_empty()) {
        let word_width = font.text_width(word);
        let needed = if current.is_empty() {
            word_width
        } else {
            current_width + space + word_width
        };

        if needed <= max_width {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_width = needed;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }

        if word_width <= max_width {
            current.push_str(word);
            current_width = word_width;
            continue;
        }

        for ch in word.chars() {
            let width = font.char_width(ch);
            if current_width + width > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(ch);
            current_width += width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Wrap `text` inside `rect` and draw it line by line.
///
/// Lines that would cross the bottom of `rect` are dropped. Returns the
/// number of lines drawn.
pub fn draw_wrapped(
    buffer: &mut PixelBuffer,
    rect: Rect,
    text: &str,
    color: u8,
    alignment: Alignment,
    font: &dyn TextRenderer,
) -> usize {
    let line_height = font.line_height();
    let mut y = rect.y;
    let mut drawn = 0;

    for line in wrap_text(text, rect.width, font) {
        if y + line_height > rect.bottom() {
            break;
        }

        let x = match alignment {
            Alignment::Left => rect.x,
            Alignment::Center => rect.x + (rect.width - font.text_width(&line)) / 2,
        };
        font.draw_text(buffer, &line, x, y, color);

        y += line_height;
        drawn += 1;
    }

    drawn
}

//! Ending slide with its narration caption.
//!
//! The slide image is stretched to the screen according to the `[ending]`
//! size mode and the narration text, if any, is wrapped into a black box
//! near the bottom of the slide.

use common::{MovieError, MovieSizeMode, Rect};
use std::io::Read;

use crate::assets::AssetSource;
use crate::config::EndingSettings;
use crate::movie::resample_nearest;
use crate::surface::{PixelBuffer, Screen, WindowId};
use crate::text::{TextRenderer, wrap_text};

/// Caption colour, full white in 5:5:5
const CAPTION_COLOR: u16 = 0x7FFF;

/// Gap between the caption box and the bottom of the slide
const CAPTION_BOTTOM_GAP: i32 = 8;

/// Caption file for an ending: `text\<language>\cuts\<name>.TXT`, where
/// `<name>` follows the last backslash of `file_name`.
pub fn ending_text_path(language: &str, file_name: &str) -> Option<String> {
    let (_, name) = file_name.rsplit_once('\\')?;
    Some(format!("text\\{}\\cuts\\{}.TXT", language, name))
}

/// Read an ending caption. Line breaks become spaces.
pub fn load_ending_text(
    assets: &dyn AssetSource,
    language: &str,
    file_name: &str,
) -> Result<String, MovieError> {
    let path = ending_text_path(language, file_name).ok_or_else(|| {
        MovieError::NotFound(format!("No caption path for ending {}", file_name))
    })?;

    let mut raw = Vec::new();
    assets.open(&path)?.read_to_end(&mut raw)?;

    let text = String::from_utf8_lossy(&raw)
        .chars()
        .filter(|&c| c != '\r')
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();

    log::debug!("Ending caption {}: {}", path, text);
    Ok(text)
}

/// Wrap a caption for the ending box.
///
/// Every `:` is blanked together with the character before it (speaker
/// tags), lines break at the nearest preceding space and trailing blank
/// lines are dropped.
pub fn wrap_ending_caption(text: &str, width: i32, font: &dyn TextRenderer) -> Vec<String> {
    let mut chars: Vec<char> = text.chars().collect();
    while let Some(colon) = chars.iter().position(|&c| c == ':') {
        if colon == 0 {
            break;
        }
        chars[colon] = ' ';
        chars[colon - 1] = ' ';
    }

    let cleaned: String = chars.into_iter().collect();
    let mut lines = wrap_text(&cleaned, width, font);
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    lines
}

/// Caption box in slide coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CaptionBox {
    /// Width to wrap captions to on a slide `slide_width` pixels wide
    pub fn wrap_width(slide_width: i32) -> i32 {
        let width = if slide_width >= 640 {
            560
        } else {
            slide_width - 80
        };

        if width < 100 { slide_width - 20 } else { width }
    }

    pub fn compute(slide_width: i32, slide_height: i32, lines: usize, line_height: i32) -> Self {
        let width = Self::wrap_width(slide_width);
        let height = line_height * lines as i32 + 2;

        Self {
            x: (slide_width - width) / 2,
            y: slide_height - height - CAPTION_BOTTOM_GAP,
            width,
            height,
        }
    }

    /// Area cleared behind the text, starting one row above it
    pub fn fill_rect(&self) -> Rect {
        Rect::new(self.x, self.y - 1, self.width, self.height)
    }
}

/// Clear the caption box and draw the lines into it
pub fn draw_ending_caption(
    buffer: &mut PixelBuffer,
    caption: &CaptionBox,
    lines: &[String],
    color: u8,
    font: &dyn TextRenderer,
) {
    buffer.fill_rect(caption.fill_rect(), 0);

    let line_height = font.line_height();
    for (index, line) in lines.iter().enumerate() {
        font.draw_text(
            buffer,
            line,
            caption.x,
            caption.y + index as i32 * line_height,
            color,
        );
    }
}

/// Size a `src_w x src_h` slide takes on the screen. `None` keeps the
/// source size.
pub fn ending_image_size(
    src_w: i32,
    src_h: i32,
    screen_w: i32,
    screen_h: i32,
    mode: MovieSizeMode,
) -> Option<(i32, i32)> {
    let fits = screen_w >= src_w && screen_h >= src_h;
    if mode == MovieSizeMode::Native && fits {
        return None;
    }

    if mode == MovieSizeMode::Fullscreen {
        return Some((screen_w, screen_h));
    }

    if screen_h * src_w >= screen_w * src_h {
        Some((screen_w, (screen_w * src_h + src_w) / src_w))
    } else {
        Some(((screen_h * src_w + src_h) / src_h, screen_h))
    }
}

/// Stretch a slide for the screen, patching the right column and bottom
/// row with their neighbours. Returns `None` when the slide is shown as is
/// or the stretched copy can't be allocated.
pub fn stretch_ending_image(
    image: &PixelBuffer,
    screen_w: i32,
    screen_h: i32,
    mode: MovieSizeMode,
) -> Option<PixelBuffer> {
    let (width, height) =
        ending_image_size(image.width(), image.height(), screen_w, screen_h, mode)?;

    let pixels = match resample_nearest(image.data(), image.width(), image.height(), width, height) {
        Ok(pixels) => pixels,
        Err(e) => {
            log::warn!("Ending slide not stretched: {}", e);
            return None;
        }
    };

    let mut stretched = PixelBuffer::try_new(width, height).ok()?;
    if stretched.write_data(&pixels).is_err() {
        return None;
    }

    let pitch = width as usize;
    let data = stretched.data_mut();
    if width >= 2 {
        for row in data.chunks_mut(pitch) {
            row[pitch - 1] = row[pitch - 2];
        }
    }
    if height >= 2 {
        let last = (height as usize - 1) * pitch;
        let (above, bottom) = data.split_at_mut(last);
        bottom.copy_from_slice(&above[last - pitch..]);
    }

    Some(stretched)
}

/// Ending slide shown in its own window
#[derive(Debug, Clone, Copy)]
pub struct EndingScreen {
    pub window: WindowId,
    pub width: i32,
    pub height: i32,
    pub caption_lines: usize,
}

/// Open a centred window with the slide and its caption and refresh it.
/// The slide is sized per the `[ending]` settings.
///
/// The caller destroys the window once the slide has been shown.
pub fn show_ending(
    screen: &mut Screen,
    image: &PixelBuffer,
    settings: &EndingSettings,
    caption: Option<&str>,
    font: &dyn TextRenderer,
) -> EndingScreen {
    let stretched = stretch_ending_image(image, screen.width(), screen.height(), settings.size);
    let slide = stretched.as_ref().unwrap_or(image);
    let (width, height) = (slide.width(), slide.height());

    let rect = Rect::new(
        (screen.width() - width) / 2,
        (screen.height() - height) / 2,
        width,
        height,
    );
    let window = screen.create_window(rect, 0);
    let color = screen.palette().index_for_rgb555(CAPTION_COLOR);

    let mut caption_lines = 0;
    if let Some(target) = screen.window_mut(window) {
        let buffer = target.buffer_mut();
        buffer.paste_region(slide.data(), width, height, 0, 0);

        if let Some(text) = caption {
            let lines = wrap_ending_caption(text, CaptionBox::wrap_width(width), font);
            if !lines.is_empty() {
                let caption_box = CaptionBox::compute(width, height, lines.len(), font.line_height());
                draw_ending_caption(buffer, &caption_box, &lines, color, font);
                caption_lines = lines.len();
            }
        }
    }

    screen.refresh_window(window);
    log::info!(
        "Ending slide {}x{} shown with {} caption lines",
        width,
        height,
        caption_lines
    );

    EndingScreen {
        window,
        width,
        height,
        caption_lines,
    }
}

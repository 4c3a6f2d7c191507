//! Timed subtitles.
//!
//! Sidecar files hold one caption per line as `<frame>:<text>`. Captions
//! are queued in file order and drawn in a band under the video once the
//! decoder's frame counter reaches their trigger frame.

use common::{MovieError, Rect};
use std::collections::VecDeque;
use std::io::BufRead;

use crate::assets::AssetSource;
use crate::surface::{Screen, WindowId};
use crate::text::{Alignment, TextRenderer, draw_wrapped};

/// Extra pixels around the caption line inside the band
pub const SUBTITLE_PADDING: i32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    pub frame: u64,
    pub text: String,
}

/// Parse one `frame:text` line. `None` when the line has no `:`.
///
/// The frame number is read like C `atoi`: leading whitespace, an optional
/// sign and the digits that follow. A missing or negative number makes the
/// caption due at once.
pub fn parse_line(line: &str) -> Option<SubtitleEntry> {
    let (number, text) = line.split_once(':')?;

    Some(SubtitleEntry {
        frame: leading_number(number).max(0) as u64,
        text: text.to_string(),
    })
}

fn leading_number(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add((d - b'0') as i64));

    if negative { -value } else { value }
}

/// Captions waiting to be shown, consumed from the front
#[derive(Debug, Clone, Default)]
pub struct SubtitleQueue {
    entries: VecDeque<SubtitleEntry>,
}

impl SubtitleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a sidecar file. Blank lines are ignored, lines without a `:` are
    /// logged and skipped.
    pub fn parse<R: BufRead>(mut reader: R) -> Result<Self, MovieError> {
        let mut queue = Self::new();
        let mut raw = Vec::new();

        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw)? == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }

            match parse_line(line) {
                Some(entry) => queue.entries.push_back(entry),
                None => log::warn!("Couldn't parse subtitle line: {}", line),
            }
        }

        log::debug!("Read {} subtitles", queue.len());
        Ok(queue)
    }

    /// Open and parse a sidecar through the asset layer
    pub fn load(assets: &dyn AssetSource, path: &str) -> Result<Self, MovieError> {
        log::debug!("Opening subtitle file {}", path);
        let reader = assets.open(path)?;
        Self::parse(std::io::BufReader::new(reader))
    }

    pub fn push(&mut self, entry: SubtitleEntry) {
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn front(&self) -> Option<&SubtitleEntry> {
        self.entries.front()
    }

    /// Remove and return the head entry if its trigger frame has been reached
    pub fn pop_due(&mut self, frame: u64) -> Option<SubtitleEntry> {
        if self.entries.front()?.frame <= frame {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubtitleEntry> {
        self.entries.iter()
    }
}

/// Default sidecar location for a movie: `text\<language>\cuts\<name>.SVE`
pub fn subtitle_path_for(movie_path: &str, language: &str) -> String {
    let name = movie_path
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or(movie_path);
    let stem = match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    };

    format!("text\\{}\\cuts\\{}.SVE", language, stem)
}

/// Horizontal strip the captions are drawn into, in window coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtitleBand {
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl SubtitleBand {
    /// Centre the band between the bottom of the video and the bottom of
    /// the screen. The band never extends past the screen and never covers
    /// the video; the latter wins when both can't hold.
    pub fn place(video_bottom: i32, screen_height: i32, width: i32, height: i32) -> Self {
        let mut y = video_bottom + ((screen_height - video_bottom) - height) / 2;

        if y + height > screen_height {
            y = screen_height - height;
        }

        if y < video_bottom {
            y = video_bottom;
        }

        Self { y, width, height }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(0, self.y, self.width, self.height)
    }
}

/// Draw every caption whose trigger frame is `<= frame`.
///
/// Each caption clears the band, is centred and wrapped inside it, and
/// the band is refreshed on screen before the entry is dropped. Returns
/// the number of captions drawn.
pub fn render_due(
    queue: &mut SubtitleQueue,
    frame: u64,
    screen: &mut Screen,
    window: WindowId,
    band: &SubtitleBand,
    color: u8,
    font: &dyn TextRenderer,
) -> usize {
    let rect = band.rect();
    let mut drawn = 0;

    while let Some(entry) = queue.pop_due(frame) {
        let Some(target) = screen.window_mut(window) else {
            log::warn!("Subtitle window {:?} is gone", window);
            break;
        };

        let buffer = target.buffer_mut();
        buffer.fill_rect(rect, 0);
        draw_wrapped(buffer, rect, &entry.text, color, Alignment::Center, font);
        screen.refresh_window_rect(window, rect);

        log::trace!("Subtitle at frame {} (due {}): {}", frame, entry.frame, entry.text);
        drawn += 1;
    }

    drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessPresenter;
    use crate::text::MonospaceFont;
    use std::io::Cursor;

    #[test]
    fn test_parse_keeps_order_and_skips_bad_lines() {
        let text = "10:Hello\r\n\r\nno colon here\n25:World: again\n40:Last";
        let queue = SubtitleQueue::parse(Cursor::new(text)).unwrap();

        let entries: Vec<_> = queue.iter().cloned().collect();
        assert_eq!(
            entries,
            vec![
                SubtitleEntry {
                    frame: 10,
                    text: "Hello".to_string()
                },
                SubtitleEntry {
                    frame: 25,
                    text: "World: again".to_string()
                },
                SubtitleEntry {
                    frame: 40,
                    text: "Last".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_line_leading_digits() {
        assert_eq!(parse_line(" 12:a").map(|e| e.frame), Some(12));
        assert_eq!(parse_line("12x:a").map(|e| e.frame), Some(12));
        assert_eq!(parse_line("+7:a").map(|e| e.frame), Some(7));
        assert_eq!(parse_line("12 a"), None);
    }

    #[test]
    fn test_parse_untimed_lines_are_due_at_once() {
        assert_eq!(parse_line("x12:a").map(|e| e.frame), Some(0));
        assert_eq!(parse_line("-5:x").map(|e| e.frame), Some(0));

        let text = ":Narrator speaks\nabc:Tagged\n5:ok\n";
        let queue = SubtitleQueue::parse(Cursor::new(text)).unwrap();
        let frames: Vec<_> = queue.iter().map(|e| e.frame).collect();
        assert_eq!(frames, vec![0, 0, 5]);

        let texts: Vec<_> = queue.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["Narrator speaks", "Tagged", "ok"]);
    }

    #[test]
    fn test_pop_due_never_early() {
        let mut queue = SubtitleQueue::parse(Cursor::new("5:a\n5:b\n9:c\n")).unwrap();
        assert!(queue.pop_due(4).is_none());
        assert_eq!(queue.pop_due(5).map(|e| e.text), Some("a".to_string()));
        assert_eq!(queue.pop_due(5).map(|e| e.text), Some("b".to_string()));
        assert!(queue.pop_due(8).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_subtitle_path_for() {
        assert_eq!(
            subtitle_path_for("art\\cuts\\intro.mve", "english"),
            "text\\english\\cuts\\intro.SVE"
        );
        assert_eq!(subtitle_path_for("credits", "german"), "text\\german\\cuts\\credits.SVE");
    }

    #[test]
    fn test_band_placement() {
        // 400px video at y 40 on a 480 screen: 40px left, 14px band centred
        let band = SubtitleBand::place(440, 480, 640, 14);
        assert_eq!(band.y, 453);

        // Too little room: clamp to the screen bottom
        let band = SubtitleBand::place(470, 480, 640, 14);
        assert_eq!(band.y, 470);

        // Video fills the screen: the band goes below the video
        let band = SubtitleBand::place(480, 480, 640, 14);
        assert_eq!(band.y, 480);
    }

    #[test]
    fn test_render_due_draws_and_refreshes() {
        let mut screen = Screen::new(64, 32, Box::new(HeadlessPresenter::new()));
        let window = screen.create_window(Rect::new(0, 0, 64, 32), 0);
        let font = MonospaceFont::new(4, 6);
        let band = SubtitleBand::place(20, 32, 64, 6 + SUBTITLE_PADDING);

        let mut queue = SubtitleQueue::parse(Cursor::new("1:hi\n2:yo\n10:later\n")).unwrap();

        assert_eq!(render_due(&mut queue, 0, &mut screen, window, &band, 200, &font), 0);
        assert_eq!(render_due(&mut queue, 3, &mut screen, window, &band, 200, &font), 2);
        assert_eq!(queue.len(), 1);

        let drawn = (band.y..band.y + band.height)
            .flat_map(|y| (0..64).map(move |x| (x, y)))
            .filter(|&(x, y)| screen.surface().pixel(x, y) == Some(200))
            .count();
        assert!(drawn > 0);
    }
}

use anyhow::{Context, Result};
use common::Rect;

use super::buffer::{PixelBuffer, blit_buffer_to_buffer};
use super::palette::Palette;
use super::presenter::Presenter;
use super::window::{Window, WindowId};
use crate::config::ScreenSettings;

/// Smallest logical resolution the 2x scaler may produce
const MIN_SCALED_WIDTH: i32 = 640;
const MIN_SCALED_HEIGHT: i32 = 480;

/// The game's drawing surface.
///
/// Holds the 8-bit indexed surface everything draws into, the palette, an
/// RGB888 mirror that is handed to the [`Presenter`] and the windows
/// stacked on top of the surface.
pub struct Screen {
    surface: PixelBuffer,
    palette: Palette,
    texture: Vec<u32>,
    presenter: Box<dyn Presenter>,
    windows: Vec<Window>,
    next_window_id: u32,
    presents: u64,
    scale: i32,
    fullscreen: bool,
}

impl Screen {
    pub fn new(width: i32, height: i32, presenter: Box<dyn Presenter>) -> Self {
        let surface = PixelBuffer::new(width, height);
        let palette = Palette::default();
        let texture = vec![palette.rgb888(0); surface.data().len()];

        Self {
            surface,
            palette,
            texture,
            presenter,
            windows: Vec::new(),
            next_window_id: 1,
            presents: 0,
            scale: 1,
            fullscreen: false,
        }
    }

    /// Create the screen described by the `[screen]` settings.
    ///
    /// 2x scaling halves the logical resolution and is only honoured when
    /// the result is still at least 640x480.
    pub fn from_settings(settings: &ScreenSettings, presenter: Box<dyn Presenter>) -> Result<Self> {
        if settings.width <= 0 || settings.height <= 0 {
            anyhow::bail!(
                "Invalid screen size {}x{}",
                settings.width,
                settings.height
            );
        }

        let mut width = settings.width;
        let mut height = settings.height;
        let mut scale = if settings.scale_2x { 2 } else { 1 };

        if scale > 1 {
            if width / scale < MIN_SCALED_WIDTH || height / scale < MIN_SCALED_HEIGHT {
                log::info!(
                    "2x scaling disabled: {}x{} would drop below {}x{}",
                    width,
                    height,
                    MIN_SCALED_WIDTH,
                    MIN_SCALED_HEIGHT
                );
                scale = 1;
            } else {
                width /= scale;
                height /= scale;
            }
        }

        let mut screen = Self::new(width, height, presenter);
        screen.scale = scale;
        screen.fullscreen = !settings.windowed;

        log::info!(
            "Screen initialized: {}x{} (scale {}x, {})",
            width,
            height,
            scale,
            if screen.fullscreen { "fullscreen" } else { "windowed" }
        );

        Ok(screen)
    }

    pub fn width(&self) -> i32 {
        self.surface.width()
    }

    pub fn height(&self) -> i32 {
        self.surface.height()
    }

    pub fn bounds(&self) -> Rect {
        self.surface.bounds()
    }

    /// Pixel scale applied by the presenter
    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn surface(&self) -> &PixelBuffer {
        &self.surface
    }

    pub fn texture(&self) -> &[u32] {
        &self.texture
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Number of frames handed to the presenter so far
    pub fn present_count(&self) -> u64 {
        self.presents
    }

    /// Copy a rectangle of `src` onto the surface at `(dest_x, dest_y)`.
    ///
    /// The destination is clipped to the screen. Sources too short for the
    /// requested rectangle are rejected with a warning.
    pub fn blit(&mut self, src: &[u8], src_pitch: usize, src_rect: Rect, dest_x: i32, dest_y: i32) {
        if let Some(dirty) =
            copy_to_surface(&mut self.surface, src, src_pitch, src_rect, dest_x, dest_y)
        {
            self.update_texture(dirty);
        }
    }

    /// Push a window-local rectangle of a window buffer to the screen
    pub fn refresh_window_rect(&mut self, id: WindowId, rect: Rect) {
        let Some(window) = self.windows.iter().find(|w| w.id() == id) else {
            log::warn!("Refresh requested for unknown window {:?}", id);
            return;
        };

        let Some(local) = rect.intersect(&window.buffer().bounds()) else {
            return;
        };

        let origin = window.rect();
        let dirty = copy_to_surface(
            &mut self.surface,
            window.buffer().data(),
            window.buffer().pitch(),
            local,
            origin.x + local.x,
            origin.y + local.y,
        );

        if let Some(dirty) = dirty {
            self.update_texture(dirty);
        }
    }

    /// Push a whole window to the screen
    pub fn refresh_window(&mut self, id: WindowId) {
        if let Some(window) = self.window(id) {
            let bounds = window.buffer().bounds();
            self.refresh_window_rect(id, bounds);
        }
    }

    /// Clear the surface to colour 0
    pub fn clear(&mut self) {
        self.surface.fill(0);
        self.update_texture(self.surface.bounds());
    }

    /// Hand the texture to the presenter
    pub fn present(&mut self) -> Result<()> {
        #[cfg(feature = "profiling")]
        let start = std::time::Instant::now();

        let (width, height) = (self.width() as u32, self.height() as u32);
        self.presenter
            .present(&self.texture, width, height)
            .context("Failed to present frame")?;
        self.presents += 1;

        #[cfg(feature = "profiling")]
        log::debug!("Present #{} took {:?}", self.presents, start.elapsed());

        Ok(())
    }

    /// Replace the full palette (768 bytes of 6-bit triplets)
    pub fn set_palette(&mut self, bytes: &[u8]) {
        self.palette = Palette::from_bytes(bytes);
        self.update_texture(self.surface.bounds());
    }

    /// Replace `count` palette entries starting at `start`
    pub fn set_palette_range(&mut self, bytes: &[u8], start: usize, count: usize) {
        if count == 0 {
            return;
        }
        self.palette.set_range(bytes, start, count);
        self.update_texture(self.surface.bounds());
    }

    pub fn create_window(&mut self, rect: Rect, color: u8) -> WindowId {
        let id = WindowId(self.next_window_id);
        self.next_window_id += 1;
        self.windows.push(Window::new(id, rect, color));
        log::debug!("Created window {:?} at {:?}", id, rect);
        id
    }

    pub fn destroy_window(&mut self, id: WindowId) -> bool {
        let before = self.windows.len();
        self.windows.retain(|w| w.id() != id);
        before != self.windows.len()
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id() == id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.id() == id)
    }

    /// Window buffer together with the palette, for colour blending
    pub fn window_and_palette_mut(&mut self, id: WindowId) -> Option<(&mut Window, &Palette)> {
        let window = self.windows.iter_mut().find(|w| w.id() == id)?;
        Some((window, &self.palette))
    }

    fn update_texture(&mut self, rect: Rect) {
        let Some(clip) = rect.intersect(&self.surface.bounds()) else {
            return;
        };

        let pitch = self.surface.pitch();
        let pixels = self.surface.data();
        for y in clip.y..clip.bottom() {
            let start = y as usize * pitch + clip.x as usize;
            let end = start + clip.width as usize;
            for (texel, &index) in self.texture[start..end].iter_mut().zip(&pixels[start..end]) {
                *texel = self.palette.rgb888(index);
            }
        }
    }
}

/// Clip and copy a source rectangle into the surface. Returns the
/// rectangle that changed.
fn copy_to_surface(
    surface: &mut PixelBuffer,
    src: &[u8],
    src_pitch: usize,
    src_rect: Rect,
    dest_x: i32,
    dest_y: i32,
) -> Option<Rect> {
    if src_rect.is_empty() || src_rect.x < 0 || src_rect.y < 0 {
        return None;
    }

    let dest = Rect::new(dest_x, dest_y, src_rect.width, src_rect.height);
    let clip = dest.intersect(&surface.bounds())?;

    let sx = (src_rect.x + clip.x - dest_x) as usize;
    let sy = (src_rect.y + clip.y - dest_y) as usize;
    let start = sy * src_pitch + sx;
    let needed = start + (clip.height as usize - 1) * src_pitch + clip.width as usize;
    if src.len() < needed {
        log::warn!(
            "Blit source too small: {} bytes, {} needed for {:?}",
            src.len(),
            needed,
            src_rect
        );
        return None;
    }

    let pitch = surface.pitch();
    let offset = clip.y as usize * pitch + clip.x as usize;
    blit_buffer_to_buffer(
        &src[start..],
        clip.width as usize,
        clip.height as usize,
        src_pitch,
        &mut surface.data_mut()[offset..],
        pitch,
    );

    Some(clip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessPresenter;

    fn screen(width: i32, height: i32) -> Screen {
        Screen::new(width, height, Box::new(HeadlessPresenter::new()))
    }

    #[test]
    fn test_blit_clips_to_screen() {
        let mut screen = screen(4, 4);
        let src = [9u8; 9];
        screen.blit(&src, 3, Rect::new(0, 0, 3, 3), 2, 2);

        assert_eq!(screen.surface().pixel(2, 2), Some(9));
        assert_eq!(screen.surface().pixel(3, 3), Some(9));
        assert_eq!(screen.surface().pixel(1, 1), Some(0));
        assert_eq!(screen.texture()[3 * 4 + 3], screen.palette().rgb888(9));
    }

    #[test]
    fn test_blit_rejects_short_source() {
        let mut screen = screen(4, 4);
        screen.blit(&[1, 2], 2, Rect::new(0, 0, 2, 2), 0, 0);
        assert!(screen.surface().data().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_palette_change_rebuilds_texture() {
        let mut screen = screen(2, 1);
        screen.blit(&[5, 5], 2, Rect::new(0, 0, 2, 1), 0, 0);
        screen.set_palette_range(&[63, 0, 0], 5, 1);
        assert_eq!(screen.texture()[0], 0x00FC_0000);
    }

    #[test]
    fn test_window_refresh() {
        let mut screen = screen(8, 8);
        let id = screen.create_window(Rect::new(2, 2, 4, 4), 3);
        screen.refresh_window_rect(id, Rect::new(1, 1, 2, 2));

        assert_eq!(screen.surface().pixel(3, 3), Some(3));
        assert_eq!(screen.surface().pixel(4, 4), Some(3));
        assert_eq!(screen.surface().pixel(2, 2), Some(0));

        assert!(screen.destroy_window(id));
        assert!(screen.window(id).is_none());
        assert!(!screen.destroy_window(id));
    }

    #[test]
    fn test_present_counts() {
        let mut screen = screen(2, 2);
        screen.present().unwrap();
        screen.present().unwrap();
        assert_eq!(screen.present_count(), 2);
    }

    #[test]
    fn test_from_settings_scale_rule() {
        let settings = ScreenSettings {
            width: 1280,
            height: 960,
            windowed: true,
            scale_2x: true,
        };
        let screen = Screen::from_settings(&settings, Box::new(HeadlessPresenter::new())).unwrap();
        assert_eq!((screen.width(), screen.height(), screen.scale()), (640, 480, 2));

        let settings = ScreenSettings {
            width: 1024,
            height: 768,
            windowed: false,
            scale_2x: true,
        };
        let screen = Screen::from_settings(&settings, Box::new(HeadlessPresenter::new())).unwrap();
        assert_eq!((screen.width(), screen.height(), screen.scale()), (1024, 768, 1));
        assert!(screen.is_fullscreen());
    }
}

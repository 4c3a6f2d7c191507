use common::Rect;

use super::buffer::PixelBuffer;

/// Handle to a window owned by a [`super::Screen`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub(super) u32);

/// A screen-positioned rectangle with its own backing buffer
#[derive(Debug)]
pub struct Window {
    id: WindowId,
    rect: Rect,
    buffer: PixelBuffer,
}

impl Window {
    pub(super) fn new(id: WindowId, rect: Rect, color: u8) -> Self {
        let mut buffer = PixelBuffer::new(rect.width, rect.height);
        buffer.fill(color);
        Self { id, rect, buffer }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Position and size in screen coordinates
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn width(&self) -> i32 {
        self.rect.width
    }

    pub fn height(&self) -> i32 {
        self.rect.height
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    /// Fill a window-local rectangle
    pub fn fill(&mut self, rect: Rect, color: u8) {
        self.buffer.fill_rect(rect, color);
    }
}

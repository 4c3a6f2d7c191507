use common::{MovieError, Rect};

/// Owned 8-bit indexed pixel buffer. Pitch always equals width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: i32,
    height: i32,
}

impl PixelBuffer {
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            data: vec![0; (width * height) as usize],
            width,
            height,
        }
    }

    /// Allocate without aborting on out-of-memory
    pub fn try_new(width: i32, height: i32) -> Result<Self, MovieError> {
        let width = width.max(0);
        let height = height.max(0);
        let len = width as usize * height as usize;

        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, 0);

        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn fill(&mut self, color: u8) {
        self.data.fill(color);
    }

    /// Fill a rectangle, clipped to the buffer
    pub fn fill_rect(&mut self, rect: Rect, color: u8) {
        let Some(clip) = rect.intersect(&self.bounds()) else {
            return;
        };

        let pitch = self.width as usize;
        for y in clip.y..clip.bottom() {
            let start = y as usize * pitch + clip.x as usize;
            self.data[start..start + clip.width as usize].fill(color);
        }
    }

    /// Replace the whole buffer. Data must match the buffer size exactly.
    pub fn write_data(&mut self, data: &[u8]) -> anyhow::Result<()> {
        if data.len() != self.data.len() {
            anyhow::bail!(
                "Pixel data size mismatch: expected {}, got {}",
                self.data.len(),
                data.len()
            );
        }

        self.data.copy_from_slice(data);
        Ok(())
    }

    /// Copy of the buffer contents
    pub fn read_data(&self) -> Vec<u8> {
        self.data.clone()
    }

    /// Copy a rectangle out into a tightly packed buffer
    pub fn copy_region(&self, rect: Rect) -> Result<Vec<u8>, MovieError> {
        let clip = rect.intersect(&self.bounds()).ok_or_else(|| {
            MovieError::Malformed(format!("Region {:?} lies outside the buffer", rect))
        })?;

        let mut out = Vec::new();
        out.try_reserve_exact(clip.width as usize * clip.height as usize)?;
        out.resize(clip.width as usize * clip.height as usize, 0);

        blit_buffer_to_buffer(
            &self.data[self.offset(clip.x, clip.y)..],
            clip.width as usize,
            clip.height as usize,
            self.width as usize,
            &mut out,
            clip.width as usize,
        );

        Ok(out)
    }

    /// Paste a tightly packed block at the given position, clipped
    pub fn paste_region(&mut self, src: &[u8], src_width: i32, src_height: i32, x: i32, y: i32) {
        let target = Rect::new(x, y, src_width, src_height);
        let Some(clip) = target.intersect(&self.bounds()) else {
            return;
        };

        let src_offset = ((clip.y - y) * src_width + (clip.x - x)) as usize;
        let dst_offset = self.offset(clip.x, clip.y);
        let pitch = self.width as usize;

        blit_buffer_to_buffer(
            &src[src_offset..],
            clip.width as usize,
            clip.height as usize,
            src_width as usize,
            &mut self.data[dst_offset..],
            pitch,
        );
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn pitch(&self) -> usize {
        self.width as usize
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[self.offset(x, y)])
    }

    fn offset(&self, x: i32, y: i32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Copy `height` rows of `width` bytes between two pitched buffers
pub fn blit_buffer_to_buffer(
    src: &[u8],
    width: usize,
    height: usize,
    src_pitch: usize,
    dst: &mut [u8],
    dst_pitch: usize,
) {
    for row in 0..height {
        let s = row * src_pitch;
        let d = row * dst_pitch;
        dst[d..d + width].copy_from_slice(&src[s..s + width]);
    }
}

/// Parse a hex color string (e.g., "#FF5733" or "FF5733") to RGB
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let color = color.trim_start_matches('#');

    if color.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&color[0..2], 16).ok()?;
    let g = u8::from_str_radix(&color[2..4], 16).ok()?;
    let b = u8::from_str_radix(&color[4..6], 16).ok()?;

    Some((r, g, b))
}

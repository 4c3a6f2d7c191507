//! Last-frame cache
//!
//! Keeps a copy of the final decoded frame of a session so pause and
//! transition screens can still show it once the decoder has released its
//! buffers.

use common::MovieError;

#[derive(Debug, Default)]
pub struct LastFrameCache {
    frame: Option<Vec<u8>>,
    width: i32,
    height: i32,
}

impl LastFrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `width * height` bytes out of the decoder's buffer
    pub fn store(&mut self, pixels: &[u8], width: i32, height: i32) -> Result<(), MovieError> {
        self.clear();

        let len = width.max(0) as usize * height.max(0) as usize;
        if len == 0 {
            return Ok(());
        }
        if pixels.len() < len {
            return Err(MovieError::Malformed(format!(
                "Last frame holds {} bytes, {}x{} needs {}",
                pixels.len(),
                width,
                height,
                len
            )));
        }

        let mut frame = Vec::new();
        frame.try_reserve_exact(len)?;
        frame.extend_from_slice(&pixels[..len]);

        self.frame = Some(frame);
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.frame = None;
        self.width = 0;
        self.height = 0;
    }

    pub fn frame(&self) -> Option<&[u8]> {
        self.frame.as_deref()
    }

    pub fn dimensions(&self) -> Option<(i32, i32)> {
        self.frame.as_ref().map(|_| (self.width, self.height))
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_copies_prefix() {
        let mut cache = LastFrameCache::new();
        cache.store(&[1, 2, 3, 4, 5, 6, 7], 3, 2).unwrap();
        assert_eq!(cache.frame(), Some(&[1, 2, 3, 4, 5, 6][..]));
        assert_eq!(cache.dimensions(), Some((3, 2)));

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.dimensions(), None);
    }

    #[test]
    fn test_store_rejects_short_buffer() {
        let mut cache = LastFrameCache::new();
        cache.store(&[1, 2, 3, 4], 2, 2).unwrap();
        assert!(cache.store(&[1, 2], 2, 2).is_err());
        assert!(cache.is_empty());
    }
}

//! Alpha-blended overlay for movies playing over existing UI.
//!
//! The companion stream starts with a header (`u32` largest record, two
//! reserved `u16`), followed by one record per frame: a `u32` length and
//! that many bytes of mask, one alpha value per frame pixel. All integers
//! are little-endian.

use common::{MovieError, Rect};
use std::collections::HashMap;
use std::io::Read;

use super::codec::DecodedFrame;
use crate::surface::{Palette, PixelBuffer};
use crate::warn_once;

/// Blends remembered before the cache starts over
const BLEND_CACHE_LIMIT: usize = 4096;

pub struct AlphaOverlay {
    stream: Box<dyn Read>,
    mask: Vec<u8>,
    mask_len: usize,
    /// Window contents under the movie rectangle before playback
    snapshot: Vec<u8>,
    /// Movie rectangle in window coordinates
    rect: Rect,
    incompatible: bool,
    exhausted: bool,
    blend_cache: HashMap<(u8, u8, u8), u8>,
}

impl AlphaOverlay {
    /// Read the stream header, allocate the mask and capture the
    /// background under `rect`.
    pub fn open(
        mut stream: Box<dyn Read>,
        window: &PixelBuffer,
        rect: Rect,
    ) -> Result<Self, MovieError> {
        if rect.is_empty() || !window.bounds().contains_rect(&rect) {
            return Err(MovieError::Malformed(format!(
                "Alpha rectangle {:?} does not fit the window",
                rect
            )));
        }

        let max_len = read_u32(stream.as_mut())? as usize;
        let _reserved_a = read_u16(stream.as_mut())?;
        let _reserved_b = read_u16(stream.as_mut())?;

        // A mask covers at most one frame, which must fit the rectangle
        let area = rect.width as usize * rect.height as usize;
        if max_len > area {
            return Err(MovieError::Malformed(format!(
                "Alpha records of {} bytes exceed the {}x{} aperture",
                max_len, rect.width, rect.height
            )));
        }

        let mut mask = Vec::new();
        mask.try_reserve_exact(max_len)?;
        mask.resize(max_len, 0);

        let snapshot = window.copy_region(rect)?;

        log::debug!(
            "Alpha overlay opened: {}x{} at ({}, {}), records up to {} bytes",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            max_len
        );

        Ok(Self {
            stream,
            mask,
            mask_len: 0,
            snapshot,
            rect,
            incompatible: false,
            exhausted: false,
            blend_cache: HashMap::new(),
        })
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Set once the mask stopped matching the movie frames
    pub fn is_incompatible(&self) -> bool {
        self.incompatible
    }

    /// Set once the companion stream ran dry or broke
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Current mask record
    pub fn mask(&self) -> &[u8] {
        &self.mask[..self.mask_len]
    }

    /// Load the mask record for the next frame. Returns `false` once the
    /// stream can no longer supply records.
    pub fn advance(&mut self) -> bool {
        if self.exhausted {
            return false;
        }

        match self.read_record() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Alpha stream stopped, blitting unmasked: {}", e);
                self.exhausted = true;
                self.mask_len = 0;
                false
            }
        }
    }

    fn read_record(&mut self) -> Result<(), MovieError> {
        let len = read_u32(self.stream.as_mut())? as usize;
        if len > self.mask.len() {
            return Err(MovieError::Malformed(format!(
                "Alpha record of {} bytes exceeds the {} byte header limit",
                len,
                self.mask.len()
            )));
        }

        self.stream.read_exact(&mut self.mask[..len])?;
        self.mask_len = len;
        Ok(())
    }

    /// Blend `frame` over the snapshot into `dest` at the movie rectangle.
    ///
    /// Returns `false` without touching `dest` when the mask can't be used;
    /// the caller then blits unmasked. A geometry mismatch marks the
    /// overlay incompatible for the rest of playback.
    pub fn composite(
        &mut self,
        frame: &DecodedFrame<'_>,
        dest: &mut PixelBuffer,
        palette: &Palette,
    ) -> bool {
        if self.incompatible || self.exhausted {
            return false;
        }

        let frame_len = frame.src_w.max(0) as usize * frame.src_h.max(0) as usize;
        let fits = frame.is_complete()
            && frame.src_w <= self.rect.width
            && frame.src_h <= self.rect.height
            && self.mask_len == frame_len;
        if !fits {
            warn_once!(
                self.incompatible,
                "Alpha mask of {} bytes does not match {}x{} frame in {}x{} aperture, blitting unmasked",
                self.mask_len,
                frame.src_w,
                frame.src_h,
                self.rect.width,
                self.rect.height
            );
            return false;
        }

        if !dest.bounds().contains_rect(&self.rect) {
            return false;
        }

        let width = frame.src_w as usize;
        let pitch = dest.pitch();
        let snapshot_pitch = self.rect.width as usize;
        let origin = self.rect.y as usize * pitch + self.rect.x as usize;
        let data = dest.data_mut();

        for row in 0..frame.src_h as usize {
            let src_row = &frame.pixels[row * width..(row + 1) * width];
            let mask_row = &self.mask[row * width..(row + 1) * width];
            let back_row = &self.snapshot[row * snapshot_pitch..row * snapshot_pitch + width];
            let out_row = &mut data[origin + row * pitch..origin + row * pitch + width];

            for (((out, &src), &back), &alpha) in out_row
                .iter_mut()
                .zip(src_row)
                .zip(back_row)
                .zip(mask_row)
            {
                *out = match alpha {
                    0 => back,
                    255 => src,
                    _ => {
                        if self.blend_cache.len() >= BLEND_CACHE_LIMIT {
                            self.blend_cache.clear();
                        }
                        *self
                            .blend_cache
                            .entry((src, back, alpha))
                            .or_insert_with(|| palette.blend(src, back, alpha))
                    }
                };
            }
        }

        true
    }

    /// Put the captured background back. Returns the rectangle to refresh.
    pub fn restore(&self, dest: &mut PixelBuffer) -> Rect {
        dest.paste_region(
            &self.snapshot,
            self.rect.width,
            self.rect.height,
            self.rect.x,
            self.rect.y,
        );
        self.rect
    }

    /// Forget cached blends, needed after a palette change
    pub fn invalidate_blends(&mut self) {
        self.blend_cache.clear();
    }
}

fn read_u32(reader: &mut dyn Read) -> Result<u32, MovieError> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_u16(reader: &mut dyn Read) -> Result<u16, MovieError> {
    let mut bytes = [0u8; 2];
    reader.read_exact(&mut bytes)?;
    Ok(u16::from_le_bytes(bytes))
}

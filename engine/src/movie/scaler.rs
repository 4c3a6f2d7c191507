//! Output geometry and nearest-neighbour resampling for movie frames.

use common::{MovieError, MovieSizeMode};

const FIXED_SHIFT: u32 = 16;

/// Where a frame lands on the destination, in destination pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameLayout {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FrameLayout {
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Margin reserved below the video: only when the movie has subtitles
/// loaded and the player wants to see them.
pub fn effective_margin(margin: f32, subtitles_loaded: bool, subtitles_enabled: bool) -> f32 {
    if subtitles_loaded && subtitles_enabled {
        margin
    } else {
        0.0
    }
}

/// Compute output size and position of a `src_w x src_h` frame on a
/// `dest_w x dest_h` destination.
///
/// `margin` is the fraction of the destination height kept free for
/// subtitles. Fullscreen frames sit at the top unless `has_subtitles`.
pub fn compute_layout(
    src_w: i32,
    src_h: i32,
    dest_w: i32,
    dest_h: i32,
    mode: MovieSizeMode,
    margin: f32,
    has_subtitles: bool,
) -> FrameLayout {
    if src_w <= 0 || src_h <= 0 || dest_w <= 0 || dest_h <= 0 {
        return FrameLayout::default();
    }

    let available = 1.0 - margin as f64;

    match mode {
        MovieSizeMode::Native => FrameLayout {
            x: (dest_w - src_w) / 2,
            y: (dest_h - src_h) / 2,
            width: src_w,
            height: src_h,
        },
        MovieSizeMode::Aspect => {
            let scale = (dest_w as f64 / src_w as f64)
                .min(dest_h as f64 * available / src_h as f64);
            let width = truncate(src_w as f64 * scale);
            let height = truncate(src_h as f64 * scale);
            FrameLayout {
                x: (dest_w - width) / 2,
                y: (dest_h - height) / 2,
                width,
                height,
            }
        }
        MovieSizeMode::Fullscreen => {
            let height = truncate(dest_h as f64 * available);
            FrameLayout {
                x: 0,
                y: if has_subtitles { (dest_h - height) / 2 } else { 0 },
                width: dest_w,
                height,
            }
        }
    }
}

// Tolerate binary rounding of the margin fraction (480 * 0.85 is 408, not 407)
fn truncate(value: f64) -> i32 {
    (value + 1e-4) as i32
}

/// Resample into a new tightly packed `dst_w x dst_h` buffer
pub fn resample_nearest(
    src: &[u8],
    src_w: i32,
    src_h: i32,
    dst_w: i32,
    dst_h: i32,
) -> Result<Vec<u8>, MovieError> {
    if dst_w <= 0 || dst_h <= 0 {
        return Ok(Vec::new());
    }

    let len = dst_w as usize * dst_h as usize;
    let mut out = Vec::new();
    out.try_reserve_exact(len)?;
    out.resize(len, 0);

    resample_into(src, src_w, src_h, &mut out, dst_w as usize, dst_w, dst_h)?;
    Ok(out)
}

/// Nearest-neighbour resample into a pitched destination.
///
/// Steps are 16.16 fixed point; the last source row and column are
/// clamped, nothing else is filtered.
pub fn resample_into(
    src: &[u8],
    src_w: i32,
    src_h: i32,
    dst: &mut [u8],
    dst_pitch: usize,
    dst_w: i32,
    dst_h: i32,
) -> Result<(), MovieError> {
    if src_w <= 0 || src_h <= 0 || dst_w <= 0 || dst_h <= 0 {
        return Ok(());
    }

    let src_len = src_w as usize * src_h as usize;
    if src.len() < src_len {
        return Err(MovieError::Malformed(format!(
            "Frame data too short: {} bytes for {}x{}",
            src.len(),
            src_w,
            src_h
        )));
    }

    let dst_needed = (dst_h as usize - 1) * dst_pitch + dst_w as usize;
    if dst.len() < dst_needed {
        return Err(MovieError::Malformed(format!(
            "Destination too small: {} bytes for {}x{} at pitch {}",
            dst.len(),
            dst_w,
            dst_h,
            dst_pitch
        )));
    }

    let x_step = ((src_w as i64) << FIXED_SHIFT) / dst_w as i64;
    let y_step = ((src_h as i64) << FIXED_SHIFT) / dst_h as i64;
    let src_w = src_w as usize;
    let src_h = src_h as usize;

    let mut y_fixed = 0i64;
    for row in dst.chunks_mut(dst_pitch).take(dst_h as usize) {
        let sy = ((y_fixed >> FIXED_SHIFT) as usize).min(src_h - 1);
        let src_row = &src[sy * src_w..(sy + 1) * src_w];

        let mut x_fixed = 0i64;
        for pixel in row.iter_mut().take(dst_w as usize) {
            let sx = ((x_fixed >> FIXED_SHIFT) as usize).min(src_w - 1);
            *pixel = src_row[sx];
            x_fixed += x_step;
        }

        y_fixed += y_step;
    }

    Ok(())
}

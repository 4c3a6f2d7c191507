//! 256-colour VGA palette.
//!
//! Entries are stored as 6-bit components the way the movie decoder and
//! the game's palette files deliver them. Conversion to 8-bit happens only
//! when the texture mirror is built.

pub const PALETTE_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [[u8; 3]; PALETTE_SIZE],
}

impl Default for Palette {
    fn default() -> Self {
        Self::grayscale()
    }
}

impl Palette {
    pub fn grayscale() -> Self {
        let mut entries = [[0u8; 3]; PALETTE_SIZE];
        for (index, entry) in entries.iter_mut().enumerate() {
            let level = (index >> 2) as u8;
            *entry = [level, level, level];
        }
        Self { entries }
    }

    /// Build from a full 768-byte table of 6-bit triplets
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut palette = Self::grayscale();
        palette.set_range(bytes, 0, PALETTE_SIZE);
        palette
    }

    /// Replace `count` entries starting at `start`.
    ///
    /// `bytes` holds the triplets for the changed entries only. Anything
    /// beyond the palette or the supplied bytes is ignored.
    pub fn set_range(&mut self, bytes: &[u8], start: usize, count: usize) {
        for (offset, rgb) in bytes.chunks_exact(3).take(count).enumerate() {
            let index = start + offset;
            if index >= PALETTE_SIZE {
                break;
            }
            self.entries[index] = [rgb[0] & 0x3F, rgb[1] & 0x3F, rgb[2] & 0x3F];
        }
    }

    /// 6-bit triplets for all entries
    pub fn to_bytes(&self) -> Vec<u8> {
        self.entries.iter().flatten().copied().collect()
    }

    pub fn entry(&self, index: u8) -> [u8; 3] {
        self.entries[index as usize]
    }

    /// 0x00RRGGBB value for the texture mirror
    pub fn rgb888(&self, index: u8) -> u32 {
        let [r, g, b] = self.entries[index as usize];
        ((r as u32) << 18) | ((g as u32) << 10) | ((b as u32) << 2)
    }

    /// Index whose colour is nearest to an 8-bit RGB value
    pub fn closest_index(&self, r: u8, g: u8, b: u8) -> u8 {
        let target = [r as i32 >> 2, g as i32 >> 2, b as i32 >> 2];

        let mut best = 0usize;
        let mut best_distance = i32::MAX;
        for (index, entry) in self.entries.iter().enumerate() {
            let dr = entry[0] as i32 - target[0];
            let dg = entry[1] as i32 - target[1];
            let db = entry[2] as i32 - target[2];
            let distance = dr * dr + dg * dg + db * db;
            if distance < best_distance {
                best = index;
                best_distance = distance;
                if distance == 0 {
                    break;
                }
            }
        }

        best as u8
    }

    /// Index for a packed 5:5:5 colour, as used for text colours
    pub fn index_for_rgb555(&self, color: u16) -> u8 {
        let r = ((color >> 10) & 0x1F) as u8;
        let g = ((color >> 5) & 0x1F) as u8;
        let b = (color & 0x1F) as u8;
        self.closest_index(r << 3, g << 3, b << 3)
    }

    /// Mix two palette entries, `alpha` weighting `src` (0..=255)
    pub fn blend(&self, src: u8, dst: u8, alpha: u8) -> u8 {
        match alpha {
            0 => dst,
            255 => src,
            _ => {
                let a = alpha as u32;
                let s = self.entries[src as usize];
                let d = self.entries[dst as usize];
                let mix = |i: usize| {
                    let value = (s[i] as u32 * a + d[i] as u32 * (255 - a)) / 255;
                    (value << 2) as u8
                };
                self.closest_index(mix(0), mix(1), mix(2))
            }
        }
    }
}

/// Pack 8-bit RGB down to 5:5:5
pub fn rgb555(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 >> 3) << 10) | ((g as u16 >> 3) << 5) | (b as u16 >> 3)
}

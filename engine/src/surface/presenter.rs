/// Platform backend that puts the composed frame on the display.
///
/// The texture is `width * height` pixels of `0x00RRGGBB`.
pub trait Presenter {
    fn present(&mut self, texture: &[u32], width: u32, height: u32) -> anyhow::Result<()>;
}

/// Presenter that keeps nothing on screen (tests, off-screen rendering)
#[derive(Debug, Default)]
pub struct HeadlessPresenter {
    frames: u64,
}

impl HeadlessPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Presenter for HeadlessPresenter {
    fn present(&mut self, texture: &[u32], width: u32, height: u32) -> anyhow::Result<()> {
        if texture.len() != (width * height) as usize {
            anyhow::bail!(
                "Texture size mismatch: expected {}x{}, got {} pixels",
                width,
                height,
                texture.len()
            );
        }
        self.frames += 1;
        log::trace!("Headless present #{} ({}x{})", self.frames, width, height);
        Ok(())
    }
}

//! Screen/surface shim.
//!
//! Maps the engine's "blit rectangle" and "refresh rectangle" calls onto
//! an 8-bit indexed surface plus an RGB888 texture, and hands that texture
//! to a platform [`Presenter`] once per tick.

mod buffer;
mod palette;
mod presenter;
mod screen;
mod window;

pub use buffer::{PixelBuffer, blit_buffer_to_buffer, parse_hex_color};
pub use palette::{PALETTE_SIZE, Palette, rgb555};
pub use presenter::{HeadlessPresenter, Presenter};
pub use screen::Screen;
pub use window::{Window, WindowId};

pub mod render;
pub mod text;

pub use ab_glyph::FontVec;
pub use render::{CanvasGeometry, SkiaCanvas};
pub use text::{load_font, render_text_pixmap};

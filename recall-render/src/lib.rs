pub mod chart;
pub mod error;
pub mod render;
pub mod stimulus;
pub mod text;

pub use chart::{Bar, BarChart, Bracket, render_bar_chart};
pub use error::RenderError;
pub use render::{SkiaRenderer, TextStyle};
pub use stimulus::{ImageScale, load_stimulus};
pub use text::{FONT_CANDIDATES, load_font, render_line, wrap_lines};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ab_glyph::FontVec;
use recall_core::{Backdrop, Screen, Tone};
use tiny_skia::{Color, Paint, Pixmap, PixmapPaint, Rect, Transform};
use tracing::{debug, warn};

use crate::text::{advance_of, line_height, render_line, wrap_lines};
use crate::{ImageScale, RenderError, load_stimulus, stimulus};

/// Text size is given in normalized units where the window height spans 2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub height: f32,
    pub color: Color,
}

impl TextStyle {
    const WHITE: Color = Color::WHITE;

    pub fn for_tone(tone: Tone) -> Self {
        let (height, color) = match tone {
            Tone::Welcome => (0.06, Self::WHITE),
            Tone::Notice => (0.08, Self::WHITE),
            Tone::Transition => (0.08, rgb(173, 216, 230)),
            Tone::Summary => (0.04, rgb(144, 238, 144)),
            Tone::Countdown => (0.2, Self::WHITE),
            Tone::Status => (0.06, Self::WHITE),
        };
        TextStyle { height, color }
    }

    pub fn question(compact: bool) -> Self {
        TextStyle {
            height: if compact { 0.045 } else { 0.05 },
            color: Self::WHITE,
        }
    }
}

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::from_rgba8(r, g, b, 255)
}

/// Fraction of the window width text may occupy before wrapping.
const WRAP_FRACTION: f32 = 0.9;
/// Fixation cross arm length as a fraction of the window height.
const FIXATION_FRACTION: f32 = 0.15;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LineKey {
    text: String,
    px_bits: u32,
    rgba: [u8; 4],
}

pub struct SkiaRenderer {
    width: u32,
    height: u32,
    font: FontVec,
    image_scale: ImageScale,
    canvas: Pixmap,
    line_cache: HashMap<LineKey, Arc<Pixmap>>,
    stimulus: Option<(PathBuf, Pixmap)>,
}

impl SkiaRenderer {
    pub fn new(
        width: u32,
        height: u32,
        font: FontVec,
        image_scale: ImageScale,
    ) -> Result<Self, RenderError> {
        let mut canvas = Pixmap::new(width, height).ok_or(RenderError::Canvas(width, height))?;
        canvas.fill(Color::BLACK);
        Ok(SkiaRenderer {
            width,
            height,
            font,
            image_scale,
            canvas,
            line_cache: HashMap::new(),
            stimulus: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    pub fn set_image_scale(&mut self, scale: ImageScale) {
        self.image_scale = scale;
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<(), RenderError> {
        if (new_width, new_height) == (self.width, self.height) {
            return Ok(());
        }
        self.canvas =
            Pixmap::new(new_width, new_height).ok_or(RenderError::Canvas(new_width, new_height))?;
        self.canvas.fill(Color::BLACK);
        self.width = new_width;
        self.height = new_height;
        // Text sizes follow the window height.
        self.line_cache.clear();
        Ok(())
    }

    /// Decodes a stimulus ahead of time so that presenting it only blits.
    pub fn preload(&mut self, path: &Path) -> Result<(), RenderError> {
        if self.stimulus.as_ref().is_some_and(|(p, _)| p == path) {
            return Ok(());
        }
        let pixmap = load_stimulus(path)?;
        debug!(path = %path.display(), w = pixmap.width(), h = pixmap.height(), "stimulus decoded");
        self.stimulus = Some((path.to_path_buf(), pixmap));
        Ok(())
    }

    pub fn draw(&mut self, screen: &Screen) -> Result<(), RenderError> {
        self.canvas.fill(backdrop_color(screen.backdrop()));
        match *screen {
            Screen::Blank(_) => {}
            Screen::Fixation => self.draw_fixation(),
            Screen::Stimulus(path) => {
                self.preload(path)?;
                if let Some((_, image)) = &self.stimulus {
                    stimulus::draw_scaled(&mut self.canvas, image, self.image_scale);
                }
            }
            Screen::Message { text, tone } => self.draw_text_block(text, TextStyle::for_tone(tone)),
            Screen::Question { text, compact } => {
                self.draw_text_block(text, TextStyle::question(compact))
            }
        }
        Ok(())
    }

    /// Copies the canvas into an RGBA8 frame of the same size.
    pub fn copy_to_frame(&self, frame: &mut [u8]) {
        let data = self.canvas.data();
        if frame.len() != data.len() {
            warn!(
                frame = frame.len(),
                canvas = data.len(),
                "frame size does not match canvas"
            );
            return;
        }
        // The canvas is opaque, so premultiplied and straight alpha agree.
        frame.copy_from_slice(data);
    }

    fn draw_fixation(&mut self) {
        let arm = self.height as f32 * FIXATION_FRACTION;
        let thickness = (arm / 10.0).max(2.0);
        let cx = self.width as f32 * 0.5;
        let cy = self.height as f32 * 0.5;

        let mut paint = Paint::default();
        paint.anti_alias = false;
        paint.set_color(Color::BLACK);

        let bars = [
            Rect::from_xywh(cx - arm * 0.5, cy - thickness * 0.5, arm, thickness),
            Rect::from_xywh(cx - thickness * 0.5, cy - arm * 0.5, thickness, arm),
        ];
        for bar in bars.into_iter().flatten() {
            self.canvas.fill_rect(bar, &paint, Transform::identity(), None);
        }
    }

    fn draw_text_block(&mut self, text: &str, style: TextStyle) {
        let px = style.height * self.height as f32 * 0.5;
        let max_width = self.width as f32 * WRAP_FRACTION;
        let font = &self.font;
        let lines = wrap_lines(text, max_width, |ch| advance_of(font, px, ch));
        let step = line_height(font, px);

        let block_height = step * lines.len() as f32;
        let mut y = (self.height as f32 - block_height) * 0.5;
        for line in &lines {
            if !line.is_empty() {
                if let Some(cached) = self.line_pixmap(line, px, style.color) {
                    let pm: &Pixmap = &cached;
                    let x = (self.width as f32 - pm.width() as f32) * 0.5;
                    self.canvas.draw_pixmap(
                        x.round() as i32,
                        y.round() as i32,
                        pm.as_ref(),
                        &PixmapPaint::default(),
                        Transform::identity(),
                        None,
                    );
                }
            }
            y += step;
        }
    }

    fn line_pixmap(&mut self, line: &str, px: f32, color: Color) -> Option<Arc<Pixmap>> {
        let c = color.to_color_u8();
        let key = LineKey {
            text: line.to_string(),
            px_bits: px.to_bits(),
            rgba: [c.red(), c.green(), c.blue(), c.alpha()],
        };
        if let Some(pm) = self.line_cache.get(&key) {
            return Some(Arc::clone(pm));
        }
        let pm = Arc::new(render_line(&self.font, line, px, color)?);
        self.line_cache.insert(key, Arc::clone(&pm));
        Some(pm)
    }
}

fn backdrop_color(backdrop: Backdrop) -> Color {
    match backdrop {
        Backdrop::Black => Color::BLACK,
        Backdrop::Grey => rgb(128, 128, 128),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_styles() {
        let transition = TextStyle::for_tone(Tone::Transition);
        assert_eq!(transition.height, 0.08);
        assert_eq!(transition.color, rgb(173, 216, 230));
        assert_eq!(TextStyle::for_tone(Tone::Countdown).height, 0.2);
        assert_eq!(TextStyle::for_tone(Tone::Summary).color, rgb(144, 238, 144));
    }

    #[test]
    fn compact_questions_are_smaller() {
        assert!(TextStyle::question(true).height < TextStyle::question(false).height);
    }

    #[test]
    fn fixation_backdrop_is_grey() {
        assert_eq!(backdrop_color(Screen::Fixation.backdrop()), rgb(128, 128, 128));
        assert_eq!(
            backdrop_color(Screen::Blank(Backdrop::Black).backdrop()),
            Color::BLACK
        );
    }
}

use std::path::Path;

use recall_core::DisplayMode;
use tiny_skia::{FilterQuality, IntSize, Pixmap, PixmapPaint, Transform};

use crate::RenderError;

/// Widest window a stimulus fills completely in [`DisplayMode::Max24Inch`].
pub const REFERENCE_WIDTH: u32 = 2560;

/// Fraction of the window, per axis, that a stimulus covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageScale(f32);

impl ImageScale {
    pub const FULL: ImageScale = ImageScale(1.0);

    pub fn new(fraction: f32) -> Self {
        ImageScale(fraction.clamp(0.0, 1.0))
    }

    pub fn for_mode(mode: DisplayMode, window_width: u32) -> Self {
        match mode {
            DisplayMode::Fullscreen | DisplayMode::Auto => Self::FULL,
            DisplayMode::Max24Inch if window_width <= REFERENCE_WIDTH => Self::FULL,
            DisplayMode::Max24Inch => Self::new(REFERENCE_WIDTH as f32 / window_width as f32),
        }
    }

    pub fn fraction(self) -> f32 {
        self.0
    }
}

/// Decodes an image file into a premultiplied pixmap.
pub fn load_stimulus(path: &Path) -> Result<Pixmap, RenderError> {
    let img = image::open(path)
        .map_err(|source| RenderError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let (w, h) = img.dimensions();
    let mut data = img.into_raw();
    premultiply(&mut data);
    IntSize::from_wh(w, h)
        .and_then(|size| Pixmap::from_vec(data, size))
        .ok_or(RenderError::Canvas(w, h))
}

fn premultiply(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
}

/// Draws `image` centered on `canvas`, stretched to `scale` of the canvas.
pub fn draw_scaled(canvas: &mut Pixmap, image: &Pixmap, scale: ImageScale) {
    let target_w = canvas.width() as f32 * scale.fraction();
    let target_h = canvas.height() as f32 * scale.fraction();
    if target_w < 1.0 || target_h < 1.0 {
        return;
    }
    let sx = target_w / image.width() as f32;
    let sy = target_h / image.height() as f32;
    let tx = (canvas.width() as f32 - target_w) * 0.5;
    let ty = (canvas.height() as f32 - target_h) * 0.5;

    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    canvas.draw_pixmap(
        0,
        0,
        image.as_ref(),
        &paint,
        Transform::from_row(sx, 0.0, 0.0, sy, tx, ty),
        None,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Color;

    #[test]
    fn windows_up_to_reference_width_are_filled() {
        assert_eq!(
            ImageScale::for_mode(DisplayMode::Max24Inch, 1920),
            ImageScale::FULL
        );
        assert_eq!(
            ImageScale::for_mode(DisplayMode::Max24Inch, 2560),
            ImageScale::FULL
        );
    }

    #[test]
    fn wide_windows_are_capped() {
        let scale = ImageScale::for_mode(DisplayMode::Max24Inch, 3840);
        assert!((scale.fraction() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn fullscreen_always_fills() {
        assert_eq!(
            ImageScale::for_mode(DisplayMode::Fullscreen, 5120),
            ImageScale::FULL
        );
        assert_eq!(ImageScale::for_mode(DisplayMode::Auto, 5120), ImageScale::FULL);
    }

    #[test]
    fn premultiply_scales_color_by_alpha() {
        let mut px = [200, 100, 50, 128, 10, 20, 30, 255];
        premultiply(&mut px);
        assert_eq!(px, [100, 50, 25, 128, 10, 20, 30, 255]);
    }

    #[test]
    fn scaled_image_stays_centered() {
        let mut canvas = Pixmap::new(100, 100).unwrap();
        canvas.fill(Color::BLACK);
        let mut image = Pixmap::new(10, 10).unwrap();
        image.fill(Color::WHITE);

        draw_scaled(&mut canvas, &image, ImageScale::new(0.5));

        let at = |x: u32, y: u32| canvas.pixel(x, y).unwrap();
        assert_eq!(at(50, 50).red(), 255);
        assert_eq!(at(30, 30).red(), 255);
        assert_eq!(at(10, 10).red(), 0);
        assert_eq!(at(90, 90).red(), 0);
    }

    #[test]
    fn unreadable_image_is_an_error() {
        let dir = std::env::temp_dir().join("recall-render-missing.png");
        let err = load_stimulus(&dir).unwrap_err();
        assert!(matches!(err, RenderError::ImageLoad { .. }));
    }
}

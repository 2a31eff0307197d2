use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use tiny_skia::{Color, Pixmap, PremultipliedColorU8};

use crate::RenderError;

/// Fonts tried in order when no font path is configured. The prompts are
/// Japanese, so CJK faces come first.
pub const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/System/Library/Fonts/ヒラギノ角ゴシック W3.ttc",
    "/System/Library/Fonts/Hiragino Sans GB.ttc",
    "C:\\Windows\\Fonts\\msgothic.ttc",
    "C:\\Windows\\Fonts\\YuGothM.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];

/// Loads `explicit` if given, otherwise the first candidate that exists.
pub fn load_font(explicit: Option<&Path>) -> Result<FontVec, RenderError> {
    if let Some(path) = explicit {
        return read_font(path);
    }
    for candidate in FONT_CANDIDATES {
        let path = Path::new(candidate);
        if path.is_file() {
            return read_font(path);
        }
    }
    Err(RenderError::NoFont(FONT_CANDIDATES.join(", ")))
}

fn read_font(path: &Path) -> Result<FontVec, RenderError> {
    let data = std::fs::read(path).map_err(|source| RenderError::FontRead {
        path: path.to_path_buf(),
        source,
    })?;
    // Index 0 covers both single fonts and the first face of a collection.
    FontVec::try_from_vec_and_index(data, 0).map_err(|_| RenderError::FontParse(PathBuf::from(path)))
}

/// Greedy line breaking. Explicit newlines always break; otherwise a line
/// breaks at its last space when one exists, or mid-run for scripts such as
/// Japanese that do not separate words.
pub fn wrap_lines(text: &str, max_width: f32, mut advance: impl FnMut(char) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut width = 0.0f32;
        // Byte offset in `line` just past the last space, and the width up to it.
        let mut last_space: Option<(usize, f32)> = None;

        for ch in paragraph.chars() {
            let w = advance(ch);
            if width + w > max_width && !line.is_empty() {
                match last_space {
                    Some((cut, cut_width)) if cut < line.len() => {
                        let rest = line.split_off(cut);
                        lines.push(line.trim_end().to_string());
                        line = rest;
                        width -= cut_width;
                    }
                    _ => {
                        lines.push(line.trim_end().to_string());
                        line = String::new();
                        width = 0.0;
                    }
                }
                last_space = None;
                if ch == ' ' && line.is_empty() {
                    continue;
                }
            }
            line.push(ch);
            width += w;
            if ch == ' ' {
                last_space = Some((line.len(), width));
            }
        }
        lines.push(line);
    }
    lines
}

/// Horizontal advance of `ch` at `px`.
pub fn advance_of<F: Font>(font: &F, px: f32, ch: char) -> f32 {
    let sf = font.as_scaled(PxScale::from(px));
    sf.h_advance(font.glyph_id(ch))
}

/// Height of one text line at `px`, including the font's line gap.
pub fn line_height<F: Font>(font: &F, px: f32) -> f32 {
    let sf = font.as_scaled(PxScale::from(px));
    sf.height() + sf.line_gap()
}

/// Rasterizes one line into a transparent premultiplied pixmap. The pixmap
/// spans the line's advance width and the font's ascent to descent, so lines
/// of the same size stack evenly whatever glyphs they contain.
pub fn render_line<F: Font>(font: &F, text: &str, px: f32, color: Color) -> Option<Pixmap> {
    let scale = PxScale::from(px);
    let sf = font.as_scaled(scale);

    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let w = pen_x.ceil().max(1.0) as u32;
    let h = (sf.ascent() - sf.descent()).ceil().max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;

    let stride = w as usize;
    let dst = pm.pixels_mut();
    let cu = color.to_color_u8();

    for g in glyphs {
        let Some(out) = font.outline_glyph(g) else {
            continue;
        };
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x).floor() as i32;
            let iy = (y as f32 + b.min.y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            let a_lin = (cov * cu.alpha() as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a_lin * 255.0) as u8;
            let sr = ((cu.red() as f32 * a_lin) as u8).min(sa);
            let sg = ((cu.green() as f32 * a_lin) as u8).min(sa);
            let sb = ((cu.blue() as f32 * a_lin) as u8).min(sa);

            // Source over in premultiplied space.
            let bg = dst[i];
            let inv = 1.0 - (sa as f32 / 255.0);
            let a = sa.saturating_add((bg.alpha() as f32 * inv) as u8);
            let r = sr.saturating_add((bg.red() as f32 * inv) as u8).min(a);
            let g = sg.saturating_add((bg.green() as f32 * inv) as u8).min(a);
            let b = sb.saturating_add((bg.blue() as f32 * inv) as u8).min(a);
            if let Some(px) = PremultipliedColorU8::from_rgba(r, g, b, a) {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(_: char) -> f32 {
        1.0
    }

    #[test]
    fn short_text_is_one_line() {
        assert_eq!(wrap_lines("hello", 10.0, fixed), vec!["hello"]);
    }

    #[test]
    fn explicit_newlines_are_kept() {
        assert_eq!(wrap_lines("a\n\nb", 10.0, fixed), vec!["a", "", "b"]);
    }

    #[test]
    fn breaks_at_last_space() {
        assert_eq!(
            wrap_lines("one two three", 8.0, fixed),
            vec!["one two", "three"]
        );
    }

    #[test]
    fn breaks_mid_run_without_spaces() {
        assert_eq!(
            wrap_lines("画像に何が映っていましたか", 5.0, fixed),
            vec!["画像に何が", "映っていま", "したか"]
        );
    }

    #[test]
    fn wide_single_glyph_still_gets_a_line() {
        assert_eq!(wrap_lines("ab", 0.5, fixed), vec!["a", "b"]);
    }

    #[test]
    fn every_line_fits() {
        let text = "the quick brown fox jumps over the lazy dog";
        for line in wrap_lines(text, 12.0, fixed) {
            assert!(line.chars().count() <= 12, "{line:?}");
        }
    }

    #[test]
    fn missing_explicit_font_is_reported() {
        let err = load_font(Some(Path::new("/nonexistent/font.ttf"))).unwrap_err();
        assert!(matches!(err, RenderError::FontRead { .. }));
    }
}

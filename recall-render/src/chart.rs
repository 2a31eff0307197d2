use std::path::Path;

use ab_glyph::Font;
use tiny_skia::{Color, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform};

use crate::RenderError;
use crate::text::render_line;

pub struct Bar {
    pub label: String,
    pub mean: f64,
    pub sd: f64,
    pub color: Color,
}

/// Significance marker drawn over two bars.
pub struct Bracket {
    pub from: usize,
    pub to: usize,
    pub symbol: String,
}

pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<Bar>,
    pub bracket: Option<Bracket>,
    /// Boxed annotation in the top-left corner of the plot.
    pub note: Option<String>,
}

impl BarChart {
    /// Tallest whisker over all bars.
    fn whisker_top(&self) -> f64 {
        self.bars
            .iter()
            .map(|b| b.mean + b.sd.max(0.0))
            .fold(0.0f64, f64::max)
    }

    /// Top of the value axis: the tallest whisker plus headroom, and more
    /// when a bracket has to fit above it.
    pub fn y_max(&self) -> f64 {
        let headroom = if self.bracket.is_some() { 15.0 } else { 10.0 };
        (self.whisker_top() + headroom).max(10.0)
    }

    pub fn save_png<F: Font>(
        &self,
        font: &F,
        width: u32,
        height: u32,
        path: &Path,
    ) -> Result<(), RenderError> {
        let pixmap = render_bar_chart(self, font, width, height)?;
        pixmap.save_png(path).map_err(|e| RenderError::Png {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

const MARGIN_LEFT: f32 = 90.0;
const MARGIN_RIGHT: f32 = 30.0;
const MARGIN_TOP: f32 = 60.0;
const MARGIN_BOTTOM: f32 = 90.0;
const GRID_STEP: f64 = 10.0;

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
}

struct Plot {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
    y_max: f64,
}

impl Plot {
    fn y(&self, value: f64) -> f32 {
        let frac = (value / self.y_max).clamp(0.0, 1.0) as f32;
        self.top + self.height * (1.0 - frac)
    }

    fn slot_center(&self, index: usize, count: usize) -> f32 {
        let slot = self.width / count.max(1) as f32;
        self.left + slot * (index as f32 + 0.5)
    }

    fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

pub fn render_bar_chart<F: Font>(
    chart: &BarChart,
    font: &F,
    width: u32,
    height: u32,
) -> Result<Pixmap, RenderError> {
    let mut pm = Pixmap::new(width, height).ok_or(RenderError::Canvas(width, height))?;
    pm.fill(Color::WHITE);

    let plot = Plot {
        left: MARGIN_LEFT,
        top: MARGIN_TOP,
        width: (width as f32 - MARGIN_LEFT - MARGIN_RIGHT).max(1.0),
        height: (height as f32 - MARGIN_TOP - MARGIN_BOTTOM).max(1.0),
        y_max: chart.y_max(),
    };
    let black = Color::BLACK;
    let grid = Color::from_rgba8(0, 0, 0, 40);

    // Grid and value ticks.
    let mut tick = 0.0;
    while tick <= plot.y_max {
        let y = plot.y(tick);
        line(&mut pm, (plot.left, y), (plot.left + plot.width, y), grid, 1.0);
        let label = format!("{tick:.0}");
        let (lw, _) = text_size(font, &label, 14.0);
        draw_text(&mut pm, font, &label, 14.0, black, plot.left - 8.0 - lw, y - 8.0, Align::Left);
        tick += GRID_STEP;
    }

    // Axes.
    line(&mut pm, (plot.left, plot.top), (plot.left, plot.bottom()), black, 1.0);
    line(
        &mut pm,
        (plot.left, plot.bottom()),
        (plot.left + plot.width, plot.bottom()),
        black,
        1.0,
    );

    let count = chart.bars.len();
    let bar_width = plot.width / count.max(1) as f32 * 0.6;
    for (i, bar) in chart.bars.iter().enumerate() {
        let cx = plot.slot_center(i, count);
        let top = plot.y(bar.mean);
        let fill = Rect::from_xywh(cx - bar_width * 0.5, top, bar_width, plot.bottom() - top);
        if let Some(rect) = fill {
            let mut paint = Paint::default();
            paint.set_color(bar.color);
            pm.fill_rect(rect, &paint, Transform::identity(), None);
        }

        // Error bar with caps.
        if bar.sd > 0.0 {
            let lo = plot.y(bar.mean - bar.sd);
            let hi = plot.y(bar.mean + bar.sd);
            line(&mut pm, (cx, lo), (cx, hi), black, 1.5);
            line(&mut pm, (cx - 6.0, lo), (cx + 6.0, lo), black, 1.5);
            line(&mut pm, (cx - 6.0, hi), (cx + 6.0, hi), black, 1.5);
        }

        let value = format!("{:.1}%", bar.mean);
        let above = plot.y(bar.mean + bar.sd.max(0.0) + 2.0);
        draw_text(&mut pm, font, &value, 15.0, black, cx, above - 20.0, Align::Center);
        draw_text(
            &mut pm,
            font,
            &bar.label,
            15.0,
            black,
            cx,
            plot.bottom() + 8.0,
            Align::Center,
        );
    }

    if let Some(bracket) = &chart.bracket {
        if bracket.from < count && bracket.to < count {
            let base = chart.whisker_top() + 5.0;
            let y = plot.y(base);
            let drop = plot.y(base - 2.0);
            let x0 = plot.slot_center(bracket.from, count);
            let x1 = plot.slot_center(bracket.to, count);
            line(&mut pm, (x0, y), (x1, y), black, 1.0);
            line(&mut pm, (x0, y), (x0, drop), black, 1.0);
            line(&mut pm, (x1, y), (x1, drop), black, 1.0);
            draw_text(
                &mut pm,
                font,
                &bracket.symbol,
                20.0,
                black,
                (x0 + x1) * 0.5,
                y - 26.0,
                Align::Center,
            );
        }
    }

    if let Some(note) = &chart.note {
        let (nw, nh) = text_size(font, note, 14.0);
        let boxed = Rect::from_xywh(plot.left + 10.0, plot.top + 10.0, nw + 16.0, nh + 10.0);
        if let Some(rect) = boxed {
            let mut paint = Paint::default();
            paint.set_color(Color::from_rgba8(173, 216, 230, 204));
            pm.fill_rect(rect, &paint, Transform::identity(), None);
        }
        draw_text(&mut pm, font, note, 14.0, black, plot.left + 18.0, plot.top + 15.0, Align::Left);
    }

    let (_, title_h) = text_size(font, &chart.title, 20.0);
    draw_text(
        &mut pm,
        font,
        &chart.title,
        20.0,
        black,
        width as f32 * 0.5,
        (MARGIN_TOP - title_h) * 0.5,
        Align::Center,
    );
    draw_text(
        &mut pm,
        font,
        &chart.x_label,
        16.0,
        black,
        plot.left + plot.width * 0.5,
        height as f32 - 32.0,
        Align::Center,
    );
    draw_vertical_text(&mut pm, font, &chart.y_label, 16.0, black, 10.0, plot.top + plot.height * 0.5);

    Ok(pm)
}

fn line(pm: &mut Pixmap, from: (f32, f32), to: (f32, f32), color: Color, width: f32) {
    let mut pb = PathBuilder::new();
    pb.move_to(from.0, from.1);
    pb.line_to(to.0, to.1);
    let Some(path) = pb.finish() else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color(color);
    let stroke = Stroke {
        width,
        ..Stroke::default()
    };
    pm.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

fn text_size<F: Font>(font: &F, text: &str, px: f32) -> (f32, f32) {
    render_line(font, text, px, Color::BLACK)
        .map_or((0.0, 0.0), |pm| (pm.width() as f32, pm.height() as f32))
}

#[allow(clippy::too_many_arguments)]
fn draw_text<F: Font>(
    pm: &mut Pixmap,
    font: &F,
    text: &str,
    px: f32,
    color: Color,
    x: f32,
    y: f32,
    align: Align,
) {
    let Some(line) = render_line(font, text, px, color) else {
        return;
    };
    let x = match align {
        Align::Left => x,
        Align::Center => x - line.width() as f32 * 0.5,
    };
    pm.draw_pixmap(
        x.round() as i32,
        y.round() as i32,
        line.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
}

/// Draws text rotated a quarter turn counter-clockwise, centered on `cy`.
fn draw_vertical_text<F: Font>(
    pm: &mut Pixmap,
    font: &F,
    text: &str,
    px: f32,
    color: Color,
    x: f32,
    cy: f32,
) {
    let Some(line) = render_line(font, text, px, color) else {
        return;
    };
    let transform = Transform::from_rotate(-90.0)
        .post_translate(x, cy + line.width() as f32 * 0.5);
    pm.draw_pixmap(
        0,
        0,
        line.as_ref(),
        &PixmapPaint::default(),
        transform,
        None,
    );
}

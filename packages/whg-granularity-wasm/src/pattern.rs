//! Mottled fill patterns for granular (uncertain) areas.
//!
//! A random set of soft-edged circles is laid out once per pass and rendered
//! in every requested colour, so all colour variants share the same texture.
//! Circles are drawn on a canvas twice the tile size, each one repeated at
//! the four tile offsets so shapes clipped at one edge reappear at the
//! opposite edge, and the tile is then cropped out of the doubled canvas.

use rand::Rng;
use tiny_skia::{
    Color, FillRule, GradientStop, IntRect, Paint, PathBuilder, Pixmap, Point, RadialGradient,
    SpreadMode, Transform,
};

use crate::colour::{parse_colour, Rgba};
use crate::config::GranularityConfig;
use crate::error::{GranularityError, Result};
use crate::console_warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Circle positions within a `tile_size` square, shared by all colours.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleLayout {
    pub tile_size: u32,
    pub circles: Vec<Circle>,
}

impl CircleLayout {
    pub fn generate<R: Rng + ?Sized>(tile_size: u32, config: &GranularityConfig, rng: &mut R) -> Self {
        let size = tile_size as f64;
        let max_radius = size / config.max_radius_divisor;
        let circle_area = std::f64::consts::PI * max_radius * max_radius;
        let count = if circle_area > 0.0 {
            (config.pattern_coverage * size * size / circle_area).floor() as usize
        } else {
            0
        };

        let circles = (0..count)
            .map(|_| Circle {
                x: rng.gen_range(0.0..size) as f32,
                y: rng.gen_range(0.0..size) as f32,
                radius: (rng.gen_range(0.5..=1.0) * max_radius) as f32,
            })
            .collect();

        Self { tile_size, circles }
    }
}

/// Finished tile as straight (non-premultiplied) RGBA8, row-major, ready
/// for `ImageData`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternBitmap {
    pub size: u32,
    pub rgba: Vec<u8>,
}

/// Render one tile per colour, in input order, all from a single layout.
pub fn generate_patterns<R: Rng + ?Sized>(
    colours: &[String],
    tile_size: u32,
    config: &GranularityConfig,
    rng: &mut R,
) -> Result<Vec<PatternBitmap>> {
    if tile_size == 0 {
        return Err(GranularityError::InvalidPatternSize(tile_size));
    }

    if colours.is_empty() {
        return Ok(Vec::new());
    }

    let layout = CircleLayout::generate(tile_size, config, rng);
    colours
        .iter()
        .map(|colour| match parse_colour(colour) {
            Ok(rgba) => render_tile(&layout, Some(rgba)),
            Err(e) => {
                // An unparseable colour paints nothing, like an invalid canvas fillStyle
                console_warn!("{}; rendering an empty pattern", e);
                render_tile(&layout, None)
            }
        })
        .collect()
}

/// Draw the layout in `colour` and crop the tile out of the doubled canvas.
pub fn render_tile(layout: &CircleLayout, colour: Option<Rgba>) -> Result<PatternBitmap> {
    let size = layout.tile_size;
    let canvas_size = size
        .checked_mul(2)
        .ok_or(GranularityError::InvalidPatternSize(size))?;
    let mut pixmap = Pixmap::new(canvas_size, canvas_size).ok_or_else(|| {
        GranularityError::Surface(format!("cannot allocate {0}x{0} canvas", canvas_size))
    })?;
    pixmap.fill(Color::TRANSPARENT);

    if let Some(rgba) = colour {
        let centre = Color::from_rgba8(rgba.r, rgba.g, rgba.b, rgba.alpha_u8());
        let edge = Color::from_rgba8(rgba.r, rgba.g, rgba.b, 0);
        let offset = size as f32;
        let offsets = [(0.0, 0.0), (offset, 0.0), (0.0, offset), (offset, offset)];

        for circle in &layout.circles {
            for (dx, dy) in offsets {
                draw_soft_circle(&mut pixmap, circle.x + dx, circle.y + dy, circle.radius, centre, edge);
            }
        }
    }

    let crop = (size / 4) as i32;
    let rect = IntRect::from_xywh(crop, crop, size, size)
        .ok_or_else(|| GranularityError::Surface("invalid crop rectangle".to_string()))?;
    let tile = pixmap
        .clone_rect(rect)
        .ok_or_else(|| GranularityError::Surface("crop outside canvas".to_string()))?;

    let rgba = tile
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    Ok(PatternBitmap { size, rgba })
}

fn draw_soft_circle(pixmap: &mut Pixmap, x: f32, y: f32, radius: f32, centre: Color, edge: Color) {
    let centre_point = Point::from_xy(x, y);
    let shader = match RadialGradient::new(
        centre_point,
        centre_point,
        radius,
        vec![GradientStop::new(0.0, centre), GradientStop::new(1.0, edge)],
        SpreadMode::Pad,
        Transform::identity(),
    ) {
        Some(s) => s,
        None => return,
    };
    let path = match PathBuilder::from_circle(x, y, radius) {
        Some(p) => p,
        None => return,
    };

    let mut paint = Paint::default();
    paint.shader = shader;
    paint.anti_alias = true;
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
}

//! Gradient and image shaders
//!
//! Each shader carries a `pts_to_unit` matrix mapping its own space into the
//! unit space sampled by the GPU: `[0, 1]` along the gradient axis for linear
//! gradients, the unit circle for radial ones, and a centred frame for sweeps.
//! The renderer composes it with the inverse canvas transform per draw.

use std::f32::consts::PI;
use std::rc::Rc;

use verso_core::{Color, Matrix, Point};

use crate::error::{PaintError, Result};
use crate::image::Image;

/// Behavior outside the `[0, 1]` gradient range
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TileMode {
    #[default]
    Clamp,
    Mirror,
    Repeated,
}

/// Gradient geometry
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GradientKind {
    Linear {
        start: Point,
        end: Point,
    },
    Radial {
        center: Point,
        radius: f32,
    },
    Sweep {
        center: Point,
        start_angle: f32,
        end_angle: f32,
    },
}

/// A color gradient with validated stops
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    kind: GradientKind,
    colors: Vec<Color>,
    stops: Vec<f32>,
    tile_mode: TileMode,
    matrix: Option<Matrix>,
    pts_to_unit: Matrix,
}

impl Gradient {
    /// Gradient from `start` to `end`
    ///
    /// With `stops == None` the colors are spread evenly.
    pub fn linear(
        start: Point,
        end: Point,
        colors: Vec<Color>,
        stops: Option<Vec<f32>>,
        tile_mode: TileMode,
        matrix: Option<Matrix>,
    ) -> Result<Self> {
        let (colors, stops) = validate_color_stops(colors, stops)?;

        let vec = end - start;
        let mag = vec.length();
        let inv = if mag != 0.0 { 1.0 / mag } else { 0.0 };
        let dir = vec * inv;
        let mut pts_to_unit = Matrix::sin_cos(-dir.y, dir.x, start);
        pts_to_unit.post_translate(-start.x, -start.y);
        pts_to_unit.post_scale(inv, inv);

        Ok(Self {
            kind: GradientKind::Linear { start, end },
            colors,
            stops,
            tile_mode,
            matrix,
            pts_to_unit,
        })
    }

    pub fn radial(
        center: Point,
        radius: f32,
        colors: Vec<Color>,
        stops: Option<Vec<f32>>,
        tile_mode: TileMode,
        matrix: Option<Matrix>,
    ) -> Result<Self> {
        let (colors, stops) = validate_color_stops(colors, stops)?;

        let inv = if radius != 0.0 { 1.0 / radius } else { 0.0 };
        let mut pts_to_unit = Matrix::translation(-center.x, -center.y);
        pts_to_unit.post_scale(inv, inv);

        Ok(Self {
            kind: GradientKind::Radial { center, radius },
            colors,
            stops,
            tile_mode,
            matrix,
            pts_to_unit,
        })
    }

    /// Angular gradient between `start_angle` and `end_angle` (radians)
    pub fn sweep(
        center: Point,
        colors: Vec<Color>,
        stops: Option<Vec<f32>>,
        tile_mode: TileMode,
        start_angle: f32,
        end_angle: f32,
        matrix: Option<Matrix>,
    ) -> Result<Self> {
        if !(start_angle < end_angle) {
            return Err(PaintError::InvalidColorStops(format!(
                "sweep start angle {} must be less than end angle {}",
                start_angle, end_angle
            )));
        }
        let (colors, stops) = validate_color_stops(colors, stops)?;

        Ok(Self {
            kind: GradientKind::Sweep {
                center,
                start_angle,
                end_angle,
            },
            colors,
            stops,
            tile_mode,
            matrix,
            pts_to_unit: Matrix::translation(-center.x, -center.y),
        })
    }

    pub fn kind(&self) -> &GradientKind {
        &self.kind
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn stops(&self) -> &[f32] {
        &self.stops
    }

    pub fn tile_mode(&self) -> TileMode {
        self.tile_mode
    }

    pub fn left_color(&self) -> Color {
        self.colors[0]
    }

    pub fn right_color(&self) -> Color {
        self.colors[self.colors.len() - 1]
    }

    /// Sweep `(bias, scale)` remapping the angle to `[0, 1]`
    pub fn sweep_bias_scale(&self) -> Option<(f32, f32)> {
        match self.kind {
            GradientKind::Sweep {
                start_angle,
                end_angle,
                ..
            } => {
                let t0 = start_angle / (PI * 2.0);
                let t1 = end_angle / (PI * 2.0);
                Some((-t0, 1.0 / (t1 - t0)))
            }
            _ => None,
        }
    }

    /// Map from the space described by `mat` into gradient unit space
    pub fn gradient_matrix(&self, mut mat: Matrix) -> Matrix {
        if let Some(m) = &self.matrix {
            mat.post_concat(m);
        }
        mat.post_concat(&self.pts_to_unit);
        mat
    }

    /// Colors and stops for the colorizer texture, with hard end stops trimmed
    pub fn colorizer_stops(&self) -> (&[Color], &[f32]) {
        let count = self.colors.len();
        let bottom_hard_stop = nearly_equal(self.stops[0], self.stops[1]);
        let top_hard_stop = nearly_equal(self.stops[count - 2], self.stops[count - 1]);

        let start = usize::from(bottom_hard_stop);
        let end = if top_hard_stop { count - 1 } else { count };
        if end - start < 2 {
            return (&self.colors, &self.stops);
        }
        (&self.colors[start..end], &self.stops[start..end])
    }
}

/// Image sampled as a repeating or clamped texture
#[derive(Clone, Debug, PartialEq)]
pub struct ImageShader {
    pub image: Image,
    pub tile_mode: TileMode,
    pub matrix: Option<Matrix>,
}

impl ImageShader {
    pub fn new(image: Image, tile_mode: TileMode, matrix: Option<Matrix>) -> Self {
        Self {
            image,
            tile_mode,
            matrix,
        }
    }

    /// Map from the space described by `mat` into texture UV space
    pub fn shader_matrix(&self, mut mat: Matrix) -> Matrix {
        if let Some(m) = &self.matrix {
            mat.post_concat(m);
        }
        let w = self.image.width().max(1) as f32;
        let h = self.image.height().max(1) as f32;
        mat.post_scale(1.0 / w, 1.0 / h);
        mat
    }
}

/// Shader attached to a paint
#[derive(Clone, Debug, PartialEq)]
pub enum Shader {
    Gradient(Rc<Gradient>),
    Image(Rc<ImageShader>),
}

impl From<Gradient> for Shader {
    fn from(gradient: Gradient) -> Self {
        Shader::Gradient(Rc::new(gradient))
    }
}

impl From<ImageShader> for Shader {
    fn from(shader: ImageShader) -> Self {
        Shader::Image(Rc::new(shader))
    }
}

impl Shader {
    /// Whether the shader samples from a texture that may change each frame
    pub fn is_dynamic(&self) -> bool {
        match self {
            Shader::Gradient(_) => false,
            Shader::Image(shader) => shader.image.is_dynamic(),
        }
    }
}

fn nearly_equal(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1.0 / 4096.0
}

/// Normalize stops into `[0, 1]`, padding both ends when they do not reach it
fn validate_color_stops(
    colors: Vec<Color>,
    stops: Option<Vec<f32>>,
) -> Result<(Vec<Color>, Vec<f32>)> {
    if colors.len() < 2 {
        return Err(PaintError::InvalidColorStops(format!(
            "a gradient needs at least 2 colors, got {}",
            colors.len()
        )));
    }

    let Some(stops) = stops else {
        let step_count = colors.len() - 1;
        let step = 1.0 / step_count as f32;
        let mut stops = Vec::with_capacity(colors.len());
        stops.push(0.0);
        for i in 1..step_count {
            stops.push(i as f32 * step);
        }
        stops.push(1.0);
        return Ok((colors, stops));
    };

    if colors.len() != stops.len() {
        return Err(PaintError::InvalidColorStops(format!(
            "colors and stops must have equal length ({} != {})",
            colors.len(),
            stops.len()
        )));
    }

    let dummy_first = stops[0] != 0.0;
    let dummy_last = stops[stops.len() - 1] != 1.0;
    let count = colors.len() + usize::from(dummy_first) + usize::from(dummy_last);

    let mut new_colors = Vec::with_capacity(count);
    let mut new_stops = Vec::with_capacity(count);
    if dummy_first {
        new_colors.push(colors[0]);
        new_stops.push(0.0);
    }

    let mut prev = 0.0f32;
    for (color, stop) in colors.iter().zip(stops.iter()) {
        let stop = stop.min(1.0).max(prev);
        new_colors.push(*color);
        new_stops.push(stop);
        prev = stop;
    }

    if dummy_last {
        new_colors.push(colors[colors.len() - 1]);
        new_stops.push(1.0);
    }

    debug_assert_eq!(new_colors.len(), count);
    Ok((new_colors, new_stops))
}

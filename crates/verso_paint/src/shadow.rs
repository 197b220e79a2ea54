//! Elevation shadows
//!
//! A shadow is two blurred fills of the occluder path: an ambient shadow
//! drawn in device space, and a spot shadow projected away from a point light
//! that sits above the path.

use verso_core::{Color, Matrix, Point};

use crate::canvas::Canvas;
use crate::paint::{BlurStyle, MaskFilter, Paint};
use crate::path::Path;

const AMBIENT_ALPHA: f32 = 0.039;
const SPOT_ALPHA: f32 = 0.25;
const LIGHT_HEIGHT: f32 = 600.0;
const LIGHT_RADIUS: f32 = 800.0;

const AMBIENT_HEIGHT_FACTOR: f32 = 1.0 / 128.0;
const AMBIENT_GEOM_FACTOR: f32 = 64.0;
const MAX_AMBIENT_RADIUS: f32 = 300.0 * AMBIENT_HEIGHT_FACTOR * AMBIENT_GEOM_FACTOR;
const BLUR_SIGMA_SCALE: f32 = 0.57735;

/// Point light used for the spot shadow
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowLight {
    pub position: Point,
    pub height: f32,
    pub radius: f32,
}

/// Draw the shadow of `path` raised to `elevation`
///
/// `transparent_occluder` is accepted for API parity; both shadow fills are
/// always drawn in full, so the area under the occluder is covered either way.
pub fn draw_shadow<C: Canvas + ?Sized>(
    canvas: &mut C,
    path: &Path,
    color: Color,
    elevation: f32,
    transparent_occluder: bool,
    device_pixel_ratio: f32,
) {
    if elevation <= 0.0 || color.a <= 0.0 || path.is_empty() {
        tracing::trace!("draw_shadow: nothing to draw");
        return;
    }

    let bounds = path.bounds();
    let light = ShadowLight {
        position: Point::new((bounds.left + bounds.right) * 0.5, bounds.top - LIGHT_HEIGHT),
        height: device_pixel_ratio * LIGHT_HEIGHT,
        radius: device_pixel_ratio * LIGHT_RADIUS,
    };
    let (ambient, spot) = tonal_colors(
        color.with_alpha(color.a * AMBIENT_ALPHA),
        color.with_alpha(color.a * SPOT_ALPHA),
    );
    tracing::trace!(
        elevation,
        transparent_occluder,
        "draw_shadow: ambient {:?} spot {:?}",
        ambient,
        spot
    );

    draw_shadow_with_light(canvas, path, device_pixel_ratio * elevation, light, ambient, spot);
}

/// Ambient and spot shadow for an occluder at height `occluder_z`
pub fn draw_shadow_with_light<C: Canvas + ?Sized>(
    canvas: &mut C,
    path: &Path,
    occluder_z: f32,
    light: ShadowLight,
    ambient_color: Color,
    spot_color: Color,
) {
    let view = canvas.total_matrix();

    // Ambient: blurred in device space
    let outset = ambient_blur_radius(occluder_z);
    let blur_radius = 0.5 * outset * ambient_recip_alpha(occluder_z);
    let device_path = path.transform(&view);
    canvas.save();
    canvas.set_matrix(&Matrix::IDENTITY);
    canvas.draw_path(&device_path, &blurred_fill(ambient_color, radius_to_sigma(blur_radius)));
    canvas.restore();

    // Spot: projected from the light onto the ground plane
    let (shadow_matrix, radius) = spot_shadow_transform(occluder_z, light, &view);
    canvas.save();
    canvas.set_matrix(&shadow_matrix);
    canvas.draw_path(path, &blurred_fill(spot_color, radius_to_sigma(radius)));
    canvas.restore();
}

/// Shadow colors for the given input colors: the ambient shadow is always black
pub fn tonal_colors(ambient: Color, spot: Color) -> (Color, Color) {
    (Color::BLACK.with_alpha(ambient.a), spot)
}

fn blurred_fill(color: Color, sigma: f32) -> Paint {
    let mut paint = Paint::fill(color);
    if sigma > 0.0 {
        paint.mask_filter = Some(MaskFilter::blur(BlurStyle::Normal, sigma));
    }
    paint
}

fn ambient_blur_radius(height: f32) -> f32 {
    (height * AMBIENT_HEIGHT_FACTOR * AMBIENT_GEOM_FACTOR).min(MAX_AMBIENT_RADIUS)
}

fn ambient_recip_alpha(height: f32) -> f32 {
    1.0 + (height * AMBIENT_HEIGHT_FACTOR).max(0.0)
}

pub fn radius_to_sigma(radius: f32) -> f32 {
    if radius > 0.0 {
        BLUR_SIGMA_SCALE * radius + 0.5
    } else {
        0.0
    }
}

fn divide_and_pin(numer: f32, denom: f32, min: f32, max: f32) -> f32 {
    (numer / denom).clamp(min, max)
}

/// Transform placing the spot shadow, and its blur radius
fn spot_shadow_transform(occluder_z: f32, light: ShadowLight, view: &Matrix) -> (Matrix, f32) {
    let z_ratio = divide_and_pin(occluder_z, light.height - occluder_z, 0.0, 0.95);
    let radius = light.radius * z_ratio;
    let scale = divide_and_pin(light.height, light.height - occluder_z, 1.0, 1.95);
    let mut matrix = Matrix::scale_translate(
        scale,
        scale,
        -z_ratio * light.position.x,
        -z_ratio * light.position.y,
    );
    matrix.pre_concat(view);
    (matrix, radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RecordingCanvas;
    use crate::draw_cmd::DrawCmd;
    use verso_core::Rect;

    fn card() -> Path {
        let mut path = Path::new();
        path.add_rect(Rect::from_ltwh(0.0, 0.0, 100.0, 50.0));
        path
    }

    #[test]
    fn test_shadow_records_two_blurred_fills() {
        let mut canvas = RecordingCanvas::default();
        canvas.draw_shadow(&card(), Color::BLACK, 4.0, false);

        let picture = canvas.end_recording().unwrap();
        let fills: Vec<&Paint> = picture
            .draw_cmds()
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCmd::DrawPath { paint, .. } => Some(paint),
                _ => None,
            })
            .collect();

        assert_eq!(fills.len(), 2);
        assert!((fills[0].color.a - AMBIENT_ALPHA).abs() < 1e-6);
        assert!((fills[1].color.a - SPOT_ALPHA).abs() < 1e-6);
        assert!(fills.iter().all(|p| p.blur_sigma().is_some()));
        assert_eq!(canvas.save_count(), 1);
    }

    #[test]
    fn test_zero_elevation_draws_nothing() {
        let mut canvas = RecordingCanvas::default();
        canvas.draw_shadow(&card(), Color::BLACK, 0.0, true);
        assert!(canvas.recorder().is_empty());
    }

    #[test]
    fn test_spot_transform_grows_with_height() {
        let light = ShadowLight {
            position: Point::new(50.0, -600.0),
            height: 600.0,
            radius: 800.0,
        };
        let (low, low_radius) = spot_shadow_transform(2.0, light, &Matrix::IDENTITY);
        let (high, high_radius) = spot_shadow_transform(24.0, light, &Matrix::IDENTITY);

        assert!(high.scale_x() > low.scale_x());
        assert!(high_radius > low_radius);
        assert!(low.scale_x() >= 1.0);
    }

    #[test]
    fn test_radius_to_sigma() {
        assert_eq!(radius_to_sigma(0.0), 0.0);
        assert!((radius_to_sigma(10.0) - 6.2735).abs() < 1e-4);
    }
}

use nalgebra::{Point2, Rotation2, Vector2};

/// Shortest periodic representation of a separation along one axis.
///
/// A separation whose magnitude exceeds half the cell extent is shifted by one
/// cell length towards zero. Separations produced from two in-cell coordinates
/// never need more than one shift.
#[inline]
pub fn minimum_image_component(delta: f64, extent: f64) -> f64 {
    let half = 0.5 * extent;
    if delta > half {
        delta - extent
    } else if delta < -half {
        delta + extent
    } else {
        delta
    }
}

/// Applies [`minimum_image_component`] on both axes when `periodic` is set.
#[inline]
pub fn minimum_image(delta: Vector2<f64>, width: f64, height: f64, periodic: bool) -> Vector2<f64> {
    if periodic {
        Vector2::new(
            minimum_image_component(delta.x, width),
            minimum_image_component(delta.y, height),
        )
    } else {
        delta
    }
}

/// Wraps a coordinate into `[0, extent)`.
#[inline]
pub fn wrap_component(value: f64, extent: f64) -> f64 {
    let wrapped = value.rem_euclid(extent);
    // rem_euclid rounds tiny negative values up to `extent` itself.
    if wrapped >= extent { 0.0 } else { wrapped }
}

pub fn wrap_point(point: Point2<f64>, width: f64, height: f64) -> Point2<f64> {
    Point2::new(wrap_component(point.x, width), wrap_component(point.y, height))
}

pub fn is_inside_cell(point: &Point2<f64>, width: f64, height: f64) -> bool {
    (0.0..width).contains(&point.x) && (0.0..height).contains(&point.y)
}

/// Rotates a body-frame offset into the cell frame.
#[inline]
pub fn rotate_offset(offset: &Vector2<f64>, angle: f64) -> Vector2<f64> {
    Rotation2::new(angle) * offset
}

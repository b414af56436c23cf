use nalgebra::Vector2;
use rand::Rng;
use std::f64::consts::TAU;

/// Metropolis criterion.
///
/// Downhill and neutral moves are always accepted. Uphill moves are accepted
/// when `u < exp(-beta * delta_e)`, where `u` is a uniform draw from `[0, 1)`.
#[inline]
pub fn metropolis_accept(delta_e: f64, beta: f64, u: f64) -> bool {
    delta_e <= 0.0 || u < (-beta * delta_e).exp()
}

/// Displacement distributed uniformly over a disc of radius `amplitude`.
///
/// Consumes two draws: the radius fraction, then the direction.
#[inline]
pub fn disc_displacement(amplitude: f64, rng: &mut impl Rng) -> Vector2<f64> {
    let radius = amplitude * rng.r#gen::<f64>().sqrt();
    let angle = TAU * rng.r#gen::<f64>();
    Vector2::new(radius * angle.cos(), radius * angle.sin())
}

/// Rotation drawn uniformly from `[-max_angle/2, max_angle/2)`.
#[inline]
pub fn rotation_increment(max_angle: f64, rng: &mut impl Rng) -> f64 {
    (rng.r#gen::<f64>() - 0.5) * max_angle
}

#[inline]
pub fn square_well(dist: f64, contact: f64, cutoff: f64, well_depth: f64, big_energy: f64) -> f64 {
    if dist >= cutoff {
        return 0.0;
    }
    if dist < contact {
        return big_energy;
    }
    well_depth
}

#[inline]
pub fn exponential_well(
    dist: f64,
    contact: f64,
    cutoff: f64,
    well_depth: f64,
    length: f64,
    big_energy: f64,
) -> f64 {
    if dist >= cutoff {
        return 0.0;
    }
    if dist < contact {
        return big_energy;
    }
    well_depth * (-(dist - contact) / length).exp()
}

/// Hard wall: an atom may touch a wall but not cross it.
#[inline]
pub fn hard_wall(wall_distances: [f64; 4], radius: f64, big_energy: f64) -> f64 {
    if wall_distances.iter().any(|&d| d < radius) {
        big_energy
    } else {
        0.0
    }
}

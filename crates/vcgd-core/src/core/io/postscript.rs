use crate::core::forcefield::params::ForceField;
use crate::core::models::configuration::Configuration;
use crate::core::utils::geometry::rotate_offset;
use std::io::{self, Write};
use tracing::debug;

/// Writes the configuration as an Encapsulated Postscript drawing.
///
/// The bounding box is the cell in its own units. Every atom is drawn as a
/// filled circle with its force-field radius and color. In a periodic cell an
/// atom that overlaps an edge is drawn again on the opposite side (and in the
/// opposite corner when it overlaps two edges), so that the picture tiles.
///
/// Objects whose type has no topology are skipped; nothing is drawn for them.
pub fn write_eps(
    configuration: &Configuration,
    forcefield: &ForceField,
    writer: &mut impl Write,
) -> io::Result<()> {
    let width = configuration.width();
    let height = configuration.height();

    writeln!(writer, "%!PS-Adobe-3.0 EPSF-3.0")?;
    writeln!(
        writer,
        "%%BoundingBox: 0 0 {} {}",
        width.ceil() as i64,
        height.ceil() as i64
    )?;
    writeln!(writer, "%%HiResBoundingBox: 0 0 {:.6} {:.6}", width, height)?;
    writeln!(writer, "%%Creator: vcgd")?;
    writeln!(writer, "%%EndComments")?;
    writeln!(writer, "/fcircle {{ setrgbcolor 0 360 arc fill }} bind def")?;
    writeln!(writer, "gsave")?;
    writeln!(
        writer,
        "newpath 0 0 moveto {w:.6} 0 lineto {w:.6} {h:.6} lineto 0 {h:.6} lineto closepath clip",
        w = width,
        h = height
    )?;

    let Some(topology) = configuration.topology() else {
        debug!("No topology attached; writing an empty drawing.");
        return finish(writer);
    };

    let mut circles = 0usize;
    for object in configuration.objects() {
        for atom in topology.atoms(object.object_type) {
            let radius = forcefield.atom_radius(atom.atom_type);
            let color = forcefield.atom_color(atom.atom_type);
            let centre = object.position + rotate_offset(&atom.offset, object.orientation);

            let mut images = vec![(centre.x, centre.y)];
            if configuration.is_periodic() {
                let shift_x = edge_shift(centre.x, radius, width);
                let shift_y = edge_shift(centre.y, radius, height);
                if shift_x != 0.0 {
                    images.push((centre.x + shift_x, centre.y));
                }
                if shift_y != 0.0 {
                    images.push((centre.x, centre.y + shift_y));
                }
                if shift_x != 0.0 && shift_y != 0.0 {
                    images.push((centre.x + shift_x, centre.y + shift_y));
                }
            }

            for (x, y) in images {
                writeln!(
                    writer,
                    "newpath {:.6} {:.6} {:.6} {} fcircle",
                    x, y, radius, color
                )?;
                circles += 1;
            }
        }
    }
    debug!(circles, "Postscript drawing written.");
    finish(writer)
}

/// Offset that carries an atom crossing an edge onto the opposite side.
fn edge_shift(coordinate: f64, radius: f64, extent: f64) -> f64 {
    if coordinate < radius {
        extent
    } else if coordinate > extent - radius {
        -extent
    } else {
        0.0
    }
}

fn finish(writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer, "grestore")?;
    writeln!(writer, "showpage")?;
    writeln!(writer, "%%EOF")?;
    Ok(())
}

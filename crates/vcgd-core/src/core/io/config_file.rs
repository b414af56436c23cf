use crate::core::io::traits::ConfigurationFile;
use crate::core::models::configuration::{Configuration, ModelError};
use crate::core::models::object::RigidObject;
use nalgebra::Point2;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: ConfigParseErrorKind,
    },
    #[error("File declares {declared} objects but contains {found}")]
    CountMismatch { declared: usize, found: usize },
    #[error("Invalid configuration: {0}")]
    Model(#[from] ModelError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigParseErrorKind {
    #[error("Invalid integer for {field} (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid number for {field} (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("Missing field {field}")]
    MissingField { field: &'static str },
    #[error("Unexpected trailing data '{0}'")]
    TrailingData(String),
}

/// The plain-text configuration format.
///
/// ```text
/// <width> <height>
/// <number of objects>
/// <type> <x> <y> <orientation>
/// ...
/// ```
///
/// Fields are separated by any whitespace and blank lines are ignored.
/// Boundary conditions are not stored: [`ConfigurationFile::read_from`] gives
/// a periodic configuration, [`ConfigFile::read_with_periodicity`] lets the
/// caller choose.
pub struct ConfigFile;

struct Fields<'a> {
    line: usize,
    tokens: std::str::SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(line: usize, content: &'a str) -> Self {
        Self {
            line,
            tokens: content.split_whitespace(),
        }
    }

    fn next_token(&mut self, field: &'static str) -> Result<&'a str, ConfigFileError> {
        self.tokens.next().ok_or(ConfigFileError::Parse {
            line: self.line,
            kind: ConfigParseErrorKind::MissingField { field },
        })
    }

    fn float(&mut self, field: &'static str) -> Result<f64, ConfigFileError> {
        let token = self.next_token(field)?;
        token.parse().map_err(|_| ConfigFileError::Parse {
            line: self.line,
            kind: ConfigParseErrorKind::InvalidFloat {
                field,
                value: token.into(),
            },
        })
    }

    fn int(&mut self, field: &'static str) -> Result<usize, ConfigFileError> {
        let token = self.next_token(field)?;
        token.parse().map_err(|_| ConfigFileError::Parse {
            line: self.line,
            kind: ConfigParseErrorKind::InvalidInt {
                field,
                value: token.into(),
            },
        })
    }

    fn finish(mut self) -> Result<(), ConfigFileError> {
        match self.tokens.next() {
            None => Ok(()),
            Some(extra) => Err(ConfigFileError::Parse {
                line: self.line,
                kind: ConfigParseErrorKind::TrailingData(extra.into()),
            }),
        }
    }
}

impl ConfigFile {
    /// Reads a configuration with the given boundary conditions.
    ///
    /// Positions are wrapped into a periodic cell. In a non-periodic cell an
    /// object outside the cell is an error.
    ///
    /// # Errors
    ///
    /// Besides parse errors, returns [`ConfigFileError::Model`] with
    /// [`ModelError::OutsideCell`] for an out-of-cell object when `periodic`
    /// is false.
    pub fn read_with_periodicity(
        reader: &mut impl BufRead,
        periodic: bool,
    ) -> Result<Configuration, ConfigFileError> {
        let mut configuration: Option<Configuration> = None;
        let mut declared: Option<usize> = None;
        let mut found = 0usize;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = Fields::new(line_num, &line);

            let Some(config) = configuration.as_mut() else {
                let width = fields.float("width")?;
                let height = fields.float("height")?;
                fields.finish()?;
                configuration = Some(Configuration::new(width, height, periodic)?);
                continue;
            };
            let Some(count) = declared else {
                let count = fields.int("object count")?;
                fields.finish()?;
                declared = Some(count);
                continue;
            };

            if found == count {
                return Err(ConfigFileError::CountMismatch {
                    declared: count,
                    found: found + 1,
                });
            }
            let object_type = fields.int("object type")?;
            let x = fields.float("x")?;
            let y = fields.float("y")?;
            let orientation = fields.float("orientation")?;
            fields.finish()?;
            config.add_object(RigidObject::new(object_type, Point2::new(x, y), orientation))?;
            found += 1;
        }

        let configuration = configuration.ok_or(ConfigFileError::Parse {
            line: 1,
            kind: ConfigParseErrorKind::MissingField { field: "width" },
        })?;
        let declared = declared.ok_or(ConfigFileError::Parse {
            line: 2,
            kind: ConfigParseErrorKind::MissingField {
                field: "object count",
            },
        })?;
        if found != declared {
            return Err(ConfigFileError::CountMismatch { declared, found });
        }
        Ok(configuration)
    }

    pub fn read_path_with_periodicity<P: AsRef<Path>>(
        path: P,
        periodic: bool,
    ) -> Result<Configuration, ConfigFileError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_with_periodicity(&mut reader, periodic)
    }
}

/// Formats a coordinate with six decimals, keeping the printed value inside
/// `[0, extent)` when rounding would land on the upper edge.
fn cell_coordinate(value: f64, extent: f64, periodic: bool) -> String {
    let text = format!("{:.6}", value);
    match text.parse::<f64>() {
        Ok(rounded) if rounded >= extent => {
            if periodic {
                format!("{:.6}", 0.0)
            } else {
                format!("{:.6}", ((extent * 1e6).ceil() - 1.0) / 1e6)
            }
        }
        _ => text,
    }
}

impl ConfigurationFile for ConfigFile {
    type Error = ConfigFileError;

    fn read_from(reader: &mut impl BufRead) -> Result<Configuration, Self::Error> {
        Self::read_with_periodicity(reader, true)
    }

    fn write_to(configuration: &Configuration, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(
            writer,
            "{:.6} {:.6}",
            configuration.width(),
            configuration.height()
        )?;
        writeln!(writer, "{}", configuration.n_objects())?;
        let periodic = configuration.is_periodic();
        for object in configuration.objects() {
            writeln!(
                writer,
                "{} {} {} {:.6}",
                object.object_type,
                cell_coordinate(object.position.x, configuration.width(), periodic),
                cell_coordinate(object.position.y, configuration.height(), periodic),
                object.orientation
            )?;
        }
        Ok(())
    }
}

use crate::core::io::traits::StructureFile;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: XyzParseErrorKind,
    },
    #[error("File ends after {found} of {expected} declared atom records")]
    TruncatedAtomBlock { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum XyzParseErrorKind {
    #[error("Missing atom-count line")]
    MissingAtomCount,
    #[error("Invalid atom count '{value}'")]
    InvalidAtomCount { value: String },
    #[error("Missing title line")]
    MissingTitle,
    #[error("Expected 4 whitespace-separated fields (symbol x y z), found {found}")]
    FieldCount { found: usize },
    #[error("Invalid coordinate '{value}'")]
    InvalidCoordinate { value: String },
    #[error("Unsupported element symbol '{symbol}'")]
    UnsupportedElement { symbol: String },
}

/// The plain-text atomic-coordinate format: an atom count, a free-form title
/// line, then one `<symbol> <x> <y> <z>` line per atom in atom-id order.
///
/// The format carries no bond information, so loading a saved molecule
/// reproduces atom kinds and positions but yields zero bonds. That is a
/// documented limitation of the format, not a defect. The molecule name maps
/// to the title line in both directions.
pub struct XyzFile;

impl StructureFile for XyzFile {
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<Molecule, Self::Error> {
        let mut lines = reader.lines();

        let count_line = lines.next().transpose()?.ok_or(XyzError::Parse {
            line: 1,
            kind: XyzParseErrorKind::MissingAtomCount,
        })?;
        let expected: usize =
            count_line
                .trim()
                .parse()
                .map_err(|_| XyzError::Parse {
                    line: 1,
                    kind: XyzParseErrorKind::InvalidAtomCount {
                        value: count_line.trim().to_string(),
                    },
                })?;

        let title = lines.next().transpose()?.ok_or(XyzError::Parse {
            line: 2,
            kind: XyzParseErrorKind::MissingTitle,
        })?;

        let mut molecule = Molecule::new(title.trim());
        for found in 0..expected {
            let line_num = found + 3;
            let line = lines
                .next()
                .transpose()?
                .ok_or(XyzError::TruncatedAtomBlock { expected, found })?;

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 4 {
                return Err(XyzError::Parse {
                    line: line_num,
                    kind: XyzParseErrorKind::FieldCount {
                        found: fields.len(),
                    },
                });
            }

            let element = Element::from_symbol(fields[0]).map_err(|_| XyzError::Parse {
                line: line_num,
                kind: XyzParseErrorKind::UnsupportedElement {
                    symbol: fields[0].to_string(),
                },
            })?;

            let mut coords = [0.0f64; 3];
            for (slot, field) in coords.iter_mut().zip(&fields[1..]) {
                *slot = field.parse().map_err(|_| XyzError::Parse {
                    line: line_num,
                    kind: XyzParseErrorKind::InvalidCoordinate {
                        value: field.to_string(),
                    },
                })?;
            }

            molecule.add_atom(element, Point3::new(coords[0], coords[1], coords[2]));
        }

        Ok(molecule)
    }

    fn write_to(molecule: &Molecule, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "{}", molecule.atom_count())?;
        writeln!(writer, "{}", molecule.name())?;
        for (_, atom) in molecule.atoms_iter() {
            writeln!(
                writer,
                "{:<2} {:>15.8} {:>15.8} {:>15.8}",
                atom.symbol(),
                atom.position.x,
                atom.position.y,
                atom.position.z,
            )?;
        }
        Ok(())
    }
}

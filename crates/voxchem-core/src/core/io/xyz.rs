use crate::core::io::traits::GeometryFile;
use crate::core::models::atom::{Atom, Element};
use crate::core::models::record::GeometryRecord;
use nalgebra::Point3;
use std::io::{self, BufRead};
use std::str::FromStr;
use thiserror::Error;

/// Number of whitespace-separated fields on the metadata line.
pub const METADATA_FIELD_COUNT: usize = 17;
/// Position of the record id on the metadata line.
pub const ID_FIELD: usize = 1;
/// Position of the 0 K internal energy (U0, Hartree) on the metadata line.
pub const ENERGY_FIELD: usize = 12;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
    #[error("Unsupported element '{symbol}' on line {line}")]
    UnsupportedElement { line: usize, symbol: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum XyzParseErrorKind {
    #[error("Unexpected end of record, expected the {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("Atom count line must hold exactly one field, found {found}")]
    CountTokenCount { found: usize },
    #[error("Metadata line must hold {expected} fields, found {found}")]
    MetadataTokenCount { expected: usize, found: usize },
    #[error("Atom line must hold 4 or 5 fields, found {found}")]
    AtomTokenCount { found: usize },
    #[error("Invalid integer for {field} (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid float for {field} (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("Record declares no atoms")]
    EmptyRecord,
    #[error("Header declares {declared} atoms but the record holds {found}")]
    AtomCountMismatch { declared: usize, found: usize },
}

const MAX_RESERVED_ATOMS: usize = 64;

/// Reader for QM9-style extended XYZ records.
///
/// Layout: the atom count, a metadata line whose field [`ID_FIELD`] is the
/// record id and field [`ENERGY_FIELD`] the reference energy, then one
/// `<symbol> <x> <y> <z> [charge]` line per atom. Anything after the atom block
/// (frequencies, SMILES, InChI) is ignored.
pub struct XyzFile;

fn parse_float(value: &str, field: &'static str, line: usize) -> Result<f64, XyzError> {
    // QM9 writes some exponents in Mathematica form, e.g. `1.5*^-6`.
    let normalized = value.replacen("*^", "e", 1);
    normalized.parse::<f64>().map_err(|_| XyzError::Parse {
        line,
        kind: XyzParseErrorKind::InvalidFloat {
            field,
            value: value.to_string(),
        },
    })
}

fn starts_with_letter(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn looks_like_atom_line(tokens: &[&str]) -> bool {
    matches!(tokens.len(), 4 | 5)
        && starts_with_letter(tokens[0])
        && tokens[1..]
            .iter()
            .all(|t| t.replacen("*^", "e", 1).parse::<f64>().is_ok())
}

fn parse_atom_line(tokens: &[&str], line: usize) -> Result<Atom, XyzError> {
    if !matches!(tokens.len(), 4 | 5) {
        return Err(XyzError::Parse {
            line,
            kind: XyzParseErrorKind::AtomTokenCount {
                found: tokens.len(),
            },
        });
    }

    let element = Element::from_str(tokens[0]).map_err(|_| XyzError::UnsupportedElement {
        line,
        symbol: tokens[0].to_string(),
    })?;
    let x = parse_float(tokens[1], "x coordinate", line)?;
    let y = parse_float(tokens[2], "y coordinate", line)?;
    let z = parse_float(tokens[3], "z coordinate", line)?;

    let atom = Atom::new(element, Point3::new(x, y, z));
    match tokens.get(4) {
        Some(charge) => Ok(atom.with_partial_charge(parse_float(charge, "partial charge", line)?)),
        None => Ok(atom),
    }
}

struct LineCursor<L> {
    lines: L,
    line_num: usize,
}

impl<L: Iterator<Item = io::Result<String>>> LineCursor<L> {
    fn next_line(&mut self) -> Result<Option<(usize, String)>, XyzError> {
        match self.lines.next() {
            Some(line) => {
                self.line_num += 1;
                Ok(Some((self.line_num, line?)))
            }
            None => Ok(None),
        }
    }

    fn expect_line(&mut self, expected: &'static str) -> Result<(usize, String), XyzError> {
        self.next_line()?.ok_or_else(|| XyzError::Parse {
            line: self.line_num + 1,
            kind: XyzParseErrorKind::UnexpectedEnd { expected },
        })
    }
}

impl GeometryFile for XyzFile {
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<GeometryRecord, Self::Error> {
        let mut cursor = LineCursor {
            lines: reader.lines(),
            line_num: 0,
        };

        let (line, count_line) = cursor.expect_line("atom count line")?;
        let count_tokens: Vec<&str> = count_line.split_whitespace().collect();
        if count_tokens.len() != 1 {
            return Err(XyzError::Parse {
                line,
                kind: XyzParseErrorKind::CountTokenCount {
                    found: count_tokens.len(),
                },
            });
        }
        let declared: usize = count_tokens[0].parse().map_err(|_| XyzError::Parse {
            line,
            kind: XyzParseErrorKind::InvalidInt {
                field: "atom count",
                value: count_tokens[0].to_string(),
            },
        })?;
        if declared == 0 {
            return Err(XyzError::Parse {
                line,
                kind: XyzParseErrorKind::EmptyRecord,
            });
        }

        let (line, metadata_line) = cursor.expect_line("metadata line")?;
        let fields: Vec<&str> = metadata_line.split_whitespace().collect();
        if fields.len() != METADATA_FIELD_COUNT {
            return Err(XyzError::Parse {
                line,
                kind: XyzParseErrorKind::MetadataTokenCount {
                    expected: METADATA_FIELD_COUNT,
                    found: fields.len(),
                },
            });
        }
        let id: u64 = fields[ID_FIELD].parse().map_err(|_| XyzError::Parse {
            line,
            kind: XyzParseErrorKind::InvalidInt {
                field: "record id",
                value: fields[ID_FIELD].to_string(),
            },
        })?;
        let reference_energy = parse_float(fields[ENERGY_FIELD], "reference energy", line)?;

        // The declared count is untrusted; the block below bounds the real size.
        let mut atoms = Vec::with_capacity(declared.min(MAX_RESERVED_ATOMS));
        for found in 0..declared {
            let mismatch = XyzParseErrorKind::AtomCountMismatch { declared, found };
            let Some((line, atom_line)) = cursor.next_line()? else {
                return Err(XyzError::Parse {
                    line: cursor.line_num + 1,
                    kind: mismatch,
                });
            };
            let tokens: Vec<&str> = atom_line.split_whitespace().collect();
            if tokens.first().is_none_or(|t| !starts_with_letter(t)) {
                return Err(XyzError::Parse {
                    line,
                    kind: mismatch,
                });
            }
            atoms.push(parse_atom_line(&tokens, line)?);
        }

        let mut extra = 0;
        while let Some((_, trailing)) = cursor.next_line()? {
            let tokens: Vec<&str> = trailing.split_whitespace().collect();
            if !looks_like_atom_line(&tokens) {
                break;
            }
            extra += 1;
        }
        if extra > 0 {
            return Err(XyzError::Parse {
                line: declared + 3,
                kind: XyzParseErrorKind::AtomCountMismatch {
                    declared,
                    found: declared + extra,
                },
            });
        }

        Ok(GeometryRecord::new(id, reference_energy, atoms))
    }
}

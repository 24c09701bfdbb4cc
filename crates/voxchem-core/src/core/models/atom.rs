use nalgebra::Point3;
use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;

/// The chemical elements a geometry record may contain.
///
/// The declaration order is the channel order of a multi-channel potential
/// grid: H, C, N, O, F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    H,
    C,
    N,
    O,
    F,
}

#[rustfmt::skip]
static SYMBOL_TO_ELEMENT: Map<&'static str, Element> = phf_map! {
    "H" => Element::H, "C" => Element::C, "N" => Element::N,
    "O" => Element::O, "F" => Element::F,
};

impl Element {
    /// All supported elements, in channel order.
    pub const ALL: [Element; 5] = [Element::H, Element::C, Element::N, Element::O, Element::F];

    /// Number of distinct elements, and therefore channels in a multi-channel grid.
    pub const COUNT: usize = Self::ALL.len();

    /// Returns the nuclear charge of the element.
    pub fn atomic_number(self) -> u8 {
        match self {
            Element::H => 1,
            Element::C => 6,
            Element::N => 7,
            Element::O => 8,
            Element::F => 9,
        }
    }

    /// Returns the fixed channel index of the element (0 for H through 4 for F).
    pub fn channel(self) -> usize {
        self as usize
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Element::H => "H",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Error returned when a symbol does not name one of the supported elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownElement(pub String);

impl fmt::Display for UnknownElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported element symbol '{}'", self.0)
    }
}

impl std::error::Error for UnknownElement {}

impl FromStr for Element {
    type Err = UnknownElement;

    /// Parses an element symbol. Matching is exact: `"h"` or `"Cl"` are rejected
    /// rather than mapped to a placeholder element.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SYMBOL_TO_ELEMENT
            .get(s)
            .copied()
            .ok_or_else(|| UnknownElement(s.to_string()))
    }
}

/// A single atom of a parsed geometry record.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The chemical element of the atom.
    pub element: Element,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
    /// Mulliken partial charge, when the record provides one.
    pub partial_charge: Option<f64>,
}

impl Atom {
    pub fn new(element: Element, position: Point3<f64>) -> Self {
        Self {
            element,
            position,
            partial_charge: None,
        }
    }

    pub fn with_partial_charge(mut self, charge: f64) -> Self {
        self.partial_charge = Some(charge);
        self
    }
}

use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The chemical elements the engine knows how to simulate.
///
/// This is a closed enumeration: every variant has a complete entry of
/// physical constants, so constructing an atom from an `Element` can never
/// fail. Extending the periodic subset means adding a variant plus its
/// constants below; symbol parsing picks the new entry up automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    Hydrogen,
    Carbon,
    Nitrogen,
    Oxygen,
}

/// Invariant physical constants for one element.
///
/// These values are fixed at compile time and shared by every atom of the
/// element; per-atom state (position, velocity, force) lives on `Atom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementData {
    /// Atomic mass in atomic mass units.
    pub mass: f64,
    /// Van der Waals radius in Angstroms.
    pub radius: f64,
    /// Display symbol (e.g., "H", "C").
    pub symbol: &'static str,
}

const HYDROGEN: ElementData = ElementData {
    mass: 1.008,
    radius: 0.25,
    symbol: "H",
};
const CARBON: ElementData = ElementData {
    mass: 12.011,
    radius: 0.70,
    symbol: "C",
};
const NITROGEN: ElementData = ElementData {
    mass: 14.007,
    radius: 0.65,
    symbol: "N",
};
const OXYGEN: ElementData = ElementData {
    mass: 15.999,
    radius: 0.60,
    symbol: "O",
};

static ELEMENT_BY_SYMBOL: Map<&'static str, Element> = phf_map! {
    "H" => Element::Hydrogen,
    "C" => Element::Carbon,
    "N" => Element::Nitrogen,
    "O" => Element::Oxygen,
};

/// Error raised when a symbol does not name a supported element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported element symbol '{0}'")]
pub struct UnsupportedElement(pub String);

impl Element {
    /// All supported elements, in periodic-table order.
    pub const ALL: [Element; 4] = [
        Element::Hydrogen,
        Element::Carbon,
        Element::Nitrogen,
        Element::Oxygen,
    ];

    /// Returns the invariant constants for this element.
    ///
    /// Total over the enumeration; every variant has an entry.
    pub fn data(self) -> &'static ElementData {
        match self {
            Element::Hydrogen => &HYDROGEN,
            Element::Carbon => &CARBON,
            Element::Nitrogen => &NITROGEN,
            Element::Oxygen => &OXYGEN,
        }
    }

    /// Atomic mass in atomic mass units.
    #[inline]
    pub fn mass(self) -> f64 {
        self.data().mass
    }

    /// Van der Waals radius in Angstroms.
    #[inline]
    pub fn radius(self) -> f64 {
        self.data().radius
    }

    /// Display symbol.
    #[inline]
    pub fn symbol(self) -> &'static str {
        self.data().symbol
    }

    /// Looks an element up by its display symbol.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedElement`] if the symbol has no table entry.
    pub fn from_symbol(symbol: &str) -> Result<Element, UnsupportedElement> {
        ELEMENT_BY_SYMBOL
            .get(symbol)
            .copied()
            .ok_or_else(|| UnsupportedElement(symbol.to_string()))
    }
}

impl FromStr for Element {
    type Err = UnsupportedElement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Element::from_symbol(s)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

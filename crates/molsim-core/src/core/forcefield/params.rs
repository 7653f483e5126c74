use crate::core::models::element::Element;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Harmonic stretching parameters for one bond type.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct BondStretchParam {
    /// Equilibrium bond length in Angstroms.
    pub equilibrium_length: f64,
    /// Stiffness in kcal/(mol·Å²); the stretching energy is `k·(r − r0)²`.
    pub stiffness: f64,
}

/// Van der Waals parameters for one element.
///
/// The pair minimum distance comes from the element table (sum of the two
/// radii); only the well depth is a free parameter here.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct VdwParam {
    /// Well depth (epsilon) in kcal/mol.
    pub well_depth: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct GlobalParams {
    /// Relative dielectric constant for the Coulomb term.
    pub dielectric_constant: f64,
    /// Minimum interatomic distance in Angstroms. Pairs closer than this
    /// make the singular non-bonded terms meaningless; evaluation reports
    /// divergence instead of returning a huge finite number.
    pub distance_floor: f64,
    /// Whether the non-bonded (van der Waals + Coulomb) terms are evaluated
    /// at all. Bonded stretching is always on.
    #[serde(default = "default_non_bonded")]
    pub non_bonded: bool,
}

fn default_non_bonded() -> bool {
    true
}

/// A complete, data-driven parameter set for the force field.
///
/// [`Forcefield::default`] ships built-in parameters covering every pair of
/// supported elements; [`Forcefield::load`] reads a TOML file with the same
/// layout for overrides. Map keys are symbol-based so parameter files stay
/// human-editable (`"C-H"`, `"O"`).
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Forcefield {
    pub globals: GlobalParams,
    /// Bond stretching parameters keyed by normalized symbol pair.
    pub bond: HashMap<String, BondStretchParam>,
    /// Van der Waals parameters keyed by element symbol.
    pub vdw: HashMap<String, VdwParam>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

impl Default for Forcefield {
    fn default() -> Self {
        let bond = [
            ("H-H", 0.74, 300.0),
            ("C-H", 1.09, 340.0),
            ("C-C", 1.54, 310.0),
            ("C-N", 1.47, 305.0),
            ("C-O", 1.43, 320.0),
            ("H-N", 1.01, 434.0),
            ("H-O", 0.96, 450.0),
            ("N-N", 1.45, 297.0),
            ("N-O", 1.40, 270.0),
            ("O-O", 1.48, 225.0),
        ]
        .into_iter()
        .map(|(key, equilibrium_length, stiffness)| {
            (
                key.to_string(),
                BondStretchParam {
                    equilibrium_length,
                    stiffness,
                },
            )
        })
        .collect();

        let vdw = [("H", 0.0157), ("C", 0.0860), ("N", 0.1700), ("O", 0.2100)]
            .into_iter()
            .map(|(symbol, well_depth)| (symbol.to_string(), VdwParam { well_depth }))
            .collect();

        Self {
            globals: GlobalParams {
                dielectric_constant: 1.0,
                distance_floor: 1e-4,
                non_bonded: true,
            },
            bond,
            vdw,
        }
    }
}

impl Forcefield {
    /// The built-in parameter set with the non-bonded terms switched off.
    ///
    /// Useful for integrator verification, where only the harmonic terms
    /// should contribute.
    pub fn bonded_only() -> Self {
        let mut forcefield = Self::default();
        forcefield.globals.non_bonded = false;
        forcefield
    }

    /// Loads a parameter set from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ParamLoadError`] with path context if the file cannot be
    /// read or does not parse.
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// The canonical lookup key for a bond between two elements: both
    /// symbols in lexicographic order, dash-separated.
    pub fn bond_key(element1: Element, element2: Element) -> String {
        let (a, b) = if element1.symbol() <= element2.symbol() {
            (element1.symbol(), element2.symbol())
        } else {
            (element2.symbol(), element1.symbol())
        };
        format!("{}-{}", a, b)
    }

    /// Stretching parameters for a bond between the two elements, in either
    /// argument order.
    pub fn bond_param(&self, element1: Element, element2: Element) -> Option<&BondStretchParam> {
        self.bond.get(&Self::bond_key(element1, element2))
    }

    /// Van der Waals parameters for one element.
    pub fn vdw_param(&self, element: Element) -> Option<&VdwParam> {
        self.vdw.get(element.symbol())
    }
}

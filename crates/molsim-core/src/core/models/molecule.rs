use super::atom::Atom;
use super::element::Element;
use super::ids::{AtomId, BondId};
use super::topology::{Bond, BondOrder};
use crate::core::forcefield::evaluator::{EvaluationError, Evaluator};
use crate::core::forcefield::params::Forcefield;
use crate::core::io::traits::StructureFile;
use crate::core::io::xyz::{XyzError, XyzFile};
use nalgebra::Point3;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Error raised when a topology operation references atoms it must not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoleculeError {
    /// A bond endpoint does not belong to this molecule.
    #[error("bond endpoint {0:?} does not belong to this molecule")]
    AtomNotFound(AtomId),
    /// Both bond endpoints name the same atom.
    #[error("an atom cannot be bonded to itself")]
    SelfBond,
    /// The two atoms are already connected by a bond.
    #[error("atoms {0:?} and {1:?} are already bonded")]
    DuplicateBond(AtomId, AtomId),
}

/// A read-only copy of one atom's identity and location, for consumers
/// (e.g. a rendering shell) that must not hold references into the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtomSnapshot {
    pub element: Element,
    pub position: Point3<f64>,
}

/// A point-in-time structural snapshot of a molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeSnapshot {
    pub name: String,
    pub atoms: Vec<AtomSnapshot>,
}

/// An ordered collection of atoms plus the bonds between them.
///
/// The molecule exclusively owns its atoms and bonds. Atoms and bonds are
/// appended incrementally and identified by generated ids that stay valid
/// for the molecule's whole lifetime; iteration orders (and therefore file
/// output and force accumulation) follow insertion order deterministically.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    name: String,
    atoms: SlotMap<AtomId, Atom>,
    bonds: SlotMap<BondId, Bond>,
    /// Atom ids in insertion order; the canonical iteration order.
    atom_order: Vec<AtomId>,
    /// Bond ids in insertion order.
    bond_order: Vec<BondId>,
    /// Cached adjacency, indexed by atom id.
    adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
}

impl Molecule {
    /// Creates an empty molecule with the given display name.
    ///
    /// The name doubles as the title line of the structure file format.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// The molecule's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Number of atoms.
    pub fn atom_count(&self) -> usize {
        self.atom_order.len()
    }

    /// Number of bonds.
    pub fn bond_count(&self) -> usize {
        self.bond_order.len()
    }

    /// Retrieves an atom by id.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves an atom mutably by id.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Atom ids in insertion order.
    pub fn atom_ids(&self) -> &[AtomId] {
        &self.atom_order
    }

    /// Iterates over `(AtomId, &Atom)` pairs in insertion order.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atom_order.iter().map(|&id| (id, &self.atoms[id]))
    }

    /// Iterates mutably over all atoms (no order guarantee).
    pub fn atoms_iter_mut(&mut self) -> impl Iterator<Item = &mut Atom> {
        self.atoms.iter_mut().map(|(_, atom)| atom)
    }

    /// Retrieves a bond by id.
    pub fn bond(&self, id: BondId) -> Option<&Bond> {
        self.bonds.get(id)
    }

    /// Iterates over `(BondId, &Bond)` pairs in creation order.
    pub fn bonds_iter(&self) -> impl Iterator<Item = (BondId, &Bond)> {
        self.bond_order.iter().map(|&id| (id, &self.bonds[id]))
    }

    /// Appends an atom and returns its id.
    ///
    /// Ids are stable for the molecule's lifetime and are never reused.
    pub fn add_atom(&mut self, element: Element, position: Point3<f64>) -> AtomId {
        let id = self.atoms.insert(Atom::new(element, position));
        self.atom_order.push(id);
        self.adjacency.insert(id, Vec::new());
        id
    }

    /// Creates a single bond between two existing, distinct, not-yet-bonded
    /// atoms and returns its id.
    ///
    /// # Errors
    ///
    /// Returns a [`MoleculeError`] (and leaves the bond set untouched) if
    /// either endpoint is missing, the endpoints coincide, or the pair is
    /// already bonded.
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId) -> Result<BondId, MoleculeError> {
        self.add_bond_with_order(atom1_id, atom2_id, BondOrder::Single)
    }

    /// [`add_bond`](Self::add_bond) with an explicit bond order.
    pub fn add_bond_with_order(
        &mut self,
        atom1_id: AtomId,
        atom2_id: AtomId,
        order: BondOrder,
    ) -> Result<BondId, MoleculeError> {
        if !self.atoms.contains_key(atom1_id) {
            return Err(MoleculeError::AtomNotFound(atom1_id));
        }
        if !self.atoms.contains_key(atom2_id) {
            return Err(MoleculeError::AtomNotFound(atom2_id));
        }
        if atom1_id == atom2_id {
            return Err(MoleculeError::SelfBond);
        }
        if self.adjacency[atom1_id].contains(&atom2_id) {
            return Err(MoleculeError::DuplicateBond(atom1_id, atom2_id));
        }

        let id = self.bonds.insert(Bond::new(atom1_id, atom2_id, order));
        self.bond_order.push(id);
        self.adjacency[atom1_id].push(atom2_id);
        self.adjacency[atom2_id].push(atom1_id);
        Ok(id)
    }

    /// The atoms directly bonded to `atom_id`, or `None` for a foreign id.
    pub fn bonded_neighbors(&self, atom_id: AtomId) -> Option<&[AtomId]> {
        self.adjacency.get(atom_id).map(|v| v.as_slice())
    }

    /// Whether the two atoms are directly bonded.
    pub fn are_bonded(&self, atom1_id: AtomId, atom2_id: AtomId) -> bool {
        self.adjacency
            .get(atom1_id)
            .is_some_and(|neighbors| neighbors.contains(&atom2_id))
    }

    /// Counts atoms per element. O(atom count), read-only.
    pub fn formula(&self) -> HashMap<Element, usize> {
        let mut counts = HashMap::new();
        for (_, atom) in self.atoms_iter() {
            *counts.entry(atom.element).or_insert(0) += 1;
        }
        counts
    }

    /// The elemental formula in Hill convention: carbon first, hydrogen
    /// second, remaining elements alphabetically (all alphabetical when no
    /// carbon is present). Counts of one are elided, e.g. `H2O`, `CH4`.
    pub fn formula_string(&self) -> String {
        let counts = self.formula();
        let mut symbols: Vec<(&str, usize)> = counts
            .iter()
            .map(|(element, &count)| (element.symbol(), count))
            .collect();

        let has_carbon = counts.contains_key(&Element::Carbon);
        symbols.sort_by(|(a, _), (b, _)| {
            let rank = |symbol: &str| match (has_carbon, symbol) {
                (true, "C") => 0,
                (true, "H") => 1,
                _ => 2,
            };
            rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
        });

        let mut out = String::new();
        for (symbol, count) in symbols {
            out.push_str(symbol);
            if count > 1 {
                out.push_str(&count.to_string());
            }
        }
        out
    }

    /// Total potential energy under the given force field.
    ///
    /// Recomputed on every call — the value is invalidated by any position
    /// mutation, so it is never cached.
    ///
    /// # Errors
    ///
    /// Propagates force-field evaluation failures, including the divergence
    /// raised when two atoms fall below the minimum-distance floor.
    pub fn total_energy(&self, forcefield: &Forcefield) -> Result<f64, EvaluationError> {
        let evaluation = Evaluator::new(forcefield).evaluate(self)?;
        Ok(evaluation.energy.total())
    }

    /// Writes this molecule to a structure file at `path`.
    ///
    /// Bonds are not representable in the format and are not written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), XyzError> {
        XyzFile::write_to_path(self, path)
    }

    /// Reads a molecule from a structure file at `path`.
    ///
    /// The format carries no bond information, so the result has zero bonds.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Molecule, XyzError> {
        XyzFile::read_from_path(path)
    }

    /// Takes a read-only structural snapshot (name, elements, positions).
    ///
    /// The snapshot shares nothing with the molecule, so a rendering thread
    /// can hold it while a session keeps mutating the original.
    pub fn snapshot(&self) -> MoleculeSnapshot {
        MoleculeSnapshot {
            name: self.name.clone(),
            atoms: self
                .atoms_iter()
                .map(|(_, atom)| AtomSnapshot {
                    element: atom.element,
                    position: atom.position,
                })
                .collect(),
        }
    }
}

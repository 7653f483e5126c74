use super::params::Forcefield;
use super::potentials;
use super::term::EnergyTerm;
use crate::core::models::element::Element;
use crate::core::models::ids::AtomId;
use crate::core::models::molecule::Molecule;
use itertools::Itertools;
use nalgebra::Vector3;
use std::collections::HashMap;
use thiserror::Error;

/// Error raised when a force-field evaluation cannot produce a usable result.
///
/// The divergence variants ([`AtomsTooClose`](EvaluationError::AtomsTooClose)
/// and [`NonFinite`](EvaluationError::NonFinite)) describe a geometry the
/// potential is singular or meaningless on; a running session maps them to
/// its `Diverged` terminal state. The parameter variants are configuration
/// mistakes and surface as plain errors.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error(
        "atoms {atom1_id:?} and {atom2_id:?} are {distance:.3e} apart, below the {floor:.3e} floor"
    )]
    AtomsTooClose {
        atom1_id: AtomId,
        atom2_id: AtomId,
        distance: f64,
        floor: f64,
    },
    #[error("evaluation produced a non-finite energy or force")]
    NonFinite,
    #[error("no bond parameters for bond type '{key}'")]
    BondParamMissing { key: String },
    #[error("no van der Waals parameters for element '{symbol}'")]
    VdwParamMissing { symbol: String },
}

impl EvaluationError {
    /// Whether this error signals a diverged geometry rather than a
    /// configuration problem.
    pub fn is_divergence(&self) -> bool {
        matches!(
            self,
            EvaluationError::AtomsTooClose { .. } | EvaluationError::NonFinite
        )
    }
}

/// The result of one force-field pass: additive energy terms plus one force
/// vector per atom, aligned with the molecule's atom insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub energy: EnergyTerm,
    pub forces: Vec<Vector3<f64>>,
}

impl Evaluation {
    /// Maximum force norm over all atoms (0 for an empty molecule).
    pub fn max_force_norm(&self) -> f64 {
        self.forces.iter().map(|f| f.norm()).fold(0.0, f64::max)
    }
}

/// Stateless force-field evaluator over a parameter set.
///
/// `evaluate` is a pure function of the molecule's current geometry: it
/// never mutates the molecule, and identical geometry yields bit-identical
/// results because every term accumulates in a fixed order (bonds in
/// creation order, then non-bonded pairs in ascending atom insertion order).
pub struct Evaluator<'a> {
    forcefield: &'a Forcefield,
}

impl<'a> Evaluator<'a> {
    pub fn new(forcefield: &'a Forcefield) -> Self {
        Self { forcefield }
    }

    /// Evaluates potential energy and per-atom forces for the molecule's
    /// current geometry.
    ///
    /// # Errors
    ///
    /// Returns a divergence error when any interacting pair falls below the
    /// minimum-distance floor or the result turns non-finite, and a
    /// parameter error when a bond type or element has no table entry.
    pub fn evaluate(&self, molecule: &Molecule) -> Result<Evaluation, EvaluationError> {
        let ids = molecule.atom_ids();
        let index_of: HashMap<AtomId, usize> =
            ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut energy = EnergyTerm::default();
        let mut forces = vec![Vector3::zeros(); ids.len()];

        // Bonded stretching, in bond creation order.
        for (_, bond) in molecule.bonds_iter() {
            let atom1 = molecule.atom(bond.atom1_id).expect("bond endpoints are owned atoms");
            let atom2 = molecule.atom(bond.atom2_id).expect("bond endpoints are owned atoms");
            let param = self
                .forcefield
                .bond_param(atom1.element, atom2.element)
                .ok_or_else(|| EvaluationError::BondParamMissing {
                    key: Forcefield::bond_key(atom1.element, atom2.element),
                })?;

            let separation = atom1.position - atom2.position;
            let distance = separation.norm();
            self.check_floor(bond.atom1_id, bond.atom2_id, distance)?;

            energy.stretch +=
                potentials::harmonic_stretch(distance, param.equilibrium_length, param.stiffness);
            let slope = potentials::harmonic_stretch_slope(
                distance,
                param.equilibrium_length,
                param.stiffness,
            );
            // F = -dE/dr along the bond axis; equal and opposite on the endpoints.
            let axial = separation / distance * slope;
            forces[index_of[&bond.atom1_id]] -= axial;
            forces[index_of[&bond.atom2_id]] += axial;
        }

        // Non-bonded pairs (not directly bonded), ascending insertion order.
        if self.forcefield.globals.non_bonded {
            let dielectric = self.forcefield.globals.dielectric_constant;
            for (i1, i2) in (0..ids.len()).tuple_combinations() {
                let id1 = ids[i1];
                let id2 = ids[i2];
                if molecule.are_bonded(id1, id2) {
                    continue;
                }
                let atom1 = molecule.atom(id1).expect("ids come from the molecule");
                let atom2 = molecule.atom(id2).expect("ids come from the molecule");

                let separation = atom1.position - atom2.position;
                let distance = separation.norm();
                self.check_floor(id1, id2, distance)?;

                let well_depth1 = self.vdw_well_depth(atom1.element)?;
                let well_depth2 = self.vdw_well_depth(atom2.element)?;
                let r_min = atom1.radius() + atom2.radius();
                let well_depth = (well_depth1 * well_depth2).sqrt();

                energy.vdw += potentials::lennard_jones_12_6(distance, r_min, well_depth);
                let mut slope = potentials::lennard_jones_12_6_slope(distance, r_min, well_depth);

                if atom1.partial_charge != 0.0 && atom2.partial_charge != 0.0 {
                    energy.coulomb += potentials::coulomb(
                        distance,
                        atom1.partial_charge,
                        atom2.partial_charge,
                        dielectric,
                    );
                    slope += potentials::coulomb_slope(
                        distance,
                        atom1.partial_charge,
                        atom2.partial_charge,
                        dielectric,
                    );
                }

                let axial = separation / distance * slope;
                forces[i1] -= axial;
                forces[i2] += axial;
            }
        }

        if !energy.is_finite() || forces.iter().any(|f| !f.iter().all(|c| c.is_finite())) {
            return Err(EvaluationError::NonFinite);
        }

        Ok(Evaluation { energy, forces })
    }

    fn vdw_well_depth(&self, element: Element) -> Result<f64, EvaluationError> {
        self.forcefield
            .vdw_param(element)
            .map(|param| param.well_depth)
            .ok_or_else(|| EvaluationError::VdwParamMissing {
                symbol: element.symbol().to_string(),
            })
    }

    fn check_floor(
        &self,
        atom1_id: AtomId,
        atom2_id: AtomId,
        distance: f64,
    ) -> Result<(), EvaluationError> {
        let floor = self.forcefield.globals.distance_floor;
        if distance < floor {
            return Err(EvaluationError::AtomsTooClose {
                atom1_id,
                atom2_id,
                distance,
                floor,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::element::Element;
    use nalgebra::Point3;

    fn h2(separation: f64) -> Molecule {
        let mut molecule = Molecule::new("Hydrogen");
        let h1 = molecule.add_atom(Element::Hydrogen, Point3::origin());
        let h2 = molecule.add_atom(Element::Hydrogen, Point3::new(separation, 0.0, 0.0));
        molecule.add_bond(h1, h2).unwrap();
        molecule
    }

    #[test]
    fn stretched_bond_pulls_endpoints_together() {
        let molecule = h2(1.0); // r0 = 0.74, stretched
        let forcefield = Forcefield::bonded_only();
        let evaluation = Evaluator::new(&forcefield).evaluate(&molecule).unwrap();

        // E = 300 * (1.0 - 0.74)^2
        assert!((evaluation.energy.stretch - 300.0 * 0.26 * 0.26).abs() < 1e-9);
        assert_eq!(evaluation.energy.vdw, 0.0);

        // Atom 0 sits at the origin, atom 1 at +x: the force on atom 0 points
        // toward +x and the force on atom 1 is its mirror image.
        assert!(evaluation.forces[0].x > 0.0);
        assert!((evaluation.forces[0] + evaluation.forces[1]).norm() < 1e-12);
    }

    #[test]
    fn compressed_bond_pushes_endpoints_apart() {
        let molecule = h2(0.5);
        let forcefield = Forcefield::bonded_only();
        let evaluation = Evaluator::new(&forcefield).evaluate(&molecule).unwrap();
        assert!(evaluation.forces[0].x < 0.0);
        assert!(evaluation.forces[1].x > 0.0);
    }

    #[test]
    fn equilibrium_bond_produces_zero_energy_and_force() {
        let molecule = h2(0.74);
        let forcefield = Forcefield::bonded_only();
        let evaluation = Evaluator::new(&forcefield).evaluate(&molecule).unwrap();
        assert!(evaluation.energy.total().abs() < 1e-12);
        assert!(evaluation.max_force_norm() < 1e-9);
    }

    #[test]
    fn directly_bonded_pairs_are_excluded_from_non_bonded_terms() {
        let molecule = h2(0.74);
        let forcefield = Forcefield::default(); // non-bonded on
        let evaluation = Evaluator::new(&forcefield).evaluate(&molecule).unwrap();
        // The only pair is bonded, so the vdw term never fires.
        assert_eq!(evaluation.energy.vdw, 0.0);
        assert_eq!(evaluation.energy.coulomb, 0.0);
    }

    #[test]
    fn unbonded_pair_feels_lennard_jones() {
        let mut molecule = Molecule::new("Pair");
        molecule.add_atom(Element::Carbon, Point3::origin());
        molecule.add_atom(Element::Carbon, Point3::new(1.4, 0.0, 0.0));
        let forcefield = Forcefield::default();
        let evaluation = Evaluator::new(&forcefield).evaluate(&molecule).unwrap();

        // r_min = 1.4 exactly, so the pair sits at the well bottom.
        assert!((evaluation.energy.vdw - (-0.0860)).abs() < 1e-9);
        assert!(evaluation.max_force_norm() < 1e-9);
    }

    #[test]
    fn coulomb_term_requires_both_charges_nonzero() {
        let mut molecule = Molecule::new("Pair");
        let a = molecule.add_atom(Element::Oxygen, Point3::origin());
        let b = molecule.add_atom(Element::Hydrogen, Point3::new(2.0, 0.0, 0.0));
        let forcefield = Forcefield::default();

        let neutral = Evaluator::new(&forcefield).evaluate(&molecule).unwrap();
        assert_eq!(neutral.energy.coulomb, 0.0);

        molecule.atom_mut(a).unwrap().partial_charge = -0.8;
        molecule.atom_mut(b).unwrap().partial_charge = 0.4;
        let charged = Evaluator::new(&forcefield).evaluate(&molecule).unwrap();
        assert!(charged.energy.coulomb < 0.0);
    }

    #[test]
    fn coincident_atoms_report_divergence_not_infinity() {
        let mut molecule = Molecule::new("Broken");
        molecule.add_atom(Element::Hydrogen, Point3::new(1.0, 1.0, 1.0));
        molecule.add_atom(Element::Hydrogen, Point3::new(1.0, 1.0, 1.0));
        let forcefield = Forcefield::default();

        let result = Evaluator::new(&forcefield).evaluate(&molecule);
        match result {
            Err(error) => assert!(error.is_divergence()),
            Ok(_) => panic!("coincident atoms must not evaluate successfully"),
        }
    }

    #[test]
    fn missing_bond_parameters_are_a_lookup_error_not_a_divergence() {
        let molecule = h2(1.0);
        let mut forcefield = Forcefield::bonded_only();
        forcefield.bond.clear();

        let result = Evaluator::new(&forcefield).evaluate(&molecule);
        match result {
            Err(error) => {
                assert!(!error.is_divergence());
                assert!(matches!(error, EvaluationError::BondParamMissing { .. }));
            }
            Ok(_) => panic!("missing parameters must not evaluate successfully"),
        }
    }

    #[test]
    fn evaluation_is_deterministic_for_identical_geometry() {
        let mut molecule = Molecule::new("Water");
        let o = molecule.add_atom(Element::Oxygen, Point3::new(0.0, 0.0, 0.0));
        let h1 = molecule.add_atom(Element::Hydrogen, Point3::new(0.96, 0.0, 0.0));
        let h2 = molecule.add_atom(Element::Hydrogen, Point3::new(-0.24, 0.93, 0.0));
        molecule.add_bond(o, h1).unwrap();
        molecule.add_bond(o, h2).unwrap();

        let forcefield = Forcefield::default();
        let evaluator = Evaluator::new(&forcefield);
        let first = evaluator.evaluate(&molecule).unwrap();
        let second = evaluator.evaluate(&molecule).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn evaluate_never_mutates_the_molecule() {
        let molecule = h2(1.0);
        let before = molecule.snapshot();
        let forcefield = Forcefield::default();
        Evaluator::new(&forcefield).evaluate(&molecule).unwrap();
        assert_eq!(molecule.snapshot(), before);
        assert_eq!(molecule.atom(molecule.atom_ids()[0]).unwrap().force, Vector3::zeros());
    }
}

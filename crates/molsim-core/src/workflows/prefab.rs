//! Ready-made example molecules with sensible starting geometries.

use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::f64::consts::PI;

/// A water molecule (H₂O) with both O–H bonds near their equilibrium length.
pub fn water() -> Molecule {
    let mut molecule = Molecule::new("Water");
    let o = molecule.add_atom(Element::Oxygen, Point3::new(0.0, 0.0, 0.0));
    let h1 = molecule.add_atom(Element::Hydrogen, Point3::new(0.96, 0.0, 0.0));
    let h2 = molecule.add_atom(Element::Hydrogen, Point3::new(-0.24, 0.93, 0.0));
    molecule.add_bond(o, h1).expect("fresh atoms cannot collide");
    molecule.add_bond(o, h2).expect("fresh atoms cannot collide");
    molecule
}

/// A methane molecule (CH₄): a central carbon with four tetrahedrally
/// arranged hydrogens at the standard C–H bond length.
pub fn methane() -> Molecule {
    const BOND: f64 = 1.09;
    let mut molecule = Molecule::new("Methane");
    let c = molecule.add_atom(Element::Carbon, Point3::new(0.0, 0.0, 0.0));

    // Vertices of a tetrahedron inscribed in a cube, scaled to the bond length.
    let s = BOND / 3.0f64.sqrt();
    for corner in [
        Point3::new(s, s, s),
        Point3::new(s, -s, -s),
        Point3::new(-s, s, -s),
        Point3::new(-s, -s, s),
    ] {
        let h = molecule.add_atom(Element::Hydrogen, corner);
        molecule.add_bond(c, h).expect("fresh atoms cannot collide");
    }
    molecule
}

/// A benzene molecule (C₆H₆): a planar hexagonal carbon ring with aromatic
/// ring bonds and one hydrogen per carbon pointing outward.
pub fn benzene() -> Molecule {
    const RING_RADIUS: f64 = 1.39;
    const CH_BOND: f64 = 1.09;

    let mut molecule = Molecule::new("Benzene");
    let mut carbons = Vec::with_capacity(6);
    for i in 0..6 {
        let angle = PI / 3.0 * i as f64;
        let c = molecule.add_atom(
            Element::Carbon,
            Point3::new(RING_RADIUS * angle.cos(), RING_RADIUS * angle.sin(), 0.0),
        );
        let h = molecule.add_atom(
            Element::Hydrogen,
            Point3::new(
                (RING_RADIUS + CH_BOND) * angle.cos(),
                (RING_RADIUS + CH_BOND) * angle.sin(),
                0.0,
            ),
        );
        molecule.add_bond(c, h).expect("fresh atoms cannot collide");
        carbons.push(c);
    }
    for i in 0..6 {
        molecule
            .add_bond_with_order(carbons[i], carbons[(i + 1) % 6], BondOrder::Aromatic)
            .expect("ring bonds connect distinct fresh atoms");
    }
    molecule
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_has_expected_composition_and_topology() {
        let molecule = water();
        assert_eq!(molecule.formula_string(), "H2O");
        assert_eq!(molecule.atom_count(), 3);
        assert_eq!(molecule.bond_count(), 2);
    }

    #[test]
    fn water_bonds_sit_near_equilibrium() {
        let molecule = water();
        let ids = molecule.atom_ids();
        let o = molecule.atom(ids[0]).unwrap().position;
        for &h_id in &ids[1..] {
            let h = molecule.atom(h_id).unwrap().position;
            assert!(((o - h).norm() - 0.96).abs() < 0.01);
        }
    }

    #[test]
    fn methane_is_a_symmetric_tetrahedron() {
        let molecule = methane();
        assert_eq!(molecule.formula_string(), "CH4");
        assert_eq!(molecule.bond_count(), 4);

        let ids = molecule.atom_ids();
        let c = molecule.atom(ids[0]).unwrap().position;
        for &h_id in &ids[1..] {
            let h = molecule.atom(h_id).unwrap().position;
            assert!(((c - h).norm() - 1.09).abs() < 1e-9);
        }
    }

    #[test]
    fn benzene_ring_is_closed_and_aromatic() {
        let molecule = benzene();
        assert_eq!(molecule.formula_string(), "C6H6");
        assert_eq!(molecule.atom_count(), 12);
        assert_eq!(molecule.bond_count(), 12);

        let aromatic = molecule
            .bonds_iter()
            .filter(|(_, bond)| bond.order == BondOrder::Aromatic)
            .count();
        assert_eq!(aromatic, 6);
    }
}

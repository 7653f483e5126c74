use crate::core::models::molecule::Molecule;
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Boltzmann constant in kcal/(mol·K), matching the kcal/mol energy scale
/// of the force field.
pub const BOLTZMANN: f64 = 0.001987204259;

/// Total kinetic energy, `Σ ½·m·v²`, in kcal/mol.
pub fn kinetic_energy(molecule: &Molecule) -> f64 {
    molecule
        .atoms_iter()
        .map(|(_, atom)| 0.5 * atom.mass() * atom.velocity.norm_squared())
        .sum()
}

/// Kinetic temperature from the equipartition relation
/// `KE = (3/2)·N·k_B·T`. Zero for an empty or motionless molecule.
pub fn instantaneous_temperature(molecule: &Molecule) -> f64 {
    let n = molecule.atom_count();
    if n == 0 {
        return 0.0;
    }
    2.0 * kinetic_energy(molecule) / (3.0 * n as f64 * BOLTZMANN)
}

/// Rescales every velocity by `sqrt(target / instantaneous)` so the kinetic
/// temperature lands exactly on `target`.
///
/// A motionless molecule has no temperature to rescale and is left alone.
pub fn rescale_to_temperature(molecule: &mut Molecule, target: f64) {
    let current = instantaneous_temperature(molecule);
    if current <= 0.0 {
        return;
    }
    let scale = (target / current).sqrt();
    for atom in molecule.atoms_iter_mut() {
        atom.velocity *= scale;
    }
}

/// Draws initial velocities from the Maxwell–Boltzmann distribution at
/// `temperature`, removes the net center-of-mass drift, then rescales so the
/// kinetic temperature matches the request exactly.
///
/// A non-positive temperature zeroes all velocities instead.
pub fn initialize_velocities<R: Rng>(molecule: &mut Molecule, temperature: f64, rng: &mut R) {
    if temperature <= 0.0 {
        for atom in molecule.atoms_iter_mut() {
            atom.velocity = Vector3::zeros();
        }
        return;
    }

    for atom in molecule.atoms_iter_mut() {
        let sigma = (BOLTZMANN * temperature / atom.mass()).sqrt();
        let normal = Normal::new(0.0, sigma).expect("sigma is finite and positive");
        atom.velocity = Vector3::new(
            normal.sample(rng),
            normal.sample(rng),
            normal.sample(rng),
        );
    }

    remove_drift(molecule);
    rescale_to_temperature(molecule, temperature);
}

/// Subtracts the center-of-mass velocity so the molecule as a whole stays put.
fn remove_drift(molecule: &mut Molecule) {
    let mut total_mass = 0.0;
    let mut total_momentum = Vector3::zeros();
    for (_, atom) in molecule.atoms_iter() {
        total_mass += atom.mass();
        total_momentum += atom.velocity * atom.mass();
    }
    if total_mass == 0.0 {
        return;
    }

    let drift = total_momentum / total_mass;
    for atom in molecule.atoms_iter_mut() {
        atom.velocity -= drift;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::element::Element;
    use nalgebra::Point3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn three_carbons() -> Molecule {
        let mut molecule = Molecule::new("Carbons");
        molecule.add_atom(Element::Carbon, Point3::new(0.0, 0.0, 0.0));
        molecule.add_atom(Element::Carbon, Point3::new(2.0, 0.0, 0.0));
        molecule.add_atom(Element::Carbon, Point3::new(0.0, 2.0, 0.0));
        molecule
    }

    #[test]
    fn kinetic_energy_of_motionless_molecule_is_zero() {
        let molecule = three_carbons();
        assert_eq!(kinetic_energy(&molecule), 0.0);
        assert_eq!(instantaneous_temperature(&molecule), 0.0);
    }

    #[test]
    fn kinetic_energy_sums_half_m_v_squared() {
        let mut molecule = three_carbons();
        let ids = molecule.atom_ids().to_vec();
        molecule.atom_mut(ids[0]).unwrap().velocity = Vector3::new(1.0, 0.0, 0.0);

        let expected = 0.5 * Element::Carbon.mass();
        assert!((kinetic_energy(&molecule) - expected).abs() < 1e-12);
    }

    #[test]
    fn temperature_and_kinetic_energy_satisfy_equipartition() {
        let mut molecule = three_carbons();
        let mut rng = StdRng::seed_from_u64(7);
        initialize_velocities(&mut molecule, 300.0, &mut rng);

        let ke = kinetic_energy(&molecule);
        let t = instantaneous_temperature(&molecule);
        assert!((ke - 1.5 * 3.0 * BOLTZMANN * t).abs() < 1e-12);
    }

    #[test]
    fn initialize_velocities_hits_the_target_temperature_exactly() {
        let mut molecule = three_carbons();
        let mut rng = StdRng::seed_from_u64(42);
        initialize_velocities(&mut molecule, 300.0, &mut rng);
        assert!((instantaneous_temperature(&molecule) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn initialize_velocities_leaves_no_net_momentum() {
        let mut molecule = three_carbons();
        let mut rng = StdRng::seed_from_u64(42);
        initialize_velocities(&mut molecule, 300.0, &mut rng);

        let mut momentum = Vector3::zeros();
        for (_, atom) in molecule.atoms_iter() {
            momentum += atom.velocity * atom.mass();
        }
        assert!(momentum.norm() < 1e-9);
    }

    #[test]
    fn initialize_velocities_at_zero_temperature_freezes_the_molecule() {
        let mut molecule = three_carbons();
        let mut rng = StdRng::seed_from_u64(42);
        initialize_velocities(&mut molecule, 300.0, &mut rng);
        initialize_velocities(&mut molecule, 0.0, &mut rng);
        assert_eq!(kinetic_energy(&molecule), 0.0);
    }

    #[test]
    fn rescale_moves_temperature_onto_target() {
        let mut molecule = three_carbons();
        let mut rng = StdRng::seed_from_u64(1);
        initialize_velocities(&mut molecule, 500.0, &mut rng);

        rescale_to_temperature(&mut molecule, 250.0);
        assert!((instantaneous_temperature(&molecule) - 250.0).abs() < 1e-9);
    }

    #[test]
    fn rescale_on_motionless_molecule_is_a_no_op() {
        let mut molecule = three_carbons();
        rescale_to_temperature(&mut molecule, 300.0);
        assert_eq!(kinetic_energy(&molecule), 0.0);
    }
}

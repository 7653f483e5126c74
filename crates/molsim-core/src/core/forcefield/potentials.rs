pub(crate) const COULOMB_CONSTANT: f64 = 332.0637; // In kcal·Å/(mol·e²)

#[inline]
pub fn harmonic_stretch(dist: f64, equilibrium: f64, stiffness: f64) -> f64 {
    let delta = dist - equilibrium;
    stiffness * delta * delta
}

#[inline]
pub fn harmonic_stretch_slope(dist: f64, equilibrium: f64, stiffness: f64) -> f64 {
    2.0 * stiffness * (dist - equilibrium)
}

#[inline]
pub fn lennard_jones_12_6(dist: f64, r_min: f64, well_depth: f64) -> f64 {
    let rho = r_min / dist;
    let rho6 = rho.powi(6);
    let rho12 = rho6 * rho6;
    well_depth * (rho12 - 2.0 * rho6)
}

#[inline]
pub fn lennard_jones_12_6_slope(dist: f64, r_min: f64, well_depth: f64) -> f64 {
    let rho = r_min / dist;
    let rho6 = rho.powi(6);
    let rho12 = rho6 * rho6;
    12.0 * well_depth * (rho6 - rho12) / dist
}

#[inline]
pub fn coulomb(dist: f64, q1: f64, q2: f64, dielectric: f64) -> f64 {
    COULOMB_CONSTANT * q1 * q2 / (dielectric * dist)
}

#[inline]
pub fn coulomb_slope(dist: f64, q1: f64, q2: f64, dielectric: f64) -> f64 {
    -COULOMB_CONSTANT * q1 * q2 / (dielectric * dist * dist)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn numerical_slope(f: impl Fn(f64) -> f64, x: f64) -> f64 {
        let h = 1e-6;
        (f(x + h) - f(x - h)) / (2.0 * h)
    }

    #[test]
    fn harmonic_stretch_is_zero_at_equilibrium() {
        assert_eq!(harmonic_stretch(0.74, 0.74, 300.0), 0.0);
        assert_eq!(harmonic_stretch_slope(0.74, 0.74, 300.0), 0.0);
    }

    #[test]
    fn harmonic_stretch_is_symmetric_about_equilibrium() {
        let compressed = harmonic_stretch(0.9, 1.0, 100.0);
        let stretched = harmonic_stretch(1.1, 1.0, 100.0);
        assert!(f64_approx_equal(compressed, stretched));
        assert!(f64_approx_equal(compressed, 1.0));
    }

    #[test]
    fn harmonic_stretch_slope_matches_numerical_derivative() {
        let analytic = harmonic_stretch_slope(1.3, 1.0, 250.0);
        let numeric = numerical_slope(|d| harmonic_stretch(d, 1.0, 250.0), 1.3);
        assert!((analytic - numeric).abs() < 1e-4);
    }

    #[test]
    fn lennard_jones_at_minimum_distance_returns_negative_well_depth() {
        let energy = lennard_jones_12_6(2.0, 2.0, 10.0);
        assert!(f64_approx_equal(energy, -10.0));
    }

    #[test]
    fn lennard_jones_slope_is_zero_at_the_minimum() {
        assert!(lennard_jones_12_6_slope(2.0, 2.0, 10.0).abs() < TOLERANCE);
    }

    #[test]
    fn lennard_jones_slope_matches_numerical_derivative() {
        for dist in [1.5, 2.0, 2.5, 4.0] {
            let analytic = lennard_jones_12_6_slope(dist, 2.0, 0.5);
            let numeric = numerical_slope(|d| lennard_jones_12_6(d, 2.0, 0.5), dist);
            assert!(
                (analytic - numeric).abs() < 1e-4,
                "slope mismatch at dist={dist}: {analytic} vs {numeric}"
            );
        }
    }

    #[test]
    fn lennard_jones_is_repulsive_inside_and_attractive_outside_the_minimum() {
        assert!(lennard_jones_12_6_slope(1.2, 2.0, 1.0) < 0.0); // energy falls as atoms separate
        assert!(lennard_jones_12_6_slope(3.0, 2.0, 1.0) > 0.0); // energy rises toward zero
    }

    #[test]
    fn coulomb_calculates_repulsive_energy_for_like_charges() {
        let energy = coulomb(1.0, 1.0, 1.0, 1.0);
        assert!(f64_approx_equal(energy, COULOMB_CONSTANT));
    }

    #[test]
    fn coulomb_calculates_attractive_energy_for_opposite_charges() {
        let energy = coulomb(2.0, 1.0, -1.0, 1.0);
        assert!(f64_approx_equal(energy, -COULOMB_CONSTANT / 2.0));
    }

    #[test]
    fn coulomb_slope_matches_numerical_derivative() {
        let analytic = coulomb_slope(1.5, 0.4, -0.8, 1.0);
        let numeric = numerical_slope(|d| coulomb(d, 0.4, -0.8, 1.0), 1.5);
        assert!((analytic - numeric).abs() < 1e-4);
    }

    #[test]
    fn dielectric_scales_coulomb_energy_down() {
        let vacuum = coulomb(1.0, 1.0, 1.0, 1.0);
        let screened = coulomb(1.0, 1.0, 1.0, 80.0);
        assert!(f64_approx_equal(screened, vacuum / 80.0));
    }
}

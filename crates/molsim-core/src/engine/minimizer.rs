use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::forcefield::evaluator::Evaluator;
use crate::core::forcefield::params::Forcefield;
use crate::core::models::ids::AtomId;
use crate::core::models::molecule::Molecule;
use nalgebra::{Point3, Vector3};
use std::fmt;
use tracing::{debug, info, instrument, trace};

/// Descent strategies for the minimizer. There is no implied default: the
/// constructor requires a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimizationAlgorithm {
    /// Displace straight along the force (negative gradient).
    SteepestDescent,
    /// Polak–Ribière conjugate directions, reset to steepest descent
    /// whenever the blend stops pointing downhill.
    ConjugateGradient,
}

impl fmt::Display for MinimizationAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MinimizationAlgorithm::SteepestDescent => "SteepestDescent",
            MinimizationAlgorithm::ConjugateGradient => "ConjugateGradient",
        };
        write!(f, "{name}")
    }
}

/// Lifecycle of a minimizer session:
/// `Idle → Iterating → {Converged, MaxIterationsReached, Diverged}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimizerPhase {
    Idle,
    Iterating,
    Converged,
    MaxIterationsReached,
    Diverged,
}

impl fmt::Display for MinimizerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MinimizerPhase::Idle => "Idle",
            MinimizerPhase::Iterating => "Iterating",
            MinimizerPhase::Converged => "Converged",
            MinimizerPhase::MaxIterationsReached => "MaxIterationsReached",
            MinimizerPhase::Diverged => "Diverged",
        };
        write!(f, "{name}")
    }
}

/// How a minimization ended. Failing to converge is an expected outcome the
/// caller inspects, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimizationOutcome {
    /// The maximum per-atom force norm fell below the tolerance.
    Converged,
    /// The iteration cap was reached with the forces still above tolerance.
    MaxIterationsReached,
    /// The energy or a position turned non-finite, or two atoms collapsed
    /// below the minimum-distance floor.
    Diverged,
}

impl fmt::Display for MinimizationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MinimizationOutcome::Converged => "Converged",
            MinimizationOutcome::MaxIterationsReached => "MaxIterationsReached",
            MinimizationOutcome::Diverged => "Diverged",
        };
        write!(f, "{name}")
    }
}

/// Full account of one minimization: terminal outcome plus the numbers a
/// caller needs to judge it. Caps and divergences are reported here, never
/// silently truncated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizationReport {
    pub outcome: MinimizationOutcome,
    pub iterations: u64,
    pub initial_energy: f64,
    pub final_energy: f64,
    /// Maximum per-atom force norm at termination.
    pub max_force: f64,
}

// Line-search tuning shared by both algorithms.
const MAX_STEP_RETRIES: u32 = 12;
const STEP_SHRINK: f64 = 0.5;
const STEP_GROWTH: f64 = 1.2;

/// A static energy-minimization session: descends the potential-energy
/// surface of a borrowed molecule to a stationary point.
///
/// Like the MD session, the minimizer never owns its molecule and a molecule
/// can be worked on by at most one session at a time (enforced by the
/// mutable borrow).
pub struct EnergyMinimizer {
    algorithm: MinimizationAlgorithm,
    tolerance: f64,
    max_iterations: u64,
    initial_step: f64,
    phase: MinimizerPhase,
}

impl EnergyMinimizer {
    /// Creates an idle session using the given descent algorithm, a force
    /// tolerance of `1e-4`, an iteration cap of `500`, and an initial step
    /// scale of `0.01`.
    pub fn new(algorithm: MinimizationAlgorithm) -> Self {
        Self {
            algorithm,
            tolerance: 1e-4,
            max_iterations: 500,
            initial_step: 0.01,
            phase: MinimizerPhase::Idle,
        }
    }

    pub fn algorithm(&self) -> MinimizationAlgorithm {
        self.algorithm
    }

    pub fn phase(&self) -> MinimizerPhase {
        self.phase
    }

    /// Switches the descent algorithm. Valid only while `Idle`.
    pub fn set_algorithm(&mut self, algorithm: MinimizationAlgorithm) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.algorithm = algorithm;
        Ok(())
    }

    /// Sets the convergence tolerance on the maximum per-atom force norm.
    /// Valid only while `Idle`.
    pub fn set_tolerance(&mut self, tolerance: f64) -> Result<(), EngineError> {
        self.ensure_idle()?;
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(EngineError::InvalidTolerance(tolerance));
        }
        self.tolerance = tolerance;
        Ok(())
    }

    /// Sets the iteration cap. Valid only while `Idle`.
    pub fn set_max_iterations(&mut self, max_iterations: u64) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.max_iterations = max_iterations;
        Ok(())
    }

    /// Sets the initial displacement scale of the adaptive line search.
    /// Valid only while `Idle`.
    pub fn set_initial_step(&mut self, initial_step: f64) -> Result<(), EngineError> {
        self.ensure_idle()?;
        if !initial_step.is_finite() || initial_step <= 0.0 {
            return Err(EngineError::InvalidStepSize(initial_step));
        }
        self.initial_step = initial_step;
        Ok(())
    }

    /// Returns a terminal session to `Idle`.
    pub fn reset(&mut self) {
        self.phase = MinimizerPhase::Idle;
    }

    fn ensure_idle(&self) -> Result<(), EngineError> {
        if self.phase != MinimizerPhase::Idle {
            return Err(EngineError::SessionBusy {
                state: self.phase.to_string(),
            });
        }
        Ok(())
    }

    /// Descends the molecule's potential-energy surface until the maximum
    /// per-atom force norm falls below the tolerance, the iteration cap is
    /// hit, or the geometry diverges.
    ///
    /// Each iteration proposes a displacement along the descent direction
    /// scaled by an adaptive step: accepted moves must strictly decrease the
    /// energy, rejected moves halve the step and retry (bounded per
    /// iteration). The molecule is left at the best geometry found.
    ///
    /// # Errors
    ///
    /// Returns an error without touching the molecule when the session is
    /// not idle, the molecule is empty, or the force field is missing
    /// parameters. Divergence and hitting the iteration cap are reported in
    /// the returned [`MinimizationReport`], not as errors.
    #[instrument(skip_all, name = "minimize", fields(algorithm = %self.algorithm, atoms = molecule.atom_count()))]
    pub fn minimize(
        &mut self,
        molecule: &mut Molecule,
        forcefield: &Forcefield,
        reporter: &ProgressReporter,
    ) -> Result<MinimizationReport, EngineError> {
        self.ensure_idle()?;
        if molecule.atom_count() == 0 {
            return Err(EngineError::EmptyMolecule);
        }

        let evaluator = Evaluator::new(forcefield);
        let ids: Vec<AtomId> = molecule.atom_ids().to_vec();

        // The first evaluation happens before any motion, so parameter
        // problems abort cleanly while geometry problems are a divergence.
        let mut current = match evaluator.evaluate(molecule) {
            Ok(evaluation) => evaluation,
            Err(error) if error.is_divergence() => {
                self.phase = MinimizerPhase::Diverged;
                return Ok(self.report(MinimizationOutcome::Diverged, 0, f64::NAN, f64::NAN, f64::NAN));
            }
            Err(error) => return Err(error.into()),
        };

        self.phase = MinimizerPhase::Iterating;
        let initial_energy = current.energy.total();
        let mut energy = initial_energy;
        let mut step = self.initial_step;
        let mut previous_forces = current.forces.clone();
        let mut direction = current.forces.clone();

        info!(
            initial_energy,
            tolerance = self.tolerance,
            "starting minimization"
        );
        reporter.report(Progress::RunStart {
            total_steps: self.max_iterations,
        });

        let mut iterations = 0;
        while iterations < self.max_iterations {
            let max_force = current.max_force_norm();
            if max_force < self.tolerance {
                self.phase = MinimizerPhase::Converged;
                reporter.report(Progress::RunFinish);
                info!(iterations, final_energy = energy, "converged");
                return Ok(self.report(
                    MinimizationOutcome::Converged,
                    iterations,
                    initial_energy,
                    energy,
                    max_force,
                ));
            }

            direction = self.descent_direction(&current.forces, &previous_forces, &direction, iterations);

            // Adaptive backtracking line search along the chosen direction.
            let saved: Vec<Point3<f64>> = ids
                .iter()
                .filter_map(|&id| molecule.atom(id).map(|atom| atom.position))
                .collect();
            let mut accepted = false;
            for _ in 0..MAX_STEP_RETRIES {
                for (&id, delta) in ids.iter().zip(&direction) {
                    if let Some(atom) = molecule.atom_mut(id) {
                        atom.position += delta * step;
                    }
                }

                match evaluator.evaluate(molecule) {
                    Ok(trial) => {
                        let trial_energy = trial.energy.total();
                        if trial_energy.is_finite() && trial_energy < energy {
                            previous_forces = std::mem::take(&mut current.forces);
                            current = trial;
                            energy = trial_energy;
                            step *= STEP_GROWTH;
                            accepted = true;
                            break;
                        }
                    }
                    Err(error) if error.is_divergence() => {
                        trace!(%error, "trial step diverged; backtracking");
                    }
                    Err(error) => {
                        restore_positions(molecule, &ids, &saved);
                        self.phase = MinimizerPhase::Idle;
                        return Err(error.into());
                    }
                }

                restore_positions(molecule, &ids, &saved);
                step *= STEP_SHRINK;
            }

            if !accepted {
                debug!(
                    iteration = iterations,
                    step, "line search exhausted its retry budget"
                );
            }

            iterations += 1;
            reporter.report(Progress::StepDone);
        }

        self.phase = MinimizerPhase::MaxIterationsReached;
        reporter.report(Progress::RunFinish);
        let max_force = current.max_force_norm();
        info!(iterations, max_force, "iteration cap reached before convergence");
        Ok(self.report(
            MinimizationOutcome::MaxIterationsReached,
            iterations,
            initial_energy,
            energy,
            max_force,
        ))
    }

    /// Picks the descent direction for this iteration.
    ///
    /// Steepest descent follows the forces directly. Conjugate gradient
    /// blends in the previous direction with a Polak–Ribière coefficient,
    /// restarting on the first iteration and whenever the blended direction
    /// stops being a descent direction.
    fn descent_direction(
        &self,
        forces: &[Vector3<f64>],
        previous_forces: &[Vector3<f64>],
        previous_direction: &[Vector3<f64>],
        iteration: u64,
    ) -> Vec<Vector3<f64>> {
        match self.algorithm {
            MinimizationAlgorithm::SteepestDescent => forces.to_vec(),
            MinimizationAlgorithm::ConjugateGradient => {
                if iteration == 0 {
                    return forces.to_vec();
                }
                let previous_norm_sq: f64 =
                    previous_forces.iter().map(|f| f.norm_squared()).sum();
                if previous_norm_sq <= f64::EPSILON {
                    return forces.to_vec();
                }
                let beta: f64 = forces
                    .iter()
                    .zip(previous_forces)
                    .map(|(f, f_prev)| f.dot(&(f - f_prev)))
                    .sum::<f64>()
                    / previous_norm_sq;
                let beta = beta.max(0.0);

                let blended: Vec<Vector3<f64>> = forces
                    .iter()
                    .zip(previous_direction)
                    .map(|(f, d)| f + d * beta)
                    .collect();

                // A conjugate direction must still point downhill.
                let downhill: f64 = blended
                    .iter()
                    .zip(forces)
                    .map(|(d, f)| d.dot(f))
                    .sum();
                if downhill > 0.0 { blended } else { forces.to_vec() }
            }
        }
    }

    fn report(
        &self,
        outcome: MinimizationOutcome,
        iterations: u64,
        initial_energy: f64,
        final_energy: f64,
        max_force: f64,
    ) -> MinimizationReport {
        MinimizationReport {
            outcome,
            iterations,
            initial_energy,
            final_energy,
            max_force,
        }
    }
}

fn restore_positions(molecule: &mut Molecule, ids: &[AtomId], saved: &[Point3<f64>]) {
    for (&id, &position) in ids.iter().zip(saved) {
        if let Some(atom) = molecule.atom_mut(id) {
            atom.position = position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::element::Element;
    use nalgebra::Point3;

    fn stretched_h2() -> Molecule {
        let mut molecule = Molecule::new("Hydrogen");
        let a = molecule.add_atom(Element::Hydrogen, Point3::origin());
        let b = molecule.add_atom(Element::Hydrogen, Point3::new(1.0, 0.0, 0.0));
        molecule.add_bond(a, b).unwrap();
        molecule
    }

    fn separation(molecule: &Molecule) -> f64 {
        let ids = molecule.atom_ids();
        (molecule.atom(ids[0]).unwrap().position - molecule.atom(ids[1]).unwrap().position).norm()
    }

    #[test]
    fn steepest_descent_relaxes_h2_to_equilibrium_length() {
        let mut molecule = stretched_h2();
        let mut minimizer = EnergyMinimizer::new(MinimizationAlgorithm::SteepestDescent);
        minimizer.set_tolerance(1e-4).unwrap();

        let report = minimizer
            .minimize(
                &mut molecule,
                &Forcefield::bonded_only(),
                &ProgressReporter::new(),
            )
            .unwrap();

        assert_eq!(report.outcome, MinimizationOutcome::Converged);
        assert_eq!(minimizer.phase(), MinimizerPhase::Converged);
        assert!((separation(&molecule) - 0.74).abs() < 1e-3);
        assert!(report.final_energy < report.initial_energy);
        assert!(report.max_force < 1e-4);
        assert!(report.iterations > 0);
    }

    #[test]
    fn conjugate_gradient_relaxes_h2_to_equilibrium_length() {
        let mut molecule = stretched_h2();
        let mut minimizer = EnergyMinimizer::new(MinimizationAlgorithm::ConjugateGradient);
        minimizer.set_tolerance(1e-4).unwrap();

        let report = minimizer
            .minimize(
                &mut molecule,
                &Forcefield::bonded_only(),
                &ProgressReporter::new(),
            )
            .unwrap();

        assert_eq!(report.outcome, MinimizationOutcome::Converged);
        assert!((separation(&molecule) - 0.74).abs() < 1e-3);
    }

    #[test]
    fn minimizing_water_lowers_the_energy_of_a_distorted_geometry() {
        let mut molecule = Molecule::new("Water");
        let o = molecule.add_atom(Element::Oxygen, Point3::new(0.0, 0.0, 0.0));
        let h1 = molecule.add_atom(Element::Hydrogen, Point3::new(1.3, 0.0, 0.0));
        let h2 = molecule.add_atom(Element::Hydrogen, Point3::new(-0.4, 1.2, 0.0));
        molecule.add_bond(o, h1).unwrap();
        molecule.add_bond(o, h2).unwrap();

        let forcefield = Forcefield::default();
        let before = molecule.total_energy(&forcefield).unwrap();

        let mut minimizer = EnergyMinimizer::new(MinimizationAlgorithm::ConjugateGradient);
        minimizer.set_max_iterations(2000).unwrap();
        let report = minimizer
            .minimize(&mut molecule, &forcefield, &ProgressReporter::new())
            .unwrap();

        assert!(report.final_energy < before);
        assert!(matches!(
            report.outcome,
            MinimizationOutcome::Converged | MinimizationOutcome::MaxIterationsReached
        ));
    }

    #[test]
    fn iteration_cap_is_reported_not_silently_truncated() {
        let mut molecule = stretched_h2();
        let mut minimizer = EnergyMinimizer::new(MinimizationAlgorithm::SteepestDescent);
        minimizer.set_max_iterations(2).unwrap();
        minimizer.set_tolerance(1e-12).unwrap();

        let report = minimizer
            .minimize(
                &mut molecule,
                &Forcefield::bonded_only(),
                &ProgressReporter::new(),
            )
            .unwrap();

        assert_eq!(report.outcome, MinimizationOutcome::MaxIterationsReached);
        assert_eq!(report.iterations, 2);
        assert_eq!(minimizer.phase(), MinimizerPhase::MaxIterationsReached);
        assert!(report.max_force > 0.0);
    }

    #[test]
    fn already_converged_geometry_returns_immediately() {
        let mut molecule = Molecule::new("Hydrogen");
        let a = molecule.add_atom(Element::Hydrogen, Point3::origin());
        let b = molecule.add_atom(Element::Hydrogen, Point3::new(0.74, 0.0, 0.0));
        molecule.add_bond(a, b).unwrap();

        let mut minimizer = EnergyMinimizer::new(MinimizationAlgorithm::SteepestDescent);
        let report = minimizer
            .minimize(
                &mut molecule,
                &Forcefield::bonded_only(),
                &ProgressReporter::new(),
            )
            .unwrap();

        assert_eq!(report.outcome, MinimizationOutcome::Converged);
        assert_eq!(report.iterations, 0);
        assert_eq!(separation(&molecule), 0.74);
    }

    #[test]
    fn coincident_atoms_report_divergence() {
        let mut molecule = Molecule::new("Broken");
        molecule.add_atom(Element::Hydrogen, Point3::origin());
        molecule.add_atom(Element::Hydrogen, Point3::origin());

        let mut minimizer = EnergyMinimizer::new(MinimizationAlgorithm::SteepestDescent);
        let report = minimizer
            .minimize(
                &mut molecule,
                &Forcefield::default(),
                &ProgressReporter::new(),
            )
            .unwrap();

        assert_eq!(report.outcome, MinimizationOutcome::Diverged);
        assert_eq!(minimizer.phase(), MinimizerPhase::Diverged);
    }

    #[test]
    fn settings_are_rejected_outside_idle_until_reset() {
        let mut molecule = stretched_h2();
        let mut minimizer = EnergyMinimizer::new(MinimizationAlgorithm::SteepestDescent);
        minimizer
            .minimize(
                &mut molecule,
                &Forcefield::bonded_only(),
                &ProgressReporter::new(),
            )
            .unwrap();

        assert!(matches!(
            minimizer.set_algorithm(MinimizationAlgorithm::ConjugateGradient),
            Err(EngineError::SessionBusy { .. })
        ));
        assert!(matches!(
            minimizer.set_tolerance(1e-3),
            Err(EngineError::SessionBusy { .. })
        ));

        minimizer.reset();
        assert!(minimizer.set_algorithm(MinimizationAlgorithm::ConjugateGradient).is_ok());
        assert_eq!(minimizer.algorithm(), MinimizationAlgorithm::ConjugateGradient);
    }

    #[test]
    fn invalid_settings_are_rejected_with_specific_errors() {
        let mut minimizer = EnergyMinimizer::new(MinimizationAlgorithm::SteepestDescent);
        assert!(matches!(
            minimizer.set_tolerance(0.0),
            Err(EngineError::InvalidTolerance(_))
        ));
        assert!(matches!(
            minimizer.set_tolerance(f64::NAN),
            Err(EngineError::InvalidTolerance(_))
        ));
        assert!(matches!(
            minimizer.set_initial_step(-0.1),
            Err(EngineError::InvalidStepSize(_))
        ));
    }

    #[test]
    fn empty_molecule_is_an_error() {
        let mut molecule = Molecule::new("Empty");
        let mut minimizer = EnergyMinimizer::new(MinimizationAlgorithm::SteepestDescent);
        let result = minimizer.minimize(
            &mut molecule,
            &Forcefield::default(),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::EmptyMolecule)));
        assert_eq!(minimizer.phase(), MinimizerPhase::Idle);
    }
}

//! High-level entry points tying the engine sessions together for hosts
//! (CLI, embeddings) that want a one-call simulation or minimization.

use crate::core::forcefield::params::Forcefield;
use crate::core::models::molecule::Molecule;
use crate::engine::dynamics::{MdConfig, MdPhase, MdStatistics, MolecularDynamics};
use crate::engine::error::EngineError;
use crate::engine::minimizer::{EnergyMinimizer, MinimizationAlgorithm, MinimizationReport};
use crate::engine::progress::ProgressReporter;
use crate::engine::thermo;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, instrument};

/// Parameters for one dynamics run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsRun {
    pub config: MdConfig,
    pub steps: u64,
    /// When set, velocities are drawn from a Maxwell–Boltzmann distribution
    /// at this temperature before the run, using `seed`.
    pub initial_temperature: Option<f64>,
    pub seed: u64,
}

impl Default for DynamicsRun {
    fn default() -> Self {
        Self {
            config: MdConfig::default(),
            steps: 1000,
            initial_temperature: None,
            seed: 0,
        }
    }
}

/// Parameters for one minimization run. The algorithm is a deliberate
/// required choice; the numeric fields mirror the session defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizationRun {
    pub algorithm: MinimizationAlgorithm,
    pub tolerance: f64,
    pub max_iterations: u64,
    pub initial_step: f64,
}

impl MinimizationRun {
    pub fn new(algorithm: MinimizationAlgorithm) -> Self {
        Self {
            algorithm,
            tolerance: 1e-4,
            max_iterations: 500,
            initial_step: 0.01,
        }
    }
}

/// Runs molecular dynamics over the molecule and returns the terminal phase
/// with the full energy history.
///
/// # Errors
///
/// Propagates session configuration and parameterization errors; divergence
/// and cancellation are terminal phases in the result, not errors.
#[instrument(skip_all, name = "dynamics_workflow", fields(steps = run.steps))]
pub fn run_dynamics(
    molecule: &mut Molecule,
    forcefield: &Forcefield,
    run: &DynamicsRun,
    reporter: &ProgressReporter,
) -> Result<(MdPhase, MdStatistics), EngineError> {
    if let Some(temperature) = run.initial_temperature {
        info!(temperature, seed = run.seed, "initializing velocities");
        let mut rng = StdRng::seed_from_u64(run.seed);
        thermo::initialize_velocities(molecule, temperature, &mut rng);
    }

    let mut session = MolecularDynamics::new();
    session.configure(run.config)?;
    let phase = session.run(molecule, forcefield, run.steps, reporter)?;
    Ok((phase, session.statistics()))
}

/// Minimizes the molecule's energy and returns the full report.
///
/// # Errors
///
/// Propagates session configuration and parameterization errors; failing to
/// converge is reported in the [`MinimizationReport`], not as an error.
#[instrument(skip_all, name = "minimization_workflow", fields(algorithm = %run.algorithm))]
pub fn minimize(
    molecule: &mut Molecule,
    forcefield: &Forcefield,
    run: &MinimizationRun,
    reporter: &ProgressReporter,
) -> Result<MinimizationReport, EngineError> {
    let mut session = EnergyMinimizer::new(run.algorithm);
    session.set_tolerance(run.tolerance)?;
    session.set_max_iterations(run.max_iterations)?;
    session.set_initial_step(run.initial_step)?;
    session.minimize(molecule, forcefield, reporter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::minimizer::MinimizationOutcome;
    use crate::workflows::prefab;

    #[test]
    fn run_dynamics_with_seeded_velocities_is_reproducible() {
        let forcefield = Forcefield::bonded_only();
        let run = DynamicsRun {
            steps: 25,
            initial_temperature: Some(300.0),
            seed: 11,
            ..DynamicsRun::default()
        };

        let mut first = prefab::water();
        let (phase1, stats1) =
            run_dynamics(&mut first, &forcefield, &run, &ProgressReporter::new()).unwrap();
        let mut second = prefab::water();
        let (phase2, stats2) =
            run_dynamics(&mut second, &forcefield, &run, &ProgressReporter::new()).unwrap();

        assert_eq!(phase1, MdPhase::Completed);
        assert_eq!(phase1, phase2);
        assert_eq!(stats1, stats2);
    }

    #[test]
    fn minimize_workflow_relaxes_a_prefab_molecule() {
        let mut molecule = prefab::methane();
        let forcefield = Forcefield::default();
        let run = MinimizationRun {
            max_iterations: 2000,
            ..MinimizationRun::new(MinimizationAlgorithm::SteepestDescent)
        };

        let report = minimize(
            &mut molecule,
            &forcefield,
            &run,
            &ProgressReporter::new(),
        )
        .unwrap();
        assert!(report.final_energy <= report.initial_energy);
        assert!(matches!(
            report.outcome,
            MinimizationOutcome::Converged | MinimizationOutcome::MaxIterationsReached
        ));
    }

    #[test]
    fn invalid_config_surfaces_as_an_engine_error() {
        let mut molecule = prefab::water();
        let run = DynamicsRun {
            config: MdConfig {
                timestep: -1.0,
                ..MdConfig::default()
            },
            ..DynamicsRun::default()
        };
        let result = run_dynamics(
            &mut molecule,
            &Forcefield::default(),
            &run,
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::InvalidTimeStep(_))));
    }
}

use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::thermo;
use crate::core::forcefield::evaluator::Evaluator;
use crate::core::forcefield::params::Forcefield;
use crate::core::models::molecule::Molecule;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, trace};

/// Lifecycle of an MD session: `Idle → Running → {Completed, Diverged,
/// Cancelled}`. Terminal states stay inspectable until `reset()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdPhase {
    Idle,
    Running,
    Completed,
    Diverged,
    Cancelled,
}

impl MdPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MdPhase::Completed | MdPhase::Diverged | MdPhase::Cancelled
        )
    }
}

impl fmt::Display for MdPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MdPhase::Idle => "Idle",
            MdPhase::Running => "Running",
            MdPhase::Completed => "Completed",
            MdPhase::Diverged => "Diverged",
            MdPhase::Cancelled => "Cancelled",
        };
        write!(f, "{name}")
    }
}

/// Integration parameters for one MD session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MdConfig {
    /// Integration time step; must be finite and positive.
    pub timestep: f64,
    /// Thermostat target temperature in Kelvin; 0 disables the thermostat.
    pub target_temperature: f64,
    /// Velocity-rescale cadence in steps: 1 rescales after every step (the
    /// default), N rescales after every Nth. The cadence is always this
    /// field's explicit choice.
    pub thermostat_interval: u64,
}

impl Default for MdConfig {
    fn default() -> Self {
        Self {
            timestep: 1e-3,
            target_temperature: 0.0,
            thermostat_interval: 1,
        }
    }
}

/// One `(kinetic, potential)` energy record, appended per integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySample {
    pub kinetic: f64,
    pub potential: f64,
}

impl EnergySample {
    pub fn total(&self) -> f64 {
        self.kinetic + self.potential
    }
}

/// Read-only snapshot of a session's accounting, valid in any state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MdStatistics {
    pub step_count: u64,
    pub energy_history: Vec<EnergySample>,
}

/// Cloneable handle that requests cancellation of a running session.
///
/// Cancellation is sampled once per integration step, never pre-emptively,
/// so the molecule is always left at a step boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// A molecular-dynamics session: repeatedly evaluates the force field and
/// advances a borrowed molecule's kinematics, with optional velocity-rescale
/// temperature control.
///
/// The session borrows its molecule only for the duration of [`run`](Self::run);
/// it never owns one. A molecule must not be shared between two live
/// sessions — the mutable borrow enforces that single-writer discipline at
/// compile time.
pub struct MolecularDynamics {
    config: MdConfig,
    phase: MdPhase,
    step_count: u64,
    energy_history: Vec<EnergySample>,
    cancel: CancelHandle,
}

impl Default for MolecularDynamics {
    fn default() -> Self {
        Self::new()
    }
}

impl MolecularDynamics {
    /// Creates an idle session with [`MdConfig::default`] parameters.
    pub fn new() -> Self {
        Self {
            config: MdConfig::default(),
            phase: MdPhase::Idle,
            step_count: 0,
            energy_history: Vec::new(),
            cancel: CancelHandle::default(),
        }
    }

    /// Sets the integration parameters. Valid only while `Idle`.
    ///
    /// # Errors
    ///
    /// Rejects non-idle sessions and out-of-range parameters.
    pub fn configure(&mut self, config: MdConfig) -> Result<(), EngineError> {
        if self.phase != MdPhase::Idle {
            return Err(EngineError::SessionBusy {
                state: self.phase.to_string(),
            });
        }
        if !config.timestep.is_finite() || config.timestep <= 0.0 {
            return Err(EngineError::InvalidTimeStep(config.timestep));
        }
        if !config.target_temperature.is_finite() || config.target_temperature < 0.0 {
            return Err(EngineError::InvalidTemperature(config.target_temperature));
        }
        if config.thermostat_interval == 0 {
            return Err(EngineError::InvalidThermostatInterval);
        }
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &MdConfig {
        &self.config
    }

    pub fn phase(&self) -> MdPhase {
        self.phase
    }

    /// A handle for cancelling the next `run` between steps.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Read-only snapshot of step count and energy history; valid in any state.
    pub fn statistics(&self) -> MdStatistics {
        MdStatistics {
            step_count: self.step_count,
            energy_history: self.energy_history.clone(),
        }
    }

    /// Returns a terminal (or idle) session to `Idle`, clearing history and
    /// any pending cancellation.
    pub fn reset(&mut self) {
        self.phase = MdPhase::Idle;
        self.step_count = 0;
        self.energy_history.clear();
        self.cancel.clear();
    }

    /// Runs `steps` integration steps over the molecule, blocking the
    /// calling thread until a terminal phase is reached.
    ///
    /// Each step: sampled cancellation check, force-field evaluation, force
    /// application, a staged symplectic-Euler commit (every atom's new state
    /// is validated finite before any atom is written, so divergence leaves
    /// the molecule at its last valid step and each position/velocity pair
    /// updates as one unit), then — when a target temperature is set — a
    /// velocity rescale every `thermostat_interval` steps, and an energy
    /// history record.
    ///
    /// # Errors
    ///
    /// Returns an error without touching the molecule when the session is
    /// not idle, the molecule is empty, or the force field is missing
    /// parameters. Divergence is not an error: the session stops early in
    /// the `Diverged` phase and the statistics stay inspectable.
    #[instrument(skip_all, name = "md_run", fields(steps = steps, atoms = molecule.atom_count()))]
    pub fn run(
        &mut self,
        molecule: &mut Molecule,
        forcefield: &Forcefield,
        steps: u64,
        reporter: &ProgressReporter,
    ) -> Result<MdPhase, EngineError> {
        if self.phase != MdPhase::Idle {
            return Err(EngineError::SessionBusy {
                state: self.phase.to_string(),
            });
        }
        if molecule.atom_count() == 0 {
            return Err(EngineError::EmptyMolecule);
        }

        let evaluator = Evaluator::new(forcefield);
        self.phase = MdPhase::Running;
        info!(
            timestep = self.config.timestep,
            target_temperature = self.config.target_temperature,
            "starting dynamics run"
        );
        reporter.report(Progress::RunStart { total_steps: steps });

        for step in 0..steps {
            if self.cancel.is_cancelled() {
                info!(completed_steps = step, "run cancelled between steps");
                self.phase = MdPhase::Cancelled;
                break;
            }

            let evaluation = match evaluator.evaluate(molecule) {
                Ok(evaluation) => evaluation,
                Err(error) if error.is_divergence() => {
                    debug!(%error, "force evaluation diverged");
                    self.phase = MdPhase::Diverged;
                    break;
                }
                Err(error) => {
                    // Parameter coverage does not depend on geometry, so this
                    // can only happen before the first step has moved anything.
                    self.phase = MdPhase::Idle;
                    return Err(error.into());
                }
            };
            let potential = evaluation.energy.total();

            for (id, force) in molecule.atom_ids().to_vec().iter().zip(&evaluation.forces) {
                if let Some(atom) = molecule.atom_mut(*id) {
                    atom.apply_force(*force);
                }
            }

            if !self.integrate_step(molecule) {
                self.phase = MdPhase::Diverged;
                break;
            }

            if self.config.target_temperature > 0.0
                && (self.step_count + 1) % self.config.thermostat_interval == 0
            {
                thermo::rescale_to_temperature(molecule, self.config.target_temperature);
            }

            self.step_count += 1;
            self.energy_history.push(EnergySample {
                kinetic: thermo::kinetic_energy(molecule),
                potential,
            });
            trace!(step = self.step_count, potential, "step complete");
            reporter.report(Progress::StepDone);
        }

        if self.phase == MdPhase::Running {
            self.phase = MdPhase::Completed;
        }
        reporter.report(Progress::RunFinish);
        info!(phase = %self.phase, steps = self.step_count, "dynamics run finished");
        Ok(self.phase)
    }

    /// Advances every atom by one time step, or advances nothing at all.
    ///
    /// Proposed states are computed first and committed only if every one of
    /// them is finite; the accumulated forces are cleared on commit and kept
    /// on divergence for post-mortem inspection.
    fn integrate_step(&self, molecule: &mut Molecule) -> bool {
        let dt = self.config.timestep;
        let ids = molecule.atom_ids().to_vec();
        let proposed: Vec<_> = molecule
            .atoms_iter()
            .map(|(_, atom)| atom.advanced(dt))
            .collect();

        let all_finite = proposed.iter().all(|(velocity, position)| {
            velocity.iter().all(|v| v.is_finite()) && position.iter().all(|p| p.is_finite())
        });
        if !all_finite {
            return false;
        }

        for (&id, (velocity, position)) in ids.iter().zip(proposed) {
            if let Some(atom) = molecule.atom_mut(id) {
                atom.velocity = velocity;
                atom.position = position;
                atom.force = nalgebra::Vector3::zeros();
            }
        }
        true
    }
}

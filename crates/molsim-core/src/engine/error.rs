use crate::core::forcefield::evaluator::EvaluationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Session is not idle (current state: {state}); call reset() before reconfiguring")]
    SessionBusy { state: String },

    #[error("Time step must be finite and positive (got {0})")]
    InvalidTimeStep(f64),

    #[error("Target temperature must be finite and non-negative (got {0})")]
    InvalidTemperature(f64),

    #[error("Thermostat interval must be at least 1 step")]
    InvalidThermostatInterval,

    #[error("Convergence tolerance must be finite and positive (got {0})")]
    InvalidTolerance(f64),

    #[error("Initial step size must be finite and positive (got {0})")]
    InvalidStepSize(f64),

    #[error("Cannot run a session over a molecule with no atoms")]
    EmptyMolecule,

    #[error("Force-field evaluation failed: {source}")]
    Evaluation {
        #[from]
        source: EvaluationError,
    },
}

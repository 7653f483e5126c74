use molsim::core::forcefield::evaluator::EvaluationError;
use molsim::core::forcefield::params::ParamLoadError;
use molsim::core::io::xyz::XyzError;
use molsim::engine::error::EngineError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Structure file error: {0}")]
    Structure(#[from] XyzError),

    #[error("Force-field parameter error: {0}")]
    Params(#[from] ParamLoadError),

    #[error("Energy evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),
}

pub mod info;
pub mod minimize;
pub mod run;

use crate::error::Result;
use molsim::core::forcefield::params::Forcefield;
use std::path::Path;
use tracing::info;

/// Built-in parameters unless the user points at a TOML override.
pub(crate) fn load_forcefield(path: Option<&Path>) -> Result<Forcefield> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading force-field override");
            Ok(Forcefield::load(path)?)
        }
        None => Ok(Forcefield::default()),
    }
}

//! The stateful layer: session objects that borrow a molecule and drive it
//! through time integration or energy minimization, plus thermodynamic
//! helpers and the progress/cancellation plumbing they share.

pub mod dynamics;
pub mod error;
pub mod minimizer;
pub mod progress;
pub mod thermo;

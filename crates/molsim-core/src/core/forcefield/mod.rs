//! The empirical force field: parameter tables, pure potential functions,
//! and the evaluator that turns a molecular geometry into a potential
//! energy and per-atom forces.

pub mod evaluator;
pub mod params;
pub mod potentials;
pub mod term;

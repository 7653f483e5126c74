//! The foundation layer: stateless data models, pure force-field
//! mathematics, and structure file I/O.

pub mod forcefield;
pub mod io;
pub mod models;

//! # molsim Core Library
//!
//! A small molecular-mechanics engine: molecules of bonded atoms evolve
//! under an empirical intramolecular force field, either through
//! time-stepped dynamics with temperature control or through static energy
//! minimization.
//!
//! ## Architectural Philosophy
//!
//! The library is split into three layers with strictly one-way
//! dependencies, so each can be tested and reasoned about on its own.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Molecule`,
//!   `Atom`, the element table), the pure force-field mathematics
//!   (`potentials`, `evaluator`), and structure file I/O.
//!
//! - **[`engine`]: The Logic Core.** Stateful session objects that borrow a
//!   molecule and drive it: the `MolecularDynamics` integrator with its
//!   velocity-rescale thermostat, and the `EnergyMinimizer` with
//!   steepest-descent and conjugate-gradient modes. Sessions expose
//!   inspectable terminal states, sampled cancellation, and progress hooks.
//!
//! - **[`workflows`]: The Public API.** One-call entry points and prefab
//!   molecules for hosts — the CLI, the embedding boundary, or tests — that
//!   want a complete procedure rather than individual sessions.
//!
//! Rendering, input handling, and windowing are deliberately absent: a host
//! shell consumes read-only [`core::models::molecule::MoleculeSnapshot`]s
//! and never reaches into engine state.

pub mod core;
pub mod engine;
pub mod workflows;

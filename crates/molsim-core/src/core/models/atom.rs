use super::element::Element;
use nalgebra::{Point3, Vector3};
use thiserror::Error;

/// Error raised when advancing an atom's kinematic state fails.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum KinematicsError {
    /// The supplied time step was zero, NaN, or infinite.
    #[error("time step must be finite and nonzero (got {0})")]
    InvalidTimeStep(f64),
    /// The step would have produced a non-finite position or velocity.
    #[error("integration produced a non-finite position or velocity")]
    NonFiniteState,
}

/// A single particle: element identity plus mutable kinematic state.
///
/// Mass and radius are derived from the element at construction and are
/// immutable afterward. `force` is transient: contributions accumulate over
/// one force-evaluation pass and are cleared by the integration step that
/// consumes them — it must never carry over into a second pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The element this atom is an instance of.
    pub element: Element,
    /// Position in Angstroms.
    pub position: Point3<f64>,
    /// Velocity in Angstroms per time unit.
    pub velocity: Vector3<f64>,
    /// Accumulated force for the current evaluation pass.
    pub force: Vector3<f64>,
    /// Partial charge in elementary charge units (0 when charges are not modeled).
    pub partial_charge: f64,
    mass: f64,
    radius: f64,
}

impl Atom {
    /// Creates an atom of `element` at `position`, at rest and force-free.
    pub fn new(element: Element, position: Point3<f64>) -> Self {
        let data = element.data();
        Self {
            element,
            position,
            velocity: Vector3::zeros(),
            force: Vector3::zeros(),
            partial_charge: 0.0,
            mass: data.mass,
            radius: data.radius,
        }
    }

    /// Atomic mass in atomic mass units, fixed at construction.
    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Van der Waals radius in Angstroms, fixed at construction.
    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Display symbol of the underlying element.
    #[inline]
    pub fn symbol(&self) -> &'static str {
        self.element.symbol()
    }

    /// Accumulates a force contribution.
    ///
    /// Callable any number of times per step; independent contributors
    /// (bonded terms, non-bonded terms, external fields) simply sum.
    #[inline]
    pub fn apply_force(&mut self, delta: Vector3<f64>) {
        self.force += delta;
    }

    /// Computes the state one semi-implicit Euler step ahead, without
    /// committing it.
    ///
    /// The velocity is updated from the current force first, then the
    /// position from the *new* velocity. That ordering keeps the bonded
    /// harmonic terms stable at small time steps where an explicit Euler
    /// step would slowly gain energy.
    #[inline]
    pub fn advanced(&self, dt: f64) -> (Vector3<f64>, Point3<f64>) {
        let velocity = self.velocity + self.force / self.mass * dt;
        let position = self.position + velocity * dt;
        (velocity, position)
    }

    /// Advances this atom by one semi-implicit Euler step and clears the
    /// accumulated force.
    ///
    /// # Errors
    ///
    /// Returns [`KinematicsError::InvalidTimeStep`] for a non-finite or zero
    /// `dt`, and [`KinematicsError::NonFiniteState`] if the step would leave
    /// the atom with a non-finite position or velocity. On error the atom is
    /// left untouched, force included, so the caller can inspect the state
    /// that led to the divergence.
    pub fn integrate(&mut self, dt: f64) -> Result<(), KinematicsError> {
        if !dt.is_finite() || dt == 0.0 {
            return Err(KinematicsError::InvalidTimeStep(dt));
        }
        let (velocity, position) = self.advanced(dt);
        if !velocity.iter().all(|v| v.is_finite()) || !position.iter().all(|p| p.is_finite()) {
            return Err(KinematicsError::NonFiniteState);
        }
        self.velocity = velocity;
        self.position = position;
        self.force = Vector3::zeros();
        Ok(())
    }
}

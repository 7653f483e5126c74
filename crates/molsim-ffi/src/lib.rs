//! C ABI for embedding the simulation engine in a host environment.
//!
//! Every engine object lives inside a process-wide [`HandleRegistry`] and is
//! addressed exclusively through opaque `u64` handles; atom and bond ids
//! cross the boundary as their FFI-safe `u64` encodings. No pointer to
//! engine-owned memory is ever handed out, so the host's lifetime rules and
//! the engine's ownership rules cannot disagree.
//!
//! All functions return a status code and write results through out
//! pointers. Passing a null pointer, a stale handle, or a malformed string
//! is reported, never undefined behavior (the pointers themselves must of
//! course be valid when non-null).

mod registry;

use molsim::core::forcefield::evaluator::EvaluationError;
use molsim::core::forcefield::params::Forcefield;
use molsim::core::models::ids::AtomId;
use molsim::core::models::molecule::Molecule;
use molsim::engine::dynamics::{MdConfig, MdPhase, MolecularDynamics};
use molsim::engine::minimizer::{
    EnergyMinimizer, MinimizationAlgorithm, MinimizationOutcome,
};
use molsim::engine::progress::ProgressReporter;
use nalgebra::Point3;
use registry::HandleRegistry;
use slotmap::{Key, KeyData};
use std::ffi::{CStr, c_char};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::LazyLock;

pub const MOLSIM_OK: i32 = 0;
pub const MOLSIM_ERR_INVALID_HANDLE: i32 = -1;
pub const MOLSIM_ERR_NULL_POINTER: i32 = -2;
pub const MOLSIM_ERR_INVALID_STRING: i32 = -3;
pub const MOLSIM_ERR_UNSUPPORTED_ELEMENT: i32 = -4;
pub const MOLSIM_ERR_INVALID_REFERENCE: i32 = -5;
pub const MOLSIM_ERR_EVALUATION: i32 = -6;
pub const MOLSIM_ERR_DIVERGED: i32 = -7;
pub const MOLSIM_ERR_IO: i32 = -8;
pub const MOLSIM_ERR_INVALID_ARGUMENT: i32 = -9;
pub const MOLSIM_ERR_SESSION_BUSY: i32 = -10;
pub const MOLSIM_ERR_PANIC: i32 = -99;

pub const MOLSIM_PHASE_IDLE: i32 = 0;
pub const MOLSIM_PHASE_RUNNING: i32 = 1;
pub const MOLSIM_PHASE_COMPLETED: i32 = 2;
pub const MOLSIM_PHASE_DIVERGED: i32 = 3;
pub const MOLSIM_PHASE_CANCELLED: i32 = 4;

pub const MOLSIM_ALGORITHM_STEEPEST_DESCENT: i32 = 0;
pub const MOLSIM_ALGORITHM_CONJUGATE_GRADIENT: i32 = 1;

pub const MOLSIM_OUTCOME_CONVERGED: i32 = 0;
pub const MOLSIM_OUTCOME_MAX_ITERATIONS: i32 = 1;
pub const MOLSIM_OUTCOME_DIVERGED: i32 = 2;

static MOLECULES: LazyLock<HandleRegistry<Molecule>> = LazyLock::new(HandleRegistry::new);
static SESSIONS: LazyLock<HandleRegistry<MdSession>> = LazyLock::new(HandleRegistry::new);
static MINIMIZERS: LazyLock<HandleRegistry<EnergyMinimizer>> =
    LazyLock::new(HandleRegistry::new);
static FORCEFIELD: LazyLock<Forcefield> = LazyLock::new(Forcefield::default);

/// An MD session plus the pending configuration the host edits through the
/// `molsim_md_set_*` calls; the configuration is applied at run time.
struct MdSession {
    session: MolecularDynamics,
    config: MdConfig,
}

/// Atom ids cross the boundary as their stable slotmap FFI encoding; a raw
/// value that never came from [`atom_id_to_raw`] simply fails the lookup on
/// the other side.
fn atom_id_to_raw(id: AtomId) -> u64 {
    id.data().as_ffi()
}

fn atom_id_from_raw(raw: u64) -> AtomId {
    AtomId::from(KeyData::from_ffi(raw))
}

fn phase_code(phase: MdPhase) -> i32 {
    match phase {
        MdPhase::Idle => MOLSIM_PHASE_IDLE,
        MdPhase::Running => MOLSIM_PHASE_RUNNING,
        MdPhase::Completed => MOLSIM_PHASE_COMPLETED,
        MdPhase::Diverged => MOLSIM_PHASE_DIVERGED,
        MdPhase::Cancelled => MOLSIM_PHASE_CANCELLED,
    }
}

fn outcome_code(outcome: MinimizationOutcome) -> i32 {
    match outcome {
        MinimizationOutcome::Converged => MOLSIM_OUTCOME_CONVERGED,
        MinimizationOutcome::MaxIterationsReached => MOLSIM_OUTCOME_MAX_ITERATIONS,
        MinimizationOutcome::Diverged => MOLSIM_OUTCOME_DIVERGED,
    }
}

fn algorithm_from_code(code: i32) -> Option<MinimizationAlgorithm> {
    match code {
        MOLSIM_ALGORITHM_STEEPEST_DESCENT => Some(MinimizationAlgorithm::SteepestDescent),
        MOLSIM_ALGORITHM_CONJUGATE_GRADIENT => Some(MinimizationAlgorithm::ConjugateGradient),
        _ => None,
    }
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string valid for reads.
unsafe fn str_arg<'a>(ptr: *const c_char) -> Result<&'a str, i32> {
    if ptr.is_null() {
        return Err(MOLSIM_ERR_NULL_POINTER);
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| MOLSIM_ERR_INVALID_STRING)
}

fn write_out<T>(out: *mut T, value: T) -> i32 {
    if out.is_null() {
        return MOLSIM_ERR_NULL_POINTER;
    }
    unsafe { out.write(value) };
    MOLSIM_OK
}

// ---------------------------------------------------------------------------
// Molecules
// ---------------------------------------------------------------------------

/// Creates an empty molecule and writes its handle to `out_handle`.
///
/// # Safety
///
/// `name` must be null-terminated and readable; `out_handle` must be valid
/// for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn molsim_molecule_create(
    name: *const c_char,
    out_handle: *mut u64,
) -> i32 {
    let name = match unsafe { str_arg(name) } {
        Ok(name) => name,
        Err(status) => return status,
    };
    write_out(out_handle, MOLECULES.insert(Molecule::new(name)))
}

/// Releases the molecule behind `handle`.
#[unsafe(no_mangle)]
pub extern "C" fn molsim_molecule_destroy(handle: u64) -> i32 {
    if MOLECULES.remove(handle) {
        MOLSIM_OK
    } else {
        MOLSIM_ERR_INVALID_HANDLE
    }
}

/// Appends an atom of the element named by `symbol` and writes its id.
///
/// # Safety
///
/// `symbol` must be null-terminated and readable; `out_atom_id` must be
/// valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn molsim_molecule_add_atom(
    handle: u64,
    symbol: *const c_char,
    x: f64,
    y: f64,
    z: f64,
    out_atom_id: *mut u64,
) -> i32 {
    let symbol = match unsafe { str_arg(symbol) } {
        Ok(symbol) => symbol,
        Err(status) => return status,
    };
    let element = match symbol.parse() {
        Ok(element) => element,
        Err(_) => return MOLSIM_ERR_UNSUPPORTED_ELEMENT,
    };
    match MOLECULES.with_mut(handle, |molecule| {
        molecule.add_atom(element, Point3::new(x, y, z))
    }) {
        Some(atom_id) => write_out(out_atom_id, atom_id_to_raw(atom_id)),
        None => MOLSIM_ERR_INVALID_HANDLE,
    }
}

/// Bonds two atoms; invalid or duplicate references are rejected.
#[unsafe(no_mangle)]
pub extern "C" fn molsim_molecule_add_bond(handle: u64, atom1: u64, atom2: u64) -> i32 {
    match MOLECULES.with_mut(handle, |molecule| {
        molecule.add_bond(atom_id_from_raw(atom1), atom_id_from_raw(atom2))
    }) {
        Some(Ok(_)) => MOLSIM_OK,
        Some(Err(_)) => MOLSIM_ERR_INVALID_REFERENCE,
        None => MOLSIM_ERR_INVALID_HANDLE,
    }
}

/// Writes the number of atoms to `out_count`.
#[unsafe(no_mangle)]
pub extern "C" fn molsim_molecule_atom_count(handle: u64, out_count: *mut u64) -> i32 {
    match MOLECULES.with(handle, |molecule| molecule.atom_count() as u64) {
        Some(count) => write_out(out_count, count),
        None => MOLSIM_ERR_INVALID_HANDLE,
    }
}

/// Writes the molecule's Hill-convention formula (e.g. "H2O") into the
/// caller's buffer as a NUL-terminated string, truncating if `buffer_len`
/// is too small.
///
/// # Safety
///
/// `buffer` must be valid for writes of `buffer_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn molsim_molecule_formula(
    handle: u64,
    buffer: *mut c_char,
    buffer_len: usize,
) -> i32 {
    if buffer.is_null() || buffer_len == 0 {
        return MOLSIM_ERR_NULL_POINTER;
    }
    let formula = match MOLECULES.with(handle, |molecule| molecule.formula_string()) {
        Some(formula) => formula,
        None => return MOLSIM_ERR_INVALID_HANDLE,
    };
    let bytes = formula.as_bytes();
    let copy_len = bytes.len().min(buffer_len - 1);
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer.cast(), copy_len);
        buffer.add(copy_len).write(0);
    }
    MOLSIM_OK
}

/// Evaluates the molecule's potential energy under the built-in force field.
#[unsafe(no_mangle)]
pub extern "C" fn molsim_molecule_energy(handle: u64, out_energy: *mut f64) -> i32 {
    let result = match MOLECULES.with(handle, |molecule| molecule.total_energy(&FORCEFIELD)) {
        Some(result) => result,
        None => return MOLSIM_ERR_INVALID_HANDLE,
    };
    match result {
        Ok(energy) => write_out(out_energy, energy),
        Err(error) if error.is_divergence() => MOLSIM_ERR_DIVERGED,
        Err(_) => MOLSIM_ERR_EVALUATION,
    }
}

/// Writes the molecule to a structure file at `path`.
///
/// # Safety
///
/// `path` must be null-terminated and readable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn molsim_molecule_save(handle: u64, path: *const c_char) -> i32 {
    let path = match unsafe { str_arg(path) } {
        Ok(path) => path,
        Err(status) => return status,
    };
    match MOLECULES.with(handle, |molecule| molecule.save(path)) {
        Some(Ok(())) => MOLSIM_OK,
        Some(Err(_)) => MOLSIM_ERR_IO,
        None => MOLSIM_ERR_INVALID_HANDLE,
    }
}

/// Reads a structure file and writes the new molecule's handle.
///
/// # Safety
///
/// `path` must be null-terminated and readable; `out_handle` must be valid
/// for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn molsim_molecule_load(
    path: *const c_char,
    out_handle: *mut u64,
) -> i32 {
    let path = match unsafe { str_arg(path) } {
        Ok(path) => path,
        Err(status) => return status,
    };
    match Molecule::load(path) {
        Ok(molecule) => write_out(out_handle, MOLECULES.insert(molecule)),
        Err(_) => MOLSIM_ERR_IO,
    }
}

// ---------------------------------------------------------------------------
// Molecular dynamics sessions
// ---------------------------------------------------------------------------

/// Creates an idle MD session with default parameters.
#[unsafe(no_mangle)]
pub extern "C" fn molsim_md_create(out_handle: *mut u64) -> i32 {
    write_out(
        out_handle,
        SESSIONS.insert(MdSession {
            session: MolecularDynamics::new(),
            config: MdConfig::default(),
        }),
    )
}

/// Releases the MD session behind `handle`.
#[unsafe(no_mangle)]
pub extern "C" fn molsim_md_destroy(handle: u64) -> i32 {
    if SESSIONS.remove(handle) {
        MOLSIM_OK
    } else {
        MOLSIM_ERR_INVALID_HANDLE
    }
}

/// Sets the thermostat target temperature for subsequent runs.
#[unsafe(no_mangle)]
pub extern "C" fn molsim_md_set_temperature(handle: u64, temperature: f64) -> i32 {
    if !temperature.is_finite() || temperature < 0.0 {
        return MOLSIM_ERR_INVALID_ARGUMENT;
    }
    match SESSIONS.with_mut(handle, |md| md.config.target_temperature = temperature) {
        Some(()) => MOLSIM_OK,
        None => MOLSIM_ERR_INVALID_HANDLE,
    }
}

/// Sets the integration time step for subsequent runs.
#[unsafe(no_mangle)]
pub extern "C" fn molsim_md_set_time_step(handle: u64, timestep: f64) -> i32 {
    if !timestep.is_finite() || timestep <= 0.0 {
        return MOLSIM_ERR_INVALID_ARGUMENT;
    }
    match SESSIONS.with_mut(handle, |md| md.config.timestep = timestep) {
        Some(()) => MOLSIM_OK,
        None => MOLSIM_ERR_INVALID_HANDLE,
    }
}

/// Runs `steps` integration steps over the molecule and writes the terminal
/// phase code. A session that already finished is reset and reused, the way
/// an embedding host expects `run` to behave when called repeatedly.
#[unsafe(no_mangle)]
pub extern "C" fn molsim_md_run(
    md_handle: u64,
    molecule_handle: u64,
    steps: u64,
    out_phase: *mut i32,
) -> i32 {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        SESSIONS.with_mut(md_handle, |md| {
            MOLECULES.with_mut(molecule_handle, |molecule| {
                if md.session.phase().is_terminal() {
                    md.session.reset();
                }
                md.session.configure(md.config)?;
                md.session
                    .run(molecule, &FORCEFIELD, steps, &ProgressReporter::new())
            })
        })
    }));

    match outcome {
        Ok(Some(Some(Ok(phase)))) => write_out(out_phase, phase_code(phase)),
        Ok(Some(Some(Err(error)))) => engine_error_code(&error),
        Ok(Some(None)) | Ok(None) => MOLSIM_ERR_INVALID_HANDLE,
        Err(_) => MOLSIM_ERR_PANIC,
    }
}

/// Writes the step count and the most recent energy sample (zeros when no
/// step has run yet).
#[unsafe(no_mangle)]
pub extern "C" fn molsim_md_statistics(
    handle: u64,
    out_steps: *mut u64,
    out_kinetic: *mut f64,
    out_potential: *mut f64,
) -> i32 {
    let stats = match SESSIONS.with(handle, |md| md.session.statistics()) {
        Some(stats) => stats,
        None => return MOLSIM_ERR_INVALID_HANDLE,
    };
    let last = stats.energy_history.last().copied();
    let status = write_out(out_steps, stats.step_count);
    if status != MOLSIM_OK {
        return status;
    }
    let status = write_out(out_kinetic, last.map_or(0.0, |s| s.kinetic));
    if status != MOLSIM_OK {
        return status;
    }
    write_out(out_potential, last.map_or(0.0, |s| s.potential))
}

fn engine_error_code(error: &molsim::engine::error::EngineError) -> i32 {
    use molsim::engine::error::EngineError;
    match error {
        EngineError::SessionBusy { .. } => MOLSIM_ERR_SESSION_BUSY,
        EngineError::Evaluation { source } => evaluation_error_code(source),
        _ => MOLSIM_ERR_INVALID_ARGUMENT,
    }
}

fn evaluation_error_code(error: &EvaluationError) -> i32 {
    if error.is_divergence() {
        MOLSIM_ERR_DIVERGED
    } else {
        MOLSIM_ERR_EVALUATION
    }
}

// ---------------------------------------------------------------------------
// Minimizer sessions
// ---------------------------------------------------------------------------

/// Creates an idle minimizer using the algorithm code.
#[unsafe(no_mangle)]
pub extern "C" fn molsim_minimizer_create(algorithm: i32, out_handle: *mut u64) -> i32 {
    let algorithm = match algorithm_from_code(algorithm) {
        Some(algorithm) => algorithm,
        None => return MOLSIM_ERR_INVALID_ARGUMENT,
    };
    write_out(out_handle, MINIMIZERS.insert(EnergyMinimizer::new(algorithm)))
}

/// Releases the minimizer behind `handle`.
#[unsafe(no_mangle)]
pub extern "C" fn molsim_minimizer_destroy(handle: u64) -> i32 {
    if MINIMIZERS.remove(handle) {
        MOLSIM_OK
    } else {
        MOLSIM_ERR_INVALID_HANDLE
    }
}

/// Switches the minimizer's algorithm (idle sessions only).
#[unsafe(no_mangle)]
pub extern "C" fn molsim_minimizer_set_algorithm(handle: u64, algorithm: i32) -> i32 {
    let algorithm = match algorithm_from_code(algorithm) {
        Some(algorithm) => algorithm,
        None => return MOLSIM_ERR_INVALID_ARGUMENT,
    };
    match MINIMIZERS.with_mut(handle, |minimizer| minimizer.set_algorithm(algorithm)) {
        Some(Ok(())) => MOLSIM_OK,
        Some(Err(_)) => MOLSIM_ERR_SESSION_BUSY,
        None => MOLSIM_ERR_INVALID_HANDLE,
    }
}

/// Minimizes the molecule, writing the outcome code and the final energy.
/// A finished minimizer is reset and reused on the next call.
#[unsafe(no_mangle)]
pub extern "C" fn molsim_minimizer_minimize(
    minimizer_handle: u64,
    molecule_handle: u64,
    out_outcome: *mut i32,
    out_final_energy: *mut f64,
) -> i32 {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        MINIMIZERS.with_mut(minimizer_handle, |minimizer| {
            MOLECULES.with_mut(molecule_handle, |molecule| {
                if minimizer.phase() != molsim::engine::minimizer::MinimizerPhase::Idle {
                    minimizer.reset();
                }
                minimizer.minimize(molecule, &FORCEFIELD, &ProgressReporter::new())
            })
        })
    }));

    match outcome {
        Ok(Some(Some(Ok(report)))) => {
            let status = write_out(out_outcome, outcome_code(report.outcome));
            if status != MOLSIM_OK {
                return status;
            }
            write_out(out_final_energy, report.final_energy)
        }
        Ok(Some(Some(Err(error)))) => engine_error_code(&error),
        Ok(Some(None)) | Ok(None) => MOLSIM_ERR_INVALID_HANDLE,
        Err(_) => MOLSIM_ERR_PANIC,
    }
}

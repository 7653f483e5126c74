use crate::cli::MinimizeArgs;
use crate::error::Result;
use crate::progress;
use molsim::core::models::molecule::Molecule;
use molsim::workflows::simulate::{self, MinimizationRun};
use tracing::info;

pub fn run(args: MinimizeArgs, quiet: bool) -> Result<()> {
    let mut molecule = Molecule::load(&args.input)?;
    info!(
        input = %args.input.display(),
        formula = molecule.formula_string(),
        atoms = molecule.atom_count(),
        "loaded structure"
    );

    let forcefield = super::load_forcefield(args.forcefield.as_deref())?;
    let minimization = MinimizationRun {
        algorithm: args.algorithm.into(),
        tolerance: args.tolerance,
        max_iterations: args.max_iterations,
        initial_step: args.step_size,
    };

    let reporter = progress::reporter(quiet);
    let report = simulate::minimize(&mut molecule, &forcefield, &minimization, &reporter)?;

    println!(
        "{} ({}): {} after {} iterations",
        molecule.name(),
        molecule.formula_string(),
        report.outcome,
        report.iterations
    );
    println!(
        "  energy {:.6} -> {:.6}  max force {:.3e} (tolerance {:.3e})",
        report.initial_energy, report.final_energy, report.max_force, args.tolerance
    );

    if let Some(path) = &args.output {
        molecule.save(path)?;
        println!("  relaxed structure written to {}", path.display());
    }
    Ok(())
}

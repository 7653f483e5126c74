use crate::cli::RunArgs;
use crate::error::Result;
use crate::progress;
use molsim::core::models::molecule::Molecule;
use molsim::engine::dynamics::{MdConfig, MdStatistics};
use molsim::workflows::simulate::{self, DynamicsRun};
use std::path::Path;
use tracing::info;

pub fn run(args: RunArgs, quiet: bool) -> Result<()> {
    let mut molecule = Molecule::load(&args.input)?;
    info!(
        input = %args.input.display(),
        formula = molecule.formula_string(),
        atoms = molecule.atom_count(),
        "loaded structure"
    );

    let forcefield = super::load_forcefield(args.forcefield.as_deref())?;
    let dynamics = DynamicsRun {
        config: MdConfig {
            timestep: args.timestep,
            target_temperature: args.temperature,
            thermostat_interval: args.thermostat_interval,
        },
        steps: args.steps,
        initial_temperature: args.init_velocities,
        seed: args.seed,
    };

    let reporter = progress::reporter(quiet);
    let (phase, stats) = simulate::run_dynamics(&mut molecule, &forcefield, &dynamics, &reporter)?;

    println!(
        "{} ({}): {} after {} of {} steps",
        molecule.name(),
        molecule.formula_string(),
        phase,
        stats.step_count,
        args.steps
    );
    if let Some(last) = stats.energy_history.last() {
        println!(
            "  kinetic {:.6}  potential {:.6}  total {:.6}",
            last.kinetic,
            last.potential,
            last.total()
        );
    }

    if let Some(path) = &args.energy_csv {
        write_energy_csv(&stats, path)?;
        println!("  energy history written to {}", path.display());
    }
    if let Some(path) = &args.output {
        molecule.save(path)?;
        println!("  final structure written to {}", path.display());
    }
    Ok(())
}

fn write_energy_csv(stats: &MdStatistics, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["step", "kinetic", "potential", "total"])?;
    for (step, sample) in stats.energy_history.iter().enumerate() {
        writer.write_record(&[
            (step + 1).to_string(),
            sample.kinetic.to_string(),
            sample.potential.to_string(),
            sample.total().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

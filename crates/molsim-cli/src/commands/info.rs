use crate::cli::InfoArgs;
use crate::error::Result;
use molsim::core::models::element::Element;
use molsim::core::models::molecule::Molecule;

pub fn run(args: InfoArgs) -> Result<()> {
    let molecule = Molecule::load(&args.input)?;
    let forcefield = super::load_forcefield(args.forcefield.as_deref())?;

    println!("{}", molecule.name());
    println!("  formula: {}", molecule.formula_string());
    println!(
        "  atoms: {}  bonds: {}",
        molecule.atom_count(),
        molecule.bond_count()
    );

    let formula = molecule.formula();
    for element in Element::ALL {
        if let Some(count) = formula.get(&element) {
            println!(
                "    {:<2} x{:<4} (mass {:.3}, radius {:.2})",
                element.symbol(),
                count,
                element.mass(),
                element.radius()
            );
        }
    }

    // The format carries no bonds, so the energy here is non-bonded only
    // unless the caller rebonds the structure programmatically.
    let energy = molecule.total_energy(&forcefield)?;
    println!("  potential energy: {energy:.6}");
    Ok(())
}

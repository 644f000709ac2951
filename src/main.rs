use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use protocell_core::{init_logging, HardwareConfig};
use protocell_io::{load_config, load_genome, load_inst_set, to_json_pretty};
use protocell_lib::Dish;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one organism in an isolated dish
    Run {
        #[arg(long)]
        inst_set: PathBuf,

        #[arg(long)]
        genome: PathBuf,

        /// Hardware configuration (TOML); defaults to a register machine
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 1000)]
        steps: u64,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Print the hardware status after every step
        #[arg(long)]
        trace: bool,

        /// Give the organism an empty neighbour to inject into
        #[arg(long)]
        neighbor: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load an instruction set and print its diagnostics
    Check {
        #[arg(long)]
        inst_set: PathBuf,
    },
    /// Run a genome and print the resulting hardware state as JSON
    State {
        #[arg(long)]
        inst_set: PathBuf,

        #[arg(long)]
        genome: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 0)]
        steps: u64,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Restore a binary snapshot before stepping
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Also write the final state as a binary snapshot
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn config_from(path: Option<&PathBuf>) -> Result<HardwareConfig> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(HardwareConfig::default()),
    }
}

fn build_dish(inst_set: &PathBuf, genome: &PathBuf, config: Option<&PathBuf>) -> Result<Dish> {
    let loaded = load_inst_set(inst_set)?;
    for diagnostic in loaded.feedback.entries() {
        eprintln!("{}: {}", inst_set.display(), diagnostic);
    }
    let genome = load_genome(genome, &loaded.inst_set)?;
    let config = config_from(config)?;
    let dish = Dish::new(Arc::new(loaded.inst_set), Arc::new(config), genome)
        .context("building hardware")?;
    Ok(dish)
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    match args.command {
        Command::Run {
            inst_set,
            genome,
            config,
            steps,
            seed,
            trace,
            neighbor,
            json,
        } => {
            let mut dish = build_dish(&inst_set, &genome, config.as_ref())?;
            if neighbor {
                dish = dish.with_neighbor()?;
            }
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let report = dish.run(steps, &mut rng, |step, hardware| {
                if trace {
                    println!("{step:>6} {}", hardware.status_line());
                }
            });

            if json {
                println!("{}", to_json_pretty(&report)?);
                return Ok(());
            }
            println!("Steps:      {}", report.steps);
            println!("Executed:   {}", report.executed);
            println!("Failed:     {}", report.failed);
            println!("Divides:    {}", report.divides);
            println!("Injections: {}", report.injections);
            if report.died {
                println!("Organism died.");
            }
            for (fault, count) in &report.faults {
                println!("Fault {fault}: {count}");
            }
            for (i, child) in report.offspring.iter().enumerate() {
                println!(
                    "Offspring {i}: {} lines, fertile={}, copy_true={}, mutations={}",
                    child.size, child.fertile, child.copy_true, child.mutations
                );
                println!("  {}", child.genome);
                println!("  hex: {}", child.hex);
            }
        }
        Command::Check { inst_set } => {
            let loaded = load_inst_set(&inst_set)?;
            for diagnostic in loaded.feedback.entries() {
                println!("{diagnostic}");
            }
            println!(
                "{} instructions ({} no-ops)",
                loaded.inst_set.len(),
                loaded.inst_set.num_nops()
            );
            println!("Fingerprint: {}", loaded.inst_set.fingerprint());
            if loaded.feedback.has_errors() {
                anyhow::bail!("instruction set has errors");
            }
        }
        Command::State {
            inst_set,
            genome,
            config,
            steps,
            seed,
            resume,
            save,
        } => {
            let mut dish = build_dish(&inst_set, &genome, config.as_ref())?;
            if let Some(path) = &resume {
                dish.resume(path)
                    .with_context(|| format!("resuming from {}", path.display()))?;
            }
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            dish.run(steps, &mut rng, |_, _| {});
            if let Some(path) = &save {
                dish.save_snapshot(path)
                    .with_context(|| format!("saving to {}", path.display()))?;
            }
            println!("{}", to_json_pretty(&dish.hardware.save_state())?);
        }
    }

    Ok(())
}

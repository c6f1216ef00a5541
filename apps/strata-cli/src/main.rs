mod script;

use anyhow::Context;
use clap::{Parser, Subcommand};
use script::{Session, parse_script};
use std::path::PathBuf;
use strata_history::ManagerScope;
use strata_level::{Level, LevelMetadata, LevelSeed};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_SCRIPT: &str = "\
# world edits and a metadata edit, committed together
fill overworld 0 60 0 20 61 4 stone
spawn overworld minecraft:pig 2 61 2
rename Demo Level
commit
status

# metadata only: world edits stay pending
rename Renamed
block overworld 0 61 0 glass
commit non-world
undo
status

# throw away the pending block
restore
redo
status

save
move 0 3 61 3
commit world
undo
status
";

#[derive(Parser)]
#[command(name = "strata-cli", about = "CLI tool for strata level history")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the managers a fresh level registers
    Info,
    /// Run a built-in edit script showing scoped undo points
    Demo,
    /// Run an edit script against a level
    Run {
        /// Script file, one command per line
        script: PathBuf,
        /// Level to start from (JSON)
        #[arg(short, long)]
        seed: Option<PathBuf>,
        /// Write the final level here (JSON)
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("strata-cli v{}", env!("CARGO_PKG_VERSION"));
            let level = Level::new(LevelMetadata::default())?;
            let history = level.history();
            for (label, scope) in [
                ("world", ManagerScope::World),
                ("non-world", ManagerScope::NonWorld),
            ] {
                let ids: Vec<String> = history
                    .managers(scope)
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                println!("{label} managers: {}", ids.join(", "));
            }
        }
        Commands::Demo => {
            let commands = parse_script(DEMO_SCRIPT)?;
            let mut session = Session::new(Level::new(LevelMetadata::default())?);
            session.run(&commands, &mut std::io::stdout().lock())?;
        }
        Commands::Run {
            script,
            seed,
            export,
        } => {
            let source = std::fs::read_to_string(&script)
                .with_context(|| format!("reading script {}", script.display()))?;
            let commands = parse_script(&source)?;

            let level = match seed {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading seed {}", path.display()))?;
                    let seed = LevelSeed::from_json(&json)
                        .with_context(|| format!("parsing seed {}", path.display()))?;
                    Level::from_seed(seed)?
                }
                None => Level::new(LevelMetadata::default())?,
            };
            info!(commands = commands.len(), "running {}", script.display());

            let mut session = Session::new(level);
            session.run(&commands, &mut std::io::stdout().lock())?;

            if let Some(path) = export {
                let json = session.level().export().to_json()?;
                std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!("exported level to {}", path.display());
            }
        }
    }

    Ok(())
}

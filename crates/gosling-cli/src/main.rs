use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gosling_config::{AppConfig, ConfigLoader};
use gosling_db::{Catalog, Command, Dialect, Migrator, Outcome, command, conn};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gosling", version, about = "Apply versioned schema migrations")]
struct Cli {
    /// Config file (defaults to ./gosling.{yml,yaml,toml} when present)
    #[arg(long, env = "GOSLING_CONFIG")]
    config: Option<PathBuf>,

    /// Database dialect: postgres, mysql or sqlite3
    #[arg(long, env = "GOSLING_DIALECT")]
    dialect: Option<String>,

    /// Connection string passed to the database driver
    #[arg(long, env = "GOSLING_DATABASE")]
    database: Option<String>,

    /// Directory holding migration files
    #[arg(long, env = "GOSLING_DIR")]
    dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// up | up-by-one | up-from VERSION | down | down-to VERSION | redo | status | version | create NAME [sql|rs]
    command: String,

    args: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = resolve_config(&cli)?;
    let dialect: Dialect = config.dialect.parse()?;
    let cmd = Command::parse(&cli.command, &cli.args)?;
    debug!("running {cmd:?} with {dialect} against {}", config.dir.display());

    let migrator = Migrator::new(dialect, Catalog::dir(&config.dir))
        .with_range(config.min_version, config.max_version);

    let outcome = match &cmd {
        Command::Create { name, kind } => command::create(&migrator, name, *kind)?,
        _ => {
            let mut db = conn::open(dialect, &config.database)
                .context("failed to open database connection")?;
            cmd.run(&migrator, db.as_mut())
                .with_context(|| format!("gosling {} failed", cli.command))?
        }
    };

    report(&outcome);
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// File values first, then environment and flags on top.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load(path)?,
        None => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            ConfigLoader::discover(&cwd)?
        }
    };

    if let Some(dialect) = &cli.dialect {
        config.dialect = dialect.clone();
    }
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    if let Some(dir) = &cli.dir {
        config.dir = dir.clone();
    }
    Ok(config)
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Applied(versions) => {
            for v in versions {
                println!("OK    {v}");
            }
        }
        Outcome::Reverted(versions) => {
            for v in versions {
                println!("DOWN  {v}");
            }
        }
        Outcome::Status(statuses) => {
            println!("{:<24} Migration", "Applied At");
            println!("{}", "=".repeat(56));
            for s in statuses {
                let applied_at = match (&s.applied_at, s.applied) {
                    (Some(tstamp), _) => tstamp.as_str(),
                    (None, true) => "Applied",
                    (None, false) => "Pending",
                };
                println!("{applied_at:<24} {}_{}", s.version, s.name);
            }
        }
        Outcome::Version(v) => println!("gosling: version {v}"),
        Outcome::Created(path) => println!("created {}", path.display()),
    }
}

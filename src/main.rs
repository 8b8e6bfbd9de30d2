use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
mod auth;
use lazy_vault::{DEFAULT_ENV, SyncOutcome, Workspace, create_template};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Variable holding the log filter, e.g. `LAZY_VAULT_LOG=debug`.
const LOG_ENV: &str = "LAZY_VAULT_LOG";

#[derive(Debug, Parser)]
#[command(name = "lazy-vault")]
#[command(
    version,
    about = "A secure, simple way to manage encrypted .env files in Git."
)]
struct Cli {
    /// Project directory holding lazy.config.json and the env files
    #[arg(long, global = true, value_name = "PATH", env = "LAZY_VAULT_DIR")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Creates a lazy.config.json template
    Init,

    /// Encrypts the local env file into its .enc counterpart
    Lock {
        /// Environment from lazy.config.json
        #[arg(default_value = DEFAULT_ENV)]
        env: String,
    },

    /// Decrypts the .enc file and merges it into the local env file
    Sync {
        /// Environment from lazy.config.json
        #[arg(default_value = DEFAULT_ENV)]
        env: String,
    },
}

fn init_logging() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("unable to set log subscriber")
}

fn resolve_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(d) => Ok(d),
        None => std::env::current_dir().context("could not determine current directory"),
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging()?;
    let root = resolve_dir(args.dir)?;

    match args.command {
        Commands::Init => {
            let path = create_template(&root)?;
            println!("Created {}", path.display());
            println!("You can now run \"lazy-vault lock production\"");
        }
        Commands::Lock { env } => {
            let ws = Workspace::load(root, &env)?;
            ws.check_lock()?;
            let password = auth::read_new_password_with_confirmation()?;
            let report = ws.lock(&password)?;

            println!(
                "Success! Encrypted {} secrets to {} ({} profile)",
                report.secrets,
                report.output.display(),
                report.profile
            );
            if report.gitignore_updated {
                println!("Added {} to .gitignore", ws.env().source.display());
            }
            println!("You can now commit {} to Git.", report.output.display());
        }
        Commands::Sync { env } => {
            let ws = Workspace::load(root, &env)?;
            ws.check_sync()?;
            let password = auth::read_password("Enter password to decrypt: ")?;
            let report = ws.sync(&password)?;

            match &report.outcome {
                SyncOutcome::Created => {
                    println!("Success! Created new {}", report.source.display());
                }
                SyncOutcome::Merged { overwritten, .. } => {
                    println!("Success! Merged with local {}", report.source.display());
                    if !overwritten.is_empty() {
                        println!(
                            "Local values replaced by encrypted ones: {}",
                            overwritten.join(", ")
                        );
                    }
                }
            }
            println!("Keys in final {}: {}", report.source.display(), report.keys);
        }
    }

    Ok(())
}

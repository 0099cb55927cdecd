use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use llavero::cli::{self, TerminalSource};
use llavero::config::{self, Config};
use llavero::protocol::{ProtocolVariant, Request, Tag};

#[derive(Parser)]
#[command(name = "llavero")]
#[command(version)]
#[command(about = "Host client for the LLAVERO hardware secret token", long_about = None)]
struct Cli {
    /// Serial device the token is attached to
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Serial line speed
    #[arg(long, global = true)]
    baud: Option<u32>,

    /// Per-read timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Firmware dialect
    #[arg(long, value_enum, global = true)]
    variant: Option<ProtocolVariant>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Don't ask before a factory reset
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// Log protocol traffic to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Handshake and print the greeting
    Hi,
    /// Store a secret under a tag
    Set { tag: String },
    /// Print the secret stored under a tag
    Get { tag: String },
    /// List stored tags
    Ls,
    /// Factory reset: erase every stored secret
    Init,
    /// Derive and install the device key from a passphrase
    Secret,
    /// Set the token clock to the current time
    Time,
    /// Store a base32 TOTP seed under a tag
    Sett { tag: String },
    /// Interactive shell (the default)
    Shell,
    /// Inspect or persist the configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to the config file
    Save,
    /// Print the config file location
    Path,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "llavero=debug" } else { "llavero=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };
    let mut config = config::load(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    apply_overrides(&mut config, &cli);
    config.validate()?;

    let request = match cli.command {
        None | Some(Commands::Shell) => return Ok(cli::shell::run(&config, cli.yes)?),
        Some(Commands::Config { action }) => return config_command(action, &config, &path),
        // Connecting already says hi
        Some(Commands::Hi) => {
            cli::connect::run(&config)?;
            return Ok(());
        }
        Some(Commands::Set { tag }) => Request::Set(Tag::new(tag)),
        Some(Commands::Get { tag }) => Request::Get(Tag::new(tag)),
        Some(Commands::Ls) => Request::List,
        Some(Commands::Init) => Request::Reset,
        Some(Commands::Secret) => Request::SetDeviceKey,
        Some(Commands::Time) => Request::SyncClock,
        Some(Commands::Sett { tag }) => Request::SetTotp(Tag::new(tag)),
    };

    let mut session = cli::connect::run(&config)?;
    let assume_yes = cli.yes;
    cli::exec::run(&mut session, request, &mut TerminalSource, &mut |prompt: &str| {
        assume_yes || cli::confirm(prompt)
    })?;
    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(port) = &cli.port {
        config.port = Some(port.clone());
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.read_timeout_ms = timeout_ms;
    }
    if let Some(variant) = cli.variant {
        config.variant = variant;
    }
}

fn config_command(action: ConfigCommands, config: &Config, path: &std::path::Path) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigCommands::Save => {
            config::save(config, path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{} {}", "Saved".green(), path.display());
        }
        ConfigCommands::Path => println!("{}", path.display()),
    }
    Ok(())
}

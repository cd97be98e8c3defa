use anyhow::{Context, Result};
use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use rhost::config::{Config, Settings, SettingsSource};
use rhost::history::FileHistory;
use rhost::logging::init_logging;
use rhost::session::ConsoleSession;
use rhost::terminal::CrosstermTerminal;
use rhost_runtime::{EventPump, InitOptions, RuntimeHandle};
use std::path::PathBuf;

/// rhost - an R console with a modal prompt
#[derive(ClapParser)]
#[command(name = "rhost")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: <config dir>/rhost/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// R install root, overriding R_HOME and `R RHOME`
    #[arg(long, value_name = "PATH")]
    r_home: Option<PathBuf>,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// How often R's events run while the prompt waits
    #[arg(long, value_name = "MS")]
    poll_interval_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions for bash, zsh, fish, or powershell
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        generate_completions(shell);
        return Ok(());
    }

    let config = load_config(&cli)?;
    init_logging(&config.log).context("failed to initialize logging")?;
    run_console(config)
}

/// Config file values with the command line laid on top
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(r_home) = &cli.r_home {
        config.runtime.r_home = Some(r_home.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    if let Some(interval) = cli.poll_interval_ms {
        config.console.poll_interval_ms = interval;
    }
    Ok(config)
}

fn run_console(config: Config) -> Result<()> {
    let options = InitOptions {
        r_home: config.runtime.r_home.clone(),
        program_name: config.runtime.program_name.clone(),
    };
    let handle = RuntimeHandle::initialize(&options).context("failed to start R")?;
    // libR is never unloaded, so neither is its handle.
    let handle: &'static RuntimeHandle = Box::leak(Box::new(handle));

    let history = match config.history_path() {
        Some(path) => FileHistory::load(&path).unwrap_or_else(|err| {
            tracing::warn!(%err, "history unavailable, keeping it in memory");
            FileHistory::in_memory()
        }),
        None => FileHistory::in_memory(),
    };

    let console = config.console.clone();
    let session = ConsoleSession::new(CrosstermTerminal::new(), history)
        .with_events(handle.events())
        .with_pump(EventPump::new(config.poll_interval()))
        .with_blank_line_before_prompt(console.blank_line_before_prompt)
        .with_settings_loader(move || match handle.options() {
            Ok(options) => Settings::resolve(&console, Some(&options as &dyn SettingsSource)),
            Err(err) => {
                tracing::warn!(%err, "R options unavailable, using config file settings");
                Settings::resolve(&console, None)
            }
        })
        .with_banner(move || handle.version());
    let exit_status = session.exit_status();

    handle
        .run(session.into_callbacks())
        .context("R session failed")?;

    match exit_status.get() {
        Some(status) if status != 0 => std::process::exit(status),
        _ => Ok(()),
    }
}

fn generate_completions(shell: clap_complete::Shell) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
}

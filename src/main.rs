use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use slack_bots::application::errors::{ConfigError, RegistryError};
use slack_bots::application::services::BotService;
use slack_bots::infrastructure::adapters::{ConsoleAdapter, Outbound, SlackWebClient};
use slack_bots::infrastructure::config::{Config, SAMPLE_CONFIG};
use slack_bots::infrastructure::credentials::{CredentialHolder, SharedCredentials};
use slack_bots::plugins::{load_plugins, LoadedPlugins, OncallPlugin, PingerPlugin, PluginRegistry};

#[derive(Parser)]
#[command(name = "slackbot")]
#[command(about = "Chat bot with on-call plugins and handoff reminders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Command prefix (overrides config and BOT_PREFIX)
    #[arg(short, long)]
    prefix: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Validate the configuration and plugin sections
    Check,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => match prepare(&cli) {
            Some((config, loaded)) => run_bot(config, loaded),
            None => ExitCode::FAILURE,
        },
        Commands::Check => match prepare(&cli) {
            Some((config, loaded)) => {
                println!(
                    "Configuration OK: {} plugins, {} reminder sets, prefix {:?}",
                    loaded.plugins().len(),
                    loaded.reminder_plans().len(),
                    config.cmdprefix
                );
                ExitCode::SUCCESS
            }
            None => ExitCode::FAILURE,
        },
        Commands::Version => {
            println!("slackbot v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::InitConfig => init_config(&cli.config),
    }
}

/// Install the global subscriber. Falls back to stdout if the log file
/// cannot be opened.
fn init_logging(debug: bool, logfile: Option<&Path>) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = || {
        EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy()
    };

    let file = logfile.map(|path| (path, OpenOptions::new().create(true).append(true).open(path)));
    match file {
        Some((_, Ok(file))) => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_ansi(false)
                .with_env_filter(filter())
                .with_writer(Mutex::new(file))
                .init();
        }
        Some((path, Err(e))) => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_env_filter(filter())
                .init();
            warn!("Cannot open log file {}: {}, logging to stdout", path.display(), e);
        }
        None => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_env_filter(filter())
                .init();
        }
    }
}

fn build_registry(credentials: &SharedCredentials) -> Result<PluginRegistry, RegistryError> {
    let registry = PluginRegistry::new();
    registry.register_plugin(OncallPlugin::new(credentials.clone()))?;
    registry.register_plugin(PingerPlugin::new(credentials.clone()))?;
    Ok(registry)
}

/// Load the configuration, set up logging and activate every configured
/// plugin. Errors are logged; `None` means startup must abort.
fn prepare(cli: &Cli) -> Option<(Config, LoadedPlugins)> {
    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging(false, None);
            error!("{}", e);
            return None;
        }
    };
    init_logging(config.debug, config.logfile.as_deref());

    config.apply_env();
    config.override_prefix(cli.prefix.clone());
    info!("Starting {}", config.bot_name);

    let credentials = CredentialHolder::shared();
    let registry = match build_registry(&credentials) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to register plugins: {}", e);
            return None;
        }
    };

    match load_plugins(&registry, &config, &credentials) {
        Ok(loaded) => {
            info!("Loaded plugins: {:?}", loaded.names());
            Some((config, loaded))
        }
        Err(e) => {
            error!("Failed to load config: {}", e);
            None
        }
    }
}

fn run_bot(config: Config, loaded: LoadedPlugins) -> ExitCode {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    rt.block_on(async move {
        let slack = SlackWebClient::from_credentials(&config.credentials);
        if slack.is_none() {
            info!("No slack_bot_token configured, printing reminders to the console");
        }
        let outbound = Outbound::console(slack);

        let bot = BotService::start(config.cmdprefix.clone(), loaded, outbound.replies, outbound.reminders);
        let mut source = ConsoleAdapter::stdin();
        bot.run_until(&mut source, tokio::signal::ctrl_c()).await;
        info!("Bye");
    });
    ExitCode::SUCCESS
}

fn init_config(path: &str) -> ExitCode {
    if Path::new(path).exists() {
        println!("Config already exists at {}", path);
        return ExitCode::SUCCESS;
    }

    let written = std::fs::write(path, SAMPLE_CONFIG).map_err(|source| ConfigError::Write {
        path: path.into(),
        source,
    });
    match written {
        Ok(()) => {
            println!("Created {}", path);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

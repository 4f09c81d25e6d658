mod prompt;

use clap::{Parser, Subcommand};
use lib::relay::{LogObserver, RelayObserver};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Relay prefixed commands from a Telegram group to a channel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a template config to fill in (api id/hash, phone, group and channel ids).
    Init {
        /// Config file path (default: COURIER_CONFIG_PATH or ~/.courier/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Validate the configuration (file + environment overrides) without connecting.
    Check {
        /// Config file path (default: COURIER_CONFIG_PATH or ~/.courier/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Sign in (interactively on first run) and relay commands until disconnected.
    Run {
        /// Config file path (default: COURIER_CONFIG_PATH or ~/.courier/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("courier {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Check { config }) => {
            if let Err(e) = run_check(config) {
                log::error!("check failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run { config }) => match run_relay(config).await {
            Ok(Stop::Disconnected) => {}
            Ok(Stop::Interrupted) => {
                // A sign-in prompt may still be blocked reading the terminal; returning would
                // make runtime shutdown wait for that read.
                std::process::exit(0);
            }
            Err(e) => {
                log::error!("relay failed: {:#}", e);
                std::process::exit(1);
            }
        },
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let _dir = lib::init::init_config_dir(&path)?;
    println!(
        "initialized configuration at {}; replace the YOUR_* placeholders before running",
        path.display()
    );
    Ok(())
}

fn run_check(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    lib::init::require_initialized(&path)?;
    let settings = lib::config::resolve_settings(&config, &path)?;
    println!("configuration ok ({})", path.display());
    println!("  account:  {}", settings.credentials.phone_number);
    println!("  source:   {}", settings.route.source_conversation_id());
    println!("  target:   {}", settings.route.target_channel_id());
    println!("  prefix:   {:?}", settings.route.command_prefix());
    println!("  session:  {}", settings.session_file.display());
    Ok(())
}

/// How a `courier run` ended without an error.
#[derive(Debug, PartialEq, Eq)]
enum Stop {
    Disconnected,
    Interrupted,
}

async fn run_relay(config_path: Option<PathBuf>) -> anyhow::Result<Stop> {
    let (config, path) = lib::config::load_config(config_path)?;
    lib::init::require_initialized(&path)?;
    let observer: Arc<dyn RelayObserver> = Arc::new(LogObserver);
    let relay = lib::startup::run_relay(
        &config,
        &path,
        lib::transport::build_transport,
        &prompt::ConsolePrompt,
        observer,
    );
    until_interrupted(relay, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Race the relay against `interrupt`; the relay future is dropped when interrupted.
async fn until_interrupted<R, I>(relay: R, interrupt: I) -> anyhow::Result<Stop>
where
    R: Future<Output = Result<(), lib::error::Error>>,
    I: Future<Output = ()>,
{
    tokio::select! {
        res = relay => {
            res?;
            Ok(Stop::Disconnected)
        }
        _ = interrupt => {
            log::info!("interrupted, shutting down");
            Ok(Stop::Interrupted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib::transport::TransportError;
    use std::time::Duration;

    #[tokio::test]
    async fn interrupt_does_not_wait_for_a_blocked_prompt() {
        let relay = async {
            let _ = tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_millis(300)))
                .await;
            Ok(())
        };
        let stop = until_interrupted(relay, async {}).await.unwrap();
        assert_eq!(stop, Stop::Interrupted);
    }

    #[tokio::test]
    async fn lost_connection_is_an_error() {
        let relay = async {
            Err(lib::error::Error::Transport(TransportError::Disconnected(
                "update stream ended".to_string(),
            )))
        };
        let err = until_interrupted(relay, std::future::pending()).await.unwrap_err();
        assert!(err.to_string().contains("connection lost"), "{}", err);
    }

    #[tokio::test]
    async fn closed_subscription_is_a_clean_stop() {
        let stop = until_interrupted(async { Ok(()) }, std::future::pending())
            .await
            .unwrap();
        assert_eq!(stop, Stop::Disconnected);
    }
}

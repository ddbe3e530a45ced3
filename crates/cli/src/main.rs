use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "liftbot")]
#[command(about = "LINE webhook bot for Ascenda residential lifts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Write a default config file (does not overwrite an existing one).
    Init {
        /// Config file path (default: LIFTBOT_CONFIG_PATH or ~/.liftbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the webhook server. Requires CHANNEL_ACCESS_TOKEN and CHANNEL_SECRET
    /// (env or config file); refuses to start without them.
    Serve {
        /// Config file path (default: LIFTBOT_CONFIG_PATH or ~/.liftbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config, PORT env, or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("liftbot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        // Plain `liftbot` serves with defaults, matching container deployments
        // where only env vars are provided.
        None => {
            if let Err(e) = run_serve(None, None).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    use anyhow::Context;

    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    if path.exists() {
        println!("config already exists at {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }
    let default_config = serde_json::to_string_pretty(&lib::config::Config::default())?;
    std::fs::write(&path, default_config)
        .with_context(|| format!("writing default config to {}", path.display()))?;
    println!("initialized configuration at {}", path.display());
    Ok(())
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, _path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.server.port = p;
    }
    log::info!(
        "starting webhook server on {}:{}",
        config.server.bind,
        config.server.port
    );
    lib::gateway::run_gateway(config).await
}

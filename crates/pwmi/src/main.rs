pub mod command;
pub mod config;
pub mod runner;

use command::Command;
use config::PwmiConfig;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pwmi=debug,pwmi_core=debug,pwmi_devices=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        warn!("usage: pwmi <config file> <set|get|reset|run> [args]");
        warn!("got {}", args.join(","));
        return;
    }

    let config = match PwmiConfig::load(&args[1]) {
        Ok(config) => config,
        Err(err) => {
            error!("Failed to parse config: {:?}", err);
            return;
        }
    };
    let command = match Command::parse(&args[2..]) {
        Ok(command) => command,
        Err(msg) => {
            error!("{}", msg);
            return;
        }
    };

    if let Some(ref name) = config.name {
        info!("name: {name}")
    }
    match runner::execute(command, &config).await {
        Ok(_) => debug!("pwmi done"),
        Err(err) => error!("pwmi exited with an error: {:?}", err),
    }
}

use std::process::ExitCode;
use std::time::SystemTime;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use moc_mpris::{
    ArtLookup, Bridge, CachedArt, Config, MusicBrainzArt, NoArt, Server, SystemTransport,
};

/// Initialize tracing with the configured level; `RUST_LOG` takes precedence.
fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(config: Config) -> moc_mpris::Result<()> {
    let transport = SystemTransport::new(config.target.clone(), config.command_timeout);
    let art: Box<dyn ArtLookup> = if config.lookup_art {
        Box::new(CachedArt::new(MusicBrainzArt::new(config.command_timeout)))
    } else {
        Box::new(NoArt)
    };

    let mut bridge = Bridge::new(
        config.target.clone(),
        config.bridge_options(),
        Box::new(transport),
        art,
    );
    bridge.connect(SystemTime::now())?;

    let connection = zbus::Connection::session().await?;
    Server::new(connection, bridge).run().await
}

#[async_std::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("moc-mpris: {}", error);
            return ExitCode::from(2);
        }
    };

    init_tracing(&config.log_level);
    config.print_summary();

    match run(config).await {
        Ok(()) => {
            info!("bridge stopped");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(%error, "bridge failed");
            ExitCode::FAILURE
        }
    }
}

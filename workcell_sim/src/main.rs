use anyhow::{Context, Result};
use tracing::info;

use workcell_sim::config::{validate_duration, validate_realtime_rate};
use workcell_sim::{SceneComposer, SceneConfig, SceneError};

mod cli;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run(&cli) {
        eprintln!("error: {:#}", err);
        if let Some(hint) = err.downcast_ref::<SceneError>().and_then(SceneError::hint) {
            eprintln!("  hint: {}", hint);
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    // Process parameters are checked before any file is read
    if let Some(rate) = cli.target_realtime_rate {
        validate_realtime_rate(rate, "--target-realtime-rate")?;
    }
    if let Some(duration) = cli.duration {
        validate_duration(duration, "--duration")?;
    }

    info!("Starting workcell-sim");
    let mut config = SceneConfig::from_yaml_file(&cli.config)?;
    if cli.target_realtime_rate.is_some() {
        config.target_realtime_rate = cli.target_realtime_rate;
    }
    if cli.duration.is_some() {
        config.duration = cli.duration;
    }

    let scene = SceneComposer::compose(&config)?;
    let params = scene.params;
    info!(
        "Ready: time step {} s, realtime rate {}, duration {} s",
        params.time_step, params.target_realtime_rate, params.duration
    );

    if cli.report {
        let report = scene.report()?;
        let json = serde_json::to_string_pretty(&report).context("serializing scene report")?;
        println!("{}", json);
    } else {
        for instance in scene.plant.instances() {
            info!(
                "  {} ({}) -> {}",
                instance.name,
                instance.model_class,
                if instance.is_free() { "free" } else { "welded" }
            );
        }
        for channel in scene.graph.transport_channels() {
            info!("  channel {} ({:?}, {})", channel.channel, channel.direction, channel.component);
        }
    }

    Ok(())
}

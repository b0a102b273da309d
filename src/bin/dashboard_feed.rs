use anyhow::Result;
use nft_dashboard::app::{init_tracing, DashboardConfig, DashboardProvider};
use nft_dashboard::bin_common::{
    config_type_from_args, load_config_from_env, parse_args, RunConfig, ShutdownManager,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load config first (before logging is initialized)
    let config_path = load_config_from_env(config_type_from_args(&parse_args()));
    let config = if config_path.exists() {
        DashboardConfig::load(&config_path)?
    } else {
        DashboardConfig::from_env_strict()?
    };

    init_tracing(&config.log_level);
    if !config_path.exists() {
        warn!("{} not found, using environment configuration", config_path.display());
    }
    config.log();

    let run = RunConfig::new("Dashboard feed").with_summary_interval(config.summary_interval_secs);
    run.print_banner();

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let provider = DashboardProvider::start(&config).await?;
    let mut toasts = provider.toasts().subscribe();

    while shutdown.is_running() {
        shutdown.interruptible_sleep(run.summary_interval()).await;

        info!("{}", provider.summary());
        if toasts.has_changed().unwrap_or(false) {
            for toast in toasts.borrow_and_update().iter() {
                match toast.message() {
                    Some(message) => info!("  [{}] {}: {}", toast.kind(), toast.title(), message),
                    None => info!("  [{}] {}", toast.kind(), toast.title()),
                }
            }
        }
    }

    let summary = provider.summary().to_string();
    provider.shutdown().await;
    run.print_shutdown(Some(&summary));

    Ok(())
}

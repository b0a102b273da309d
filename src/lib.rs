//! NFT Dashboard - Main Library
//!
//! Wires the realtime channel client, the toast queue and the REST client
//! into one application.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **app**: Configuration, logging and the [`app::DashboardProvider`]
//! - **realtime**: WebSocket channel client and feeds (re-exported from workspace)
//! - **toasts**: Toast queue (re-exported from workspace)
//! - **api_client**: REST client (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use nft_dashboard::app::{DashboardConfig, DashboardProvider};
//! use nft_dashboard::bin_common::{load_config_from_env, ConfigType};
//! ```

// Re-export workspace libraries for convenience
pub use api_client;
pub use realtime;
pub use toasts;

pub mod app {
    //! Application wiring shared by the binaries and integration tests

    pub mod config;
    pub mod logging;
    pub mod provider;

    pub use config::{ApiSettings, ConfigError, DashboardConfig, ToastSettings};
    pub use logging::init_tracing;
    pub use provider::{DashboardFeeds, DashboardProvider, DashboardSummary};
}

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{config_type_from_args, load_config_from_env, parse_args, ConfigType};
    pub use runner::{RunConfig, ShutdownManager};
}

pub mod analytics;
pub mod artifacts;
pub mod chains;
pub mod compiler;
pub mod deployer;
pub mod http_server;
pub mod imports;
pub mod settings;
pub mod storage;
pub mod sweeper;
pub mod types;
pub mod verification;

pub use self::settings::Settings;
pub use http_server::{configure_router, run as run_http_server, AppRouter, Router};

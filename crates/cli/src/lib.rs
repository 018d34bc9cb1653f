//! docqa command line and HTTP front end.

pub mod app;
pub mod channels;
pub mod commands;
pub mod config;
pub mod server;

pub use app::AppContext;
pub use config::AppConfig;

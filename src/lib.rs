pub mod config;
pub mod dashboard;
pub mod dashboard_ui;
pub mod filter;
pub mod map;
pub mod parser;
pub mod remote;
pub mod render_source;
pub mod store;

mod render_pool;

pub use config::DEFAULT_PORT;
pub use dashboard::Dashboard;
pub use remote::RemoteEvent;

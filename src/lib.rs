pub mod api;
pub mod bootstrap;
pub mod error;
pub mod insights;
pub mod logging;
pub mod refresh;
pub mod render;
pub mod retry;
pub mod session;
pub mod state;
pub mod transport;

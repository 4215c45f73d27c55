pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;

pub mod error;
pub mod logger;
pub mod metrics;

pub use error::{AppError, AppResult};

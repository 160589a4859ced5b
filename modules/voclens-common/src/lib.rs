pub mod config;
pub mod error;
pub mod fingerprint;
pub mod types;

pub use config::Config;
pub use error::{FetchError, VocLensError};
pub use fingerprint::review_fingerprint;
pub use types::*;

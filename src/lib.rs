pub mod constants;
pub mod error;
pub mod generator;
pub mod interfaces;
pub mod models;
pub mod parser;
pub mod settings;
pub mod utils;

// Re-export the main proxy types for easier access
pub use models::{Proxy, ProxyType, SubConfig, Subscription};

pub use error::{BuildError, FetchError};
pub use interfaces::{build_sub, render_sub, BuildContext};
pub use settings::Settings;

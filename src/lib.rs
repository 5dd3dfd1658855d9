pub mod fetch;
pub mod generator;
pub mod merge;
pub mod models;
pub mod parser;
pub mod settings;
pub mod utils;

// Re-export the main proxy types for easier access
pub use models::{Proxy, ProxyType};

pub use generator::proxy_to_uri;
pub use merge::Merger;
pub use parser::explode;

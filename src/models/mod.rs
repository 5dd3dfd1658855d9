//! Core data models for the application
//!
//! This module contains the primary data structures used throughout the
//! application, separated from the logic that operates on them.
//!
//! # Usage
//!
//! ```rust
//! use subcollector::models::{Proxy, ProxySettings, ShadowsocksSettings, ProxyType};
//!
//! let proxy = Proxy::new(
//!     "",
//!     "example.com",
//!     8388,
//!     ProxySettings::Shadowsocks(ShadowsocksSettings {
//!         cipher: "aes-256-gcm".to_string(),
//!         password: "secret".to_string(),
//!         plugin: None,
//!         plugin_opts: None,
//!     }),
//! );
//! assert_eq!(proxy.proxy_type(), ProxyType::Shadowsocks);
//! // Records never carry an empty name.
//! assert!(!proxy.name.is_empty());
//! ```

pub mod deserializer;
mod proxy;

pub use proxy::*;

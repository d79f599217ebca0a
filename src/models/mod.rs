//! Core data models for the application
//!
//! This module contains the documents and records the build pipeline moves
//! around, separated from the logic that operates on them.
//!
//! ```rust
//! use sub2clash::models::{Proxy, ProxyPayload, Trojan};
//!
//! let proxy = Proxy::new(
//!     "example",
//!     ProxyPayload::Trojan(Trojan {
//!         server: "example.com".to_string(),
//!         port: 443,
//!         password: "secret".to_string(),
//!         ..Default::default()
//!     }),
//! );
//! assert_eq!(proxy.port(), 443);
//! ```

pub mod proxy;
pub mod proxy_group;
pub mod rule_provider;
pub mod sub_config;
pub mod subscription;

pub use proxy::{
    GrpcOptions, Hysteria, Hysteria2, Proxy, ProxyPayload, ProxyType, RealityOptions,
    Shadowsocks, ShadowsocksR, Trojan, VMess, Vless, WsOptions,
};
pub use proxy_group::{ProxyGroup, ProxyGroupType};
pub use rule_provider::{content_key, RuleProvider};
pub use sub_config::{
    ClashType, RenamePair, RuleEntry, RuleProviderEntry, SortKey, SubConfig,
};
pub use subscription::Subscription;

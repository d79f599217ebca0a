pub mod common;
pub mod hysteria;
pub mod hysteria2;
pub mod ss;
pub mod ssr;
pub mod trojan;
pub mod vless;
pub mod vmess;

pub use hysteria::{explode_hysteria, HYSTERIA_PREFIXES};
pub use hysteria2::{explode_hysteria2, HYSTERIA2_PREFIXES};
pub use ss::{explode_ss, SS_PREFIXES};
pub use ssr::{explode_ssr, SSR_PREFIXES};
pub use trojan::{explode_trojan, TROJAN_PREFIXES};
pub use vless::{explode_vless, VLESS_PREFIXES};
pub use vmess::{explode_vmess, VMESS_PREFIXES};

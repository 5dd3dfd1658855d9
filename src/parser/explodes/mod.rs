pub mod clash;
pub mod common;
pub mod ss;
pub mod ssr;
pub mod trojan;
pub mod vmess;

pub use clash::explode_clash_fragment;
pub use common::{explode, explode_entry};
pub use ss::explode_ss;
pub use ssr::explode_ssr;
pub use trojan::explode_trojan;
pub use vmess::explode_vmess;

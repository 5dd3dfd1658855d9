pub mod clash;
pub mod output;
pub mod single;

// Re-export format converters
pub use clash::{proxies_to_clash_yaml, proxy_to_clash};
pub use output::{render_base64_list, render_clash_proxies, render_link_list, unrendered_fragments, Outputs};
pub use single::proxy_to_uri;

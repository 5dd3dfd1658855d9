use std::borrow::Cow;

use crate::models::{Proxy, ProxyType, RawEntry};
use crate::parser::types::{ExplodeError, ExplodeResult};

use super::{explode_clash_fragment, explode_ss, explode_ssr, explode_trojan, explode_vmess};

/// Explode a proxy link into a Proxy object
///
/// This function detects the type of proxy link and calls the appropriate parser.
pub fn explode(link: &str) -> ExplodeResult<Proxy> {
    let link = sanitize_scheme(link.trim());
    let (scheme, _) = link.split_once("://").ok_or(ExplodeError::NotALink)?;

    match ProxyType::from_scheme(scheme) {
        Some(ProxyType::VMess) => explode_vmess(&link),
        Some(ProxyType::Shadowsocks) => explode_ss(&link),
        Some(ProxyType::ShadowsocksR) => explode_ssr(&link),
        Some(ProxyType::Trojan) => explode_trojan(&link),
        None => Err(ExplodeError::unsupported(scheme)),
    }
}

/// Explode either kind of raw entry.
pub fn explode_entry(entry: &RawEntry) -> ExplodeResult<Proxy> {
    match entry {
        RawEntry::Link(link) => explode(link),
        RawEntry::Fragment(fragment) => explode_clash_fragment(fragment),
    }
}

/// Strips non-ASCII code points from the scheme.
///
/// Some producers decorate links with zero-width or emoji characters in
/// front of the scheme, e.g. `\u{200b}vmess://...`.
pub fn sanitize_scheme(link: &str) -> Cow<'_, str> {
    match link.split_once("://") {
        Some((scheme, rest)) if !scheme.is_ascii() => {
            let scheme: String = scheme.chars().filter(char::is_ascii).collect();
            Cow::Owned(format!("{}://{}", scheme, rest))
        }
        _ => Cow::Borrowed(link),
    }
}

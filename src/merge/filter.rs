//! Predicates used by the merger: candidate pre-filter, fake endpoint
//! detection and downstream capability checks.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::models::{Proxy, ProxySettings, UUID_LEN};

/// Characters that never appear in a usable link before its fragment.
const UNSAFE_LINK_CHARS: &[char] = &[' ', '|', '`', '[', ']', '(', ')'];

/// Sentinel addresses producers hand out in place of real endpoints.
const FAKE_SERVERS: &[&str] = &[
    "0.0.0.0",
    "127.0.0.1",
    "1.1.1.1",
    "1.0.0.1",
    "1.2.3.4",
    "8.8.8.8",
    "8.8.4.4",
    "114.114.114.114",
    "localhost",
    "google.com",
    "www.google.com",
    "baidu.com",
    "www.baidu.com",
];

static CLASH_CIPHER_VMESS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["auto", "aes-128-gcm", "chacha20-poly1305", "none"].into_iter().collect());

static CLASH_CIPHER_SS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "aes-128-gcm",
        "aes-192-gcm",
        "aes-256-gcm",
        "aes-128-cfb",
        "aes-192-cfb",
        "aes-256-cfb",
        "aes-128-ctr",
        "aes-192-ctr",
        "aes-256-ctr",
        "rc4-md5",
        "chacha20-ietf",
        "xchacha20",
        "chacha20-ietf-poly1305",
        "xchacha20-ietf-poly1305",
    ]
    .into_iter()
    .collect()
});

static CLASH_SSR_OBFS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "plain",
        "http_simple",
        "http_post",
        "random_head",
        "tls1.2_ticket_auth",
        "tls1.2_ticket_fastauth",
    ]
    .into_iter()
    .collect()
});

static CLASH_SSR_PROTOCOL: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "origin",
        "auth_sha1_v4",
        "auth_aes128_md5",
        "auth_aes128_sha1",
        "auth_chain_a",
        "auth_chain_b",
    ]
    .into_iter()
    .collect()
});

static CLASH_VMESS_NETWORK: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["tcp", "ws", "h2", "grpc", "http"].into_iter().collect());

/// Cheap textual check applied to link candidates before decoding.
///
/// The part after the first `#` is a display name and may contain anything.
pub fn is_link_candidate(link: &str) -> bool {
    if !link.is_ascii() || !link.contains("://") {
        return false;
    }
    if link.matches('#').count() > 1 {
        return false;
    }
    let body = link.split_once('#').map_or(link, |(body, _)| body);
    !body.contains(UNSAFE_LINK_CHARS) && body.matches('@').count() <= 1
}

/// Whether `server` is `sentinel` or a subdomain of it.
fn matches_sentinel(server: &str, sentinel: &str) -> bool {
    server == sentinel
        || server
            .strip_suffix(sentinel)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Placeholder endpoints are kept in the working set but never emitted.
pub fn is_fake(node: &Proxy) -> bool {
    let server = node.server.trim().to_ascii_lowercase();
    if server.is_empty() || !server.contains('.') {
        return true;
    }
    if FAKE_SERVERS
        .iter()
        .any(|sentinel| matches_sentinel(&server, sentinel))
    {
        return true;
    }
    match &node.settings {
        ProxySettings::VMess(vmess) => vmess.uuid.len() != UUID_LEN,
        _ => false,
    }
}

/// Whether Clash can load the record.
pub fn supports_clash(node: &Proxy) -> bool {
    match &node.settings {
        ProxySettings::VMess(vmess) => {
            (vmess.cipher.is_empty() || CLASH_CIPHER_VMESS.contains(vmess.cipher.as_str()))
                && CLASH_VMESS_NETWORK.contains(vmess.network.as_str())
        }
        ProxySettings::Shadowsocks(ss) => {
            ss.cipher.is_empty() || CLASH_CIPHER_SS.contains(ss.cipher.as_str())
        }
        ProxySettings::ShadowsocksR(ssr) => {
            if ssr.cipher.is_empty() {
                return true;
            }
            CLASH_CIPHER_SS.contains(ssr.cipher.as_str())
                && CLASH_SSR_OBFS.contains(ssr.obfs.as_str())
                && CLASH_SSR_PROTOCOL.contains(ssr.protocol.as_str())
        }
        ProxySettings::Trojan(_) => true,
    }
}

/// Whether V2Ray style clients can load the record's link.
pub fn supports_ray(node: &Proxy) -> bool {
    match &node.settings {
        ProxySettings::Shadowsocks(ss) => ss.plugin.as_deref().map_or(true, str::is_empty),
        ProxySettings::ShadowsocksR(_) => false,
        _ => true,
    }
}

use crate::models::{
    Proxy, ProxySettings, ShadowsocksRSettings, ShadowsocksSettings, TrojanSettings,
    VMessSettings,
};
use crate::parser::explodes::ss::plugin_to_string;
use crate::parser::explodes::vmess::VMessLink;
use crate::utils::base64::{base64_encode, url_safe_base64_encode, url_safe_base64_encode_no_pad};
use crate::utils::url::url_encode;

/// Convert a proxy to a single URI
///
/// The inverse of [`crate::parser::explodes::explode`]: re-applies the same
/// defaults and transport-option rules, and leaves out fields the record
/// does not have.
pub fn proxy_to_uri(node: &Proxy) -> String {
    match &node.settings {
        ProxySettings::VMess(vmess) => vmess_to_uri(node, vmess),
        ProxySettings::Shadowsocks(ss) => ss_to_uri(node, ss),
        ProxySettings::ShadowsocksR(ssr) => ssr_to_uri(node, ssr),
        ProxySettings::Trojan(trojan) => trojan_to_uri(node, trojan),
    }
}

/// Builds the v2rayN JSON object for a VMess record.
pub fn proxy_to_vmess_link(node: &Proxy, vmess: &VMessSettings) -> VMessLink {
    let mut link = VMessLink {
        ps: node.name.clone(),
        add: node.server.clone(),
        port: node.port.to_string(),
        id: vmess.uuid.clone(),
        aid: vmess.alter_id.to_string(),
        scy: vmess.cipher.clone(),
        net: vmess.network.clone(),
        sni: vmess.servername.clone(),
        ..Default::default()
    };
    if vmess.tls {
        link.tls = "tls".to_string();
    }

    match vmess.network.as_str() {
        "ws" => {
            if let Some(opts) = &vmess.ws_opts {
                link.host = opts.host().map(str::to_string);
                link.path = opts.path.clone();
            }
        }
        "h2" => {
            if let Some(opts) = &vmess.h2_opts {
                link.host = opts.host.first().cloned();
                link.path = opts.path.clone();
            }
        }
        "grpc" => {
            if let Some(opts) = &vmess.grpc_opts {
                link.path = opts.service_name.clone();
            }
        }
        _ => {}
    }

    link
}

// Format: vmess://BASE64(JSON)
fn vmess_to_uri(node: &Proxy, vmess: &VMessSettings) -> String {
    let link = proxy_to_vmess_link(node, vmess);
    let json = serde_json::to_string(&link).unwrap_or_default();
    format!("vmess://{}", base64_encode(&json))
}

// Format: ss://BASE64URL(method:password)@server:port[/?plugin=...]#remark
fn ss_to_uri(node: &Proxy, ss: &ShadowsocksSettings) -> String {
    let user_info = url_safe_base64_encode(&format!("{}:{}", ss.cipher, ss.password));
    let mut uri = format!("ss://{}@{}:{}", user_info, node.server, node.port);

    if let Some(plugin) = ss.plugin.as_deref().filter(|p| !p.is_empty()) {
        uri.push_str("/?plugin=");
        uri.push_str(&url_encode(&plugin_to_string(plugin, ss.plugin_opts.as_ref())));
    }

    uri.push('#');
    uri.push_str(&url_encode(&node.name));
    uri
}

// Format: ssr://BASE64URL(server:port:protocol:method:obfs:BASE64URL(password)/?remarks=...)
fn ssr_to_uri(node: &Proxy, ssr: &ShadowsocksRSettings) -> String {
    let mut plain_text = format!(
        "{}:{}:{}:{}:{}:{}/?remarks={}",
        node.server,
        node.port,
        ssr.protocol,
        ssr.cipher,
        ssr.obfs,
        url_safe_base64_encode_no_pad(&ssr.password),
        url_safe_base64_encode_no_pad(&node.name),
    );

    for (key, value) in [
        ("obfsparam", &ssr.obfs_param),
        ("protoparam", &ssr.protocol_param),
        ("group", &ssr.group),
    ] {
        if let Some(value) = value {
            plain_text.push_str(&format!(
                "&{}={}",
                key,
                url_safe_base64_encode_no_pad(value)
            ));
        }
    }

    format!("ssr://{}", url_safe_base64_encode_no_pad(&plain_text))
}

// Format: trojan://password@server:port?sni=...&type=ws&host=...&path=...#remark
fn trojan_to_uri(node: &Proxy, trojan: &TrojanSettings) -> String {
    let mut params = Vec::new();

    if let Some(skip_cert_verify) = trojan.skip_cert_verify {
        params.push(format!("allowInsecure={}", u8::from(skip_cert_verify)));
    }
    if let Some(sni) = &trojan.sni {
        params.push(format!("sni={}", url_encode(sni)));
    }
    if let Some(alpn) = &trojan.alpn {
        if alpn.len() >= 2 {
            params.push("alpn=h2%2Chttp%2F1.1".to_string());
        } else if let Some(first) = alpn.first() {
            params.push(format!("alpn={}", url_encode(first)));
        }
    }
    if let Some(network) = &trojan.network {
        params.push(format!("type={}", url_encode(network)));
    }

    match trojan.network.as_deref() {
        Some("grpc") => {
            if let Some(name) = trojan.grpc_opts.as_ref().and_then(|o| o.service_name.as_ref()) {
                params.push(format!("serviceName={}", url_encode(name)));
            }
        }
        Some("h2") => {
            if let Some(opts) = &trojan.h2_opts {
                if let Some(host) = opts.host.first() {
                    params.push(format!("host={}", url_encode(host)));
                }
                if let Some(path) = &opts.path {
                    params.push(format!("path={}", url_encode(path)));
                }
            }
        }
        Some("ws") | None => {
            if let Some(opts) = &trojan.ws_opts {
                if let Some(host) = opts.host() {
                    params.push(format!("host={}", url_encode(host)));
                }
                if let Some(path) = &opts.path {
                    params.push(format!("path={}", url_encode(path)));
                }
            }
        }
        Some(_) => {}
    }

    let mut uri = format!(
        "trojan://{}@{}:{}",
        url_encode(&trojan.password),
        node.server,
        node.port
    );
    if !params.is_empty() {
        uri.push('?');
        uri.push_str(&params.join("&"));
    }
    uri.push('#');
    uri.push_str(&url_encode(&node.name));
    uri
}

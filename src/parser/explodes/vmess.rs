use serde::{Deserialize, Serialize};

use crate::models::deserializer::{opt_string_or_number, parse_port, string_or_number};
use crate::models::{
    GrpcOptions, H2Options, Proxy, ProxySettings, VMessSettings, WsOptions, PLACEHOLDER_UUID,
};
use crate::parser::types::{ExplodeError, ExplodeResult};
use crate::utils::base64::base64_decode;

/// The JSON object wrapped inside a `vmess://` link (v2rayN format).
///
/// Every field missing from a link falls back to the value in [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VMessLink {
    #[serde(deserialize_with = "string_or_number")]
    pub v: String,
    #[serde(deserialize_with = "string_or_number")]
    pub ps: String,
    #[serde(deserialize_with = "string_or_number")]
    pub add: String,
    #[serde(deserialize_with = "string_or_number")]
    pub port: String,
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub aid: String,
    #[serde(deserialize_with = "string_or_number")]
    pub scy: String,
    #[serde(deserialize_with = "string_or_number")]
    pub net: String,
    #[serde(rename = "type", deserialize_with = "string_or_number")]
    pub header_type: String,
    #[serde(
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub host: Option<String>,
    #[serde(
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub path: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub tls: String,
    #[serde(
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub sni: Option<String>,
}

impl Default for VMessLink {
    fn default() -> Self {
        VMessLink {
            v: "2".to_string(),
            ps: String::new(),
            add: "0.0.0.0".to_string(),
            port: "0".to_string(),
            id: PLACEHOLDER_UUID.to_string(),
            aid: "0".to_string(),
            scy: "auto".to_string(),
            net: "tcp".to_string(),
            header_type: "none".to_string(),
            host: None,
            path: None,
            tls: String::new(),
            sni: None,
        }
    }
}

/// Parse a VMess link into a Proxy object
pub fn explode_vmess(vmess: &str) -> ExplodeResult<Proxy> {
    let encoded = vmess
        .strip_prefix("vmess://")
        .ok_or(ExplodeError::NotALink)?;

    let decoded = base64_decode(encoded)
        .ok_or_else(|| ExplodeError::unsupported_payload("vmess", "payload is not base64"))?;
    let link: VMessLink = serde_json::from_str(&decoded)
        .map_err(|e| ExplodeError::unsupported_payload("vmess", format!("invalid json: {}", e)))?;

    vmess_link_to_proxy(link)
}

fn vmess_link_to_proxy(link: VMessLink) -> ExplodeResult<Proxy> {
    let port = parse_port(&link.port)
        .ok_or_else(|| ExplodeError::malformed(format!("invalid vmess port: {}", link.port)))?;
    let alter_id = match link.aid.trim() {
        "" => 0,
        aid => aid
            .parse::<u32>()
            .map_err(|_| ExplodeError::malformed(format!("invalid vmess alterId: {}", aid)))?,
    };

    let mut settings = VMessSettings {
        uuid: link.id,
        alter_id,
        cipher: link.scy,
        tls: link.tls == "tls",
        servername: link.sni.filter(|sni| !sni.is_empty()),
        network: link.net,
        ws_opts: None,
        h2_opts: None,
        grpc_opts: None,
    };

    // Transport options only make sense for the matching network.
    match settings.network.as_str() {
        "ws" => {
            let mut opts = WsOptions {
                path: link.path,
                ..Default::default()
            };
            if let Some(host) = link.host {
                opts.set_host(host);
            }
            settings.ws_opts = Some(opts);
        }
        "h2" => {
            settings.h2_opts = Some(H2Options {
                host: link.host.into_iter().collect(),
                path: link.path,
            });
        }
        "grpc" => {
            settings.grpc_opts = Some(GrpcOptions {
                service_name: link.path,
            });
        }
        _ => {}
    }

    Ok(Proxy::new(
        link.ps,
        link.add,
        port,
        ProxySettings::VMess(settings),
    ))
}

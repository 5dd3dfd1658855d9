use url::Url;

use crate::models::{GrpcOptions, H2Options, Proxy, ProxySettings, TrojanSettings, WsOptions};
use crate::parser::types::{ExplodeError, ExplodeResult};
use crate::utils::url::{split_query, url_decode};

/// ALPN list substituted for any multi-value `alpn` parameter.
pub const COLLAPSED_ALPN: [&str; 2] = ["h2", "http/1.1"];

/// Parse a Trojan link into a Proxy object
///
/// Format: `trojan://password@server:port?sni=...&type=ws&host=...&path=...#remark`
pub fn explode_trojan(trojan: &str) -> ExplodeResult<Proxy> {
    if !trojan.starts_with("trojan://") {
        return Err(ExplodeError::NotALink);
    }

    let url = Url::parse(trojan)
        .map_err(|e| ExplodeError::malformed(format!("invalid trojan url: {}", e)))?;

    let password = url_decode(url.username());
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| ExplodeError::malformed("trojan link has no server"))?;
    let port = url
        .port()
        .filter(|port| *port != 0)
        .ok_or_else(|| ExplodeError::malformed("trojan link has no valid port"))?;
    let name = url.fragment().map(url_decode).unwrap_or_default();

    let mut settings = TrojanSettings {
        password,
        sni: None,
        alpn: None,
        skip_cert_verify: None,
        network: None,
        ws_opts: None,
        h2_opts: None,
        grpc_opts: None,
    };

    // Query values are inspected raw: the ALPN check looks for an encoded comma.
    let mut ws_host = None;
    let mut ws_path = None;
    let mut service_name = None;
    for (key, value) in split_query(url.query().unwrap_or_default()) {
        match key {
            "allowInsecure" => {
                settings.skip_cert_verify = Some(value == "1" || value.eq_ignore_ascii_case("true"))
            }
            "sni" | "peer" => settings.sni = Some(url_decode(value)),
            "alpn" => {
                // Any list collapses to the common pair rather than being parsed.
                settings.alpn = Some(if value.contains("%2C") || value.contains(',') {
                    COLLAPSED_ALPN.iter().map(|s| s.to_string()).collect()
                } else {
                    vec![url_decode(value)]
                });
            }
            "type" => settings.network = Some(url_decode(value)),
            "serviceName" => service_name = Some(url_decode(value)),
            "host" => ws_host = Some(url_decode(value)),
            "path" => ws_path = Some(url_decode(value)),
            _ => {}
        }
    }

    match settings.network.as_deref() {
        Some("grpc") => {
            settings.grpc_opts = Some(GrpcOptions { service_name });
        }
        Some("h2") => {
            if ws_host.is_some() || ws_path.is_some() {
                settings.h2_opts = Some(H2Options {
                    host: ws_host.into_iter().collect(),
                    path: ws_path,
                });
            }
        }
        Some("ws") | None => {
            if ws_host.is_some() || ws_path.is_some() {
                let mut opts = WsOptions {
                    path: ws_path,
                    ..Default::default()
                };
                if let Some(host) = ws_host {
                    opts.set_host(host);
                }
                settings.ws_opts = Some(opts);
            }
        }
        Some(_) => {}
    }

    Ok(Proxy::new(name, host, port, ProxySettings::Trojan(settings)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::single::proxy_to_uri;

    fn trojan_settings(proxy: &Proxy) -> &TrojanSettings {
        match &proxy.settings {
            ProxySettings::Trojan(trojan) => trojan,
            other => panic!("expected trojan settings, got {:?}", other),
        }
    }

    #[test]
    fn test_explode_trojan_ws() {
        let proxy = explode_trojan(
            "trojan://p%40ss@t.example.com:443?allowInsecure=1&sni=sni.example.com&type=ws&host=cdn.example.com&path=%2Fws#Trojan%20WS",
        )
        .unwrap();
        assert_eq!(proxy.server, "t.example.com");
        assert_eq!(proxy.port, 443);
        assert_eq!(proxy.name, "Trojan WS");
        let trojan = trojan_settings(&proxy);
        assert_eq!(trojan.password, "p@ss");
        assert_eq!(trojan.skip_cert_verify, Some(true));
        assert_eq!(trojan.sni.as_deref(), Some("sni.example.com"));
        assert_eq!(trojan.network.as_deref(), Some("ws"));
        let ws = trojan.ws_opts.as_ref().unwrap();
        assert_eq!(ws.path.as_deref(), Some("/ws"));
        assert_eq!(ws.host(), Some("cdn.example.com"));
    }

    #[test]
    fn test_explode_trojan_alpn_collapses_lists() {
        let proxy =
            explode_trojan("trojan://pw@t.example.com:443?alpn=h3%2Ch2%2Chttp%2F1.1#A").unwrap();
        assert_eq!(
            trojan_settings(&proxy).alpn,
            Some(vec!["h2".to_string(), "http/1.1".to_string()])
        );

        let proxy = explode_trojan("trojan://pw@t.example.com:443?alpn=http%2F1.1#A").unwrap();
        assert_eq!(
            trojan_settings(&proxy).alpn,
            Some(vec!["http/1.1".to_string()])
        );
    }

    #[test]
    fn test_explode_trojan_grpc() {
        let proxy = explode_trojan(
            "trojan://pw@g.example.com:443?type=grpc&serviceName=tunnel#gRPC",
        )
        .unwrap();
        let trojan = trojan_settings(&proxy);
        assert_eq!(
            trojan.grpc_opts.as_ref().unwrap().service_name.as_deref(),
            Some("tunnel")
        );
        assert!(trojan.ws_opts.is_none());
    }

    #[test]
    fn test_explode_trojan_requires_port() {
        assert!(matches!(
            explode_trojan("trojan://pw@t.example.com#nope"),
            Err(ExplodeError::MalformedEntry(_))
        ));
    }

    #[test]
    fn test_trojan_round_trip() {
        let proxy = explode_trojan(
            "trojan://pass%20word@t.example.com:8443?allowInsecure=0&sni=s.example.com&alpn=h2%2Chttp%2F1.1&type=ws&host=h.example.com&path=%2Fpath%3Fed%3D2048#Round%20Trip",
        )
        .unwrap();
        assert_eq!(explode_trojan(&proxy_to_uri(&proxy)).unwrap(), proxy);
    }
}

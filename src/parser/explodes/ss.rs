use std::collections::BTreeMap;

use crate::models::deserializer::parse_port;
use crate::models::{Proxy, ProxySettings, ShadowsocksSettings};
use crate::parser::types::{ExplodeError, ExplodeResult};
use crate::utils::base64::base64_decode;
use crate::utils::url::{split_query, url_decode};

/// Parse a Shadowsocks link into a Proxy object
///
/// Accepts the SIP002 form `ss://userinfo@host:port[/?plugin=...]#name`, where
/// `userinfo` is either `cipher:password` or its URL-safe Base64, and the
/// legacy form `ss://BASE64(cipher:password@host:port)#name`.
pub fn explode_ss(ss: &str) -> ExplodeResult<Proxy> {
    let content = ss.strip_prefix("ss://").ok_or(ExplodeError::NotALink)?;

    // Extract fragment (remark) if present
    let (content, name) = match content.split_once('#') {
        Some((body, fragment)) => (body, url_decode(fragment)),
        None => (content, String::new()),
    };

    // Extract plugin and other query parameters
    let (content, query) = match content.split_once('?') {
        Some((body, query)) => (body.trim_end_matches('/'), Some(query)),
        None => (content.trim_end_matches('/'), None),
    };

    let (userinfo, server_port) = match content.rsplit_once('@') {
        Some((userinfo, server_port)) => (userinfo.to_string(), server_port.to_string()),
        None => {
            let decoded = base64_decode(content)
                .ok_or_else(|| ExplodeError::malformed("ss link has no server part"))?;
            let (userinfo, server_port) = decoded
                .rsplit_once('@')
                .ok_or_else(|| ExplodeError::malformed("ss link has no server part"))?;
            (userinfo.to_string(), server_port.to_string())
        }
    };

    let (server, port) = server_port
        .rsplit_once(':')
        .ok_or_else(|| ExplodeError::malformed(format!("ss server has no port: {}", server_port)))?;
    let port = parse_port(port)
        .ok_or_else(|| ExplodeError::malformed(format!("invalid ss port: {}", port)))?;

    // A literal colon means the credentials were not encoded.
    let userinfo = if userinfo.contains(':') {
        url_decode(&userinfo)
    } else {
        base64_decode(&userinfo)
            .ok_or_else(|| ExplodeError::malformed("ss userinfo is not base64"))?
    };
    let (cipher, password) = match userinfo.split_once(':') {
        Some((cipher, password)) => (cipher.to_string(), password.to_string()),
        None => (userinfo, String::new()),
    };

    let mut settings = ShadowsocksSettings {
        cipher,
        password,
        plugin: None,
        plugin_opts: None,
    };
    if let Some(query) = query {
        for (key, value) in split_query(query) {
            if key == "plugin" {
                let (plugin, opts) = parse_plugin(&url_decode(value));
                settings.plugin = Some(plugin);
                settings.plugin_opts = opts;
            }
        }
    }

    Ok(Proxy::new(
        name,
        server,
        port,
        ProxySettings::Shadowsocks(settings),
    ))
}

/// Splits a SIP003 plugin string `name;key=value;flag` into name and options.
fn parse_plugin(plugin: &str) -> (String, Option<BTreeMap<String, serde_yaml::Value>>) {
    let mut parts = plugin.split(';');
    let name = parts.next().unwrap_or_default().to_string();
    let opts: BTreeMap<String, serde_yaml::Value> = parts
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) => (key.to_string(), serde_yaml::Value::String(value.to_string())),
            None => (part.to_string(), serde_yaml::Value::Bool(true)),
        })
        .collect();
    (name, (!opts.is_empty()).then_some(opts))
}

/// Renders plugin options back into the SIP003 `name;key=value` form.
pub fn plugin_to_string(plugin: &str, opts: Option<&BTreeMap<String, serde_yaml::Value>>) -> String {
    let mut result = plugin.to_string();
    for (key, value) in opts.into_iter().flatten() {
        result.push(';');
        match value {
            serde_yaml::Value::Bool(true) => result.push_str(key),
            serde_yaml::Value::String(text) => result.push_str(&format!("{}={}", key, text)),
            other => {
                let text = serde_yaml::to_string(other).unwrap_or_default();
                result.push_str(&format!("{}={}", key, text.trim()));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::single::proxy_to_uri;
    use crate::models::ProxyType;

    fn ss_settings(proxy: &Proxy) -> &ShadowsocksSettings {
        match &proxy.settings {
            ProxySettings::Shadowsocks(ss) => ss,
            other => panic!("expected ss settings, got {:?}", other),
        }
    }

    #[test]
    fn test_explode_ss_base64_userinfo() {
        let proxy = explode_ss("ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:443#Test").unwrap();
        assert_eq!(proxy.proxy_type(), ProxyType::Shadowsocks);
        assert_eq!(proxy.server, "1.2.3.4");
        assert_eq!(proxy.port, 443);
        assert_eq!(proxy.name, "Test");
        assert_eq!(ss_settings(&proxy).cipher, "aes-256-gcm");
        assert_eq!(ss_settings(&proxy).password, "pass");
    }

    #[test]
    fn test_explode_ss_plain_userinfo_and_encoded_name() {
        let proxy = explode_ss("ss://chacha20-ietf-poly1305:p%40ss@ss.example.com:8388#%E9%A6%99%E6%B8%AF").unwrap();
        assert_eq!(proxy.name, "香港");
        assert_eq!(ss_settings(&proxy).cipher, "chacha20-ietf-poly1305");
        assert_eq!(ss_settings(&proxy).password, "p@ss");
    }

    #[test]
    fn test_explode_ss_legacy_form() {
        // base64("aes-128-gcm:secret@legacy.example.com:8388")
        let proxy =
            explode_ss("ss://YWVzLTEyOC1nY206c2VjcmV0QGxlZ2FjeS5leGFtcGxlLmNvbTo4Mzg4#Legacy")
                .unwrap();
        assert_eq!(proxy.server, "legacy.example.com");
        assert_eq!(proxy.port, 8388);
        assert_eq!(ss_settings(&proxy).password, "secret");
    }

    #[test]
    fn test_explode_ss_plugin() {
        let proxy = explode_ss(
            "ss://YWVzLTI1Ni1nY206cGFzcw@p.example.com:443/?plugin=obfs-local%3Bobfs%3Dhttp%3Bobfs-host%3Dcdn.example.com#P",
        )
        .unwrap();
        let ss = ss_settings(&proxy);
        assert_eq!(ss.plugin.as_deref(), Some("obfs-local"));
        let opts = ss.plugin_opts.as_ref().unwrap();
        assert_eq!(opts["obfs"], serde_yaml::Value::String("http".into()));
        assert_eq!(
            opts["obfs-host"],
            serde_yaml::Value::String("cdn.example.com".into())
        );
    }

    #[test]
    fn test_explode_ss_bad_port() {
        assert!(matches!(
            explode_ss("ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:http#Test"),
            Err(ExplodeError::MalformedEntry(_))
        ));
    }

    #[test]
    fn test_ss_reencode_is_byte_identical() {
        let link = "ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:443#Test";
        let proxy = explode_ss(link).unwrap();
        assert_eq!(proxy_to_uri(&proxy), link);
    }

    #[test]
    fn test_ss_plugin_round_trip() {
        let proxy = explode_ss(
            "ss://YWVzLTI1Ni1nY206cGFzcw@p.example.com:443/?plugin=v2ray-plugin%3Btls%3Bhost%3Da.com#P",
        )
        .unwrap();
        assert_eq!(explode_ss(&proxy_to_uri(&proxy)).unwrap(), proxy);
    }
}

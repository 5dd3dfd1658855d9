use serde_yaml::{Mapping, Value};

use crate::models::{Proxy, ProxyType};
use crate::parser::types::{ExplodeError, ExplodeResult};

/// Parse one entry of a Clash `proxies` list into a Proxy object.
///
/// Unknown `type` tags are reported as [`ExplodeError::UnsupportedKind`] so the
/// caller can keep them; any other deserialization problem is malformed.
pub fn explode_clash_fragment(fragment: &Mapping) -> ExplodeResult<Proxy> {
    let proxy_type = match fragment.get("type") {
        Some(Value::String(tag)) => tag.as_str(),
        Some(_) => return Err(ExplodeError::malformed("proxy type is not a string")),
        None => return Err(ExplodeError::malformed("proxy has no type")),
    };
    if ProxyType::from_scheme(proxy_type).is_none() {
        return Err(ExplodeError::unsupported(proxy_type));
    }

    let value = strip_tags(Value::Mapping(fragment.clone()));
    let mut proxy: Proxy = serde_yaml::from_value(value).map_err(|e| {
        ExplodeError::malformed(format!("invalid {} proxy: {}", proxy_type, e))
    })?;
    proxy.ensure_name();
    Ok(proxy)
}

/// Replaces tagged values (`!!str 123`, `!<str> 123`) with their inner value.
pub fn strip_tags(value: Value) -> Value {
    match value {
        Value::Tagged(tagged) => strip_tags(tagged.value),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(strip_tags).collect()),
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (strip_tags(k), strip_tags(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxySettings;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_shadowsocks_fragment_with_numeric_password() {
        let proxy = explode_clash_fragment(&mapping(
            r#"
name: "Test SS"
type: ss
server: example.com
port: "8388"
cipher: aes-256-gcm
password: 123456
udp: true
"#,
        ))
        .unwrap();
        assert_eq!(proxy.name, "Test SS");
        assert_eq!(proxy.port, 8388);
        let ProxySettings::Shadowsocks(ss) = &proxy.settings else {
            panic!("expected ss settings");
        };
        assert_eq!(ss.password, "123456");
    }

    #[test]
    fn test_parse_vmess_fragment_with_ws_opts() {
        let proxy = explode_clash_fragment(&mapping(
            r#"
name: v
type: vmess
server: v.example.com
port: 443
uuid: b831381d-6324-4d53-ad4f-8cda48b30811
alterId: 0
cipher: auto
tls: true
network: ws
ws-opts:
  path: /ray
  headers:
    Host: cdn.example.com
"#,
        ))
        .unwrap();
        let ProxySettings::VMess(vmess) = &proxy.settings else {
            panic!("expected vmess settings");
        };
        assert!(vmess.tls);
        assert_eq!(vmess.ws_opts.as_ref().unwrap().host(), Some("cdn.example.com"));
    }

    #[test]
    fn test_parse_tagged_password() {
        let proxy = explode_clash_fragment(&mapping(
            "{name: t, type: trojan, server: t.example.com, port: 443, password: !secret hunter2}",
        ))
        .unwrap();
        let ProxySettings::Trojan(trojan) = &proxy.settings else {
            panic!("expected trojan settings");
        };
        assert_eq!(trojan.password, "hunter2");
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let err = explode_clash_fragment(&mapping(
            "{name: h, type: hysteria2, server: h.example.com, port: 443}",
        ))
        .unwrap_err();
        assert_eq!(err, ExplodeError::unsupported("hysteria2"));
    }

    #[test]
    fn test_missing_name_gets_placeholder() {
        let proxy = explode_clash_fragment(&mapping(
            "{type: ss, server: s.example.com, port: 1, cipher: none, password: x}",
        ))
        .unwrap();
        assert_eq!(proxy.name, crate::models::DEFAULT_NAME);
    }

    #[test]
    fn test_invalid_port_is_malformed() {
        let err = explode_clash_fragment(&mapping(
            "{name: s, type: ss, server: s.example.com, port: abc, cipher: none, password: x}",
        ))
        .unwrap_err();
        assert!(matches!(err, ExplodeError::MalformedEntry(_)));
    }
}

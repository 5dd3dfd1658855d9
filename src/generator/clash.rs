use log::error;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::models::{Proxy, ProxySettings, PLACEHOLDER_UUID, UUID_LEN};

/// Fields kept on the record for bookkeeping only.
const INTERNAL_FIELDS: &[&str] = &["group"];

/// Convert a proxy to a Clash `proxies` entry.
///
/// Secrets are always emitted as YAML strings, so a password such as
/// `123456` is quoted instead of being read back as a number. A vmess uuid
/// with the wrong length is replaced by the placeholder uuid.
pub fn proxy_to_clash(node: &Proxy) -> Mapping {
    let mut node = node.clone();
    if let ProxySettings::VMess(vmess) = &mut node.settings {
        if vmess.uuid.len() != UUID_LEN {
            vmess.uuid = PLACEHOLDER_UUID.to_string();
        }
    }

    let mut fragment = match serde_yaml::to_value(&node) {
        Ok(YamlValue::Mapping(map)) => map,
        Ok(_) => Mapping::new(),
        Err(e) => {
            error!("Failed to serialize proxy {}: {}", node.name, e);
            Mapping::new()
        }
    };

    for field in INTERNAL_FIELDS {
        fragment.remove(*field);
    }
    if let Some(password) = node.password() {
        fragment.insert(
            YamlValue::String("password".to_string()),
            YamlValue::String(password.to_string()),
        );
    }
    fragment
}

/// Render a list of proxies as a YAML document with a single `proxies` key.
pub fn proxies_to_clash_yaml<'a>(nodes: impl IntoIterator<Item = &'a Proxy>) -> String {
    let proxies: Vec<YamlValue> = nodes
        .into_iter()
        .map(|node| YamlValue::Mapping(proxy_to_clash(node)))
        .collect();

    let mut document = Mapping::new();
    document.insert(
        YamlValue::String("proxies".to_string()),
        YamlValue::Sequence(proxies),
    );
    serde_yaml::to_string(&document).unwrap_or_else(|e| {
        error!("Failed to render clash proxies: {}", e);
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ShadowsocksRSettings, VMessSettings};
    use crate::parser::explodes::explode_clash_fragment;

    fn vmess(uuid: &str) -> Proxy {
        Proxy::new(
            "v",
            "v.example.com",
            443,
            ProxySettings::VMess(VMessSettings {
                uuid: uuid.to_string(),
                alter_id: 0,
                cipher: "auto".to_string(),
                tls: false,
                servername: None,
                network: "tcp".to_string(),
                ws_opts: None,
                h2_opts: None,
                grpc_opts: None,
            }),
        )
    }

    #[test]
    fn test_short_uuid_is_replaced() {
        let fragment = proxy_to_clash(&vmess("1234"));
        assert_eq!(
            fragment.get("uuid"),
            Some(&YamlValue::String(PLACEHOLDER_UUID.to_string()))
        );
        assert_eq!(fragment.get("type"), Some(&YamlValue::String("vmess".to_string())));
    }

    #[test]
    fn test_numeric_password_stays_text() {
        let proxy = Proxy::new(
            "r",
            "r.example.com",
            8388,
            ProxySettings::ShadowsocksR(ShadowsocksRSettings {
                cipher: "aes-256-cfb".to_string(),
                password: "123456".to_string(),
                protocol: "origin".to_string(),
                obfs: "plain".to_string(),
                protocol_param: None,
                obfs_param: None,
                group: Some("provider".to_string()),
            }),
        );
        let fragment = proxy_to_clash(&proxy);
        assert!(fragment.get("group").is_none());

        let yaml = proxies_to_clash_yaml([&proxy]);
        assert!(yaml.contains("password: '123456'"), "{}", yaml);

        let reparsed = explode_clash_fragment(&fragment).unwrap();
        assert_eq!(reparsed.identity(), proxy.identity());
        assert_eq!(reparsed.password(), Some("123456"));
    }
}

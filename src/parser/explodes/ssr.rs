use crate::models::deserializer::parse_port;
use crate::models::{Proxy, ProxySettings, ShadowsocksRSettings};
use crate::parser::types::{ExplodeError, ExplodeResult};
use crate::utils::base64::base64_decode;
use crate::utils::url::split_query;

/// Parse a ShadowsocksR link into a Proxy object
///
/// Format: `ssr://BASE64(server:port:protocol:method:obfs:BASE64(password)/?remarks=BASE64(remark)&...)`.
/// When the payload already contains a literal `?` it is taken as-is.
pub fn explode_ssr(ssr: &str) -> ExplodeResult<Proxy> {
    let encoded = ssr.strip_prefix("ssr://").ok_or(ExplodeError::NotALink)?;

    let decoded = if encoded.contains('?') {
        encoded.to_string()
    } else {
        base64_decode(encoded).ok_or_else(|| ExplodeError::malformed("ssr payload is not base64"))?
    };

    let (main, query) = match decoded.split_once("/?") {
        Some((main, query)) => (main, query),
        None => (decoded.trim_end_matches('/'), ""),
    };

    // Split from the right so an IPv6 server keeps its colons.
    let parts: Vec<&str> = main.rsplitn(6, ':').collect();
    if parts.len() != 6 {
        return Err(ExplodeError::malformed(format!(
            "ssr link has {} fields, expected 6",
            parts.len()
        )));
    }
    let (password, obfs, cipher, protocol, port, server) =
        (parts[0], parts[1], parts[2], parts[3], parts[4], parts[5]);

    let port = parse_port(port)
        .ok_or_else(|| ExplodeError::malformed(format!("invalid ssr port: {}", port)))?;
    let password = base64_decode(password)
        .ok_or_else(|| ExplodeError::malformed("ssr password is not base64"))?;

    let mut name = String::new();
    let mut settings = ShadowsocksRSettings {
        cipher: cipher.to_string(),
        password,
        protocol: protocol.to_string(),
        obfs: obfs.to_string(),
        protocol_param: None,
        obfs_param: None,
        group: None,
    };

    for (key, value) in split_query(query) {
        let value = decode_param(value);
        match key {
            "remarks" => name = value,
            "group" => settings.group = Some(value),
            "obfsparam" => settings.obfs_param = Some(value),
            "protoparam" => settings.protocol_param = Some(value),
            _ => {}
        }
    }

    Ok(Proxy::new(
        name,
        server,
        port,
        ProxySettings::ShadowsocksR(settings),
    ))
}

/// SSR query values are URL-safe Base64; some producers leave them in clear.
fn decode_param(value: &str) -> String {
    base64_decode(value).unwrap_or_else(|| value.to_string())
}

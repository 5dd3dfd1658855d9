//! Proxy model definitions
//!
//! Contains the canonical record every supported link dialect is decoded
//! into, and the raw entries pulled out of subscription bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use super::deserializer::{opt_string_or_number, port, string_or_number, u32_or_string};

/// Placeholder display name for records that arrive without one.
pub const DEFAULT_NAME: &str = "未命名";

/// Identifier used by the vmess link template and as a stand-in for forged ids.
pub const PLACEHOLDER_UUID: &str = "88888888-8888-8888-8888-888888888888";

/// Length of a canonical textual uuid.
pub const UUID_LEN: usize = 36;

/// Represents the type of a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProxyType {
    VMess,
    Shadowsocks,
    ShadowsocksR,
    Trojan,
}

impl ProxyType {
    /// Link scheme, which is also the Clash `type` tag.
    pub fn scheme(self) -> &'static str {
        match self {
            ProxyType::VMess => "vmess",
            ProxyType::Shadowsocks => "ss",
            ProxyType::ShadowsocksR => "ssr",
            ProxyType::Trojan => "trojan",
        }
    }

    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "vmess" => Some(ProxyType::VMess),
            "ss" => Some(ProxyType::Shadowsocks),
            "ssr" => Some(ProxyType::ShadowsocksR),
            "trojan" => Some(ProxyType::Trojan),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn to_string(self) -> &'static str {
        match self {
            ProxyType::VMess => "VMess",
            ProxyType::Shadowsocks => "SS",
            ProxyType::ShadowsocksR => "SSR",
            ProxyType::Trojan => "Trojan",
        }
    }
}

/// Deduplication key: two records with the same identity are the same endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyIdentity {
    pub proxy_type: ProxyType,
    pub server: String,
    pub port: u16,
}

/// WebSocket transport options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl WsOptions {
    pub fn host(&self) -> Option<&str> {
        self.headers.get("Host").map(String::as_str)
    }

    pub fn set_host(&mut self, host: String) {
        self.headers.insert("Host".to_string(), host);
    }
}

/// HTTP/2 transport options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct H2Options {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// gRPC transport options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrpcOptions {
    #[serde(
        rename = "grpc-service-name",
        skip_serializing_if = "Option::is_none"
    )]
    pub service_name: Option<String>,
}

fn default_auto() -> String {
    "auto".to_string()
}

fn default_tcp() -> String {
    "tcp".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VMessSettings {
    #[serde(deserialize_with = "string_or_number")]
    pub uuid: String,
    #[serde(rename = "alterId", default, deserialize_with = "u32_or_string")]
    pub alter_id: u32,
    #[serde(default = "default_auto", deserialize_with = "string_or_number")]
    pub cipher: String,
    #[serde(default)]
    pub tls: bool,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub servername: Option<String>,
    #[serde(default = "default_tcp")]
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h2_opts: Option<H2Options>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShadowsocksSettings {
    #[serde(deserialize_with = "string_or_number")]
    pub cipher: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_opts: Option<BTreeMap<String, serde_yaml::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShadowsocksRSettings {
    #[serde(deserialize_with = "string_or_number")]
    pub cipher: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub password: String,
    #[serde(deserialize_with = "string_or_number")]
    pub protocol: String,
    #[serde(deserialize_with = "string_or_number")]
    pub obfs: String,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub protocol_param: Option<String>,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub obfs_param: Option<String>,
    /// Provider group; bookkeeping only, stripped from Clash output.
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrojanSettings {
    #[serde(deserialize_with = "string_or_number")]
    pub password: String,
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub sni: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h2_opts: Option<H2Options>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOptions>,
}

/// Protocol-specific part of a proxy, tagged with the Clash `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProxySettings {
    #[serde(rename = "vmess")]
    VMess(VMessSettings),
    #[serde(rename = "ss")]
    Shadowsocks(ShadowsocksSettings),
    #[serde(rename = "ssr")]
    ShadowsocksR(ShadowsocksRSettings),
    #[serde(rename = "trojan")]
    Trojan(TrojanSettings),
}

impl ProxySettings {
    pub fn proxy_type(&self) -> ProxyType {
        match self {
            ProxySettings::VMess(_) => ProxyType::VMess,
            ProxySettings::Shadowsocks(_) => ProxyType::Shadowsocks,
            ProxySettings::ShadowsocksR(_) => ProxyType::ShadowsocksR,
            ProxySettings::Trojan(_) => ProxyType::Trojan,
        }
    }
}

/// The canonical record: one proxy endpoint, whatever dialect it came from.
///
/// Serializes to (and deserializes from) a Clash `proxies` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proxy {
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub server: String,
    #[serde(deserialize_with = "port")]
    pub port: u16,
    #[serde(flatten)]
    pub settings: ProxySettings,
}

impl Proxy {
    /// Builds a record, substituting the placeholder for an empty name.
    pub fn new(name: impl Into<String>, server: impl Into<String>, port: u16, settings: ProxySettings) -> Self {
        let mut proxy = Proxy {
            name: name.into(),
            server: server.into(),
            port,
            settings,
        };
        proxy.ensure_name();
        proxy
    }

    pub(crate) fn ensure_name(&mut self) {
        if self.name.is_empty() {
            self.name = DEFAULT_NAME.to_string();
        }
    }

    pub fn proxy_type(&self) -> ProxyType {
        self.settings.proxy_type()
    }

    pub fn identity(&self) -> ProxyIdentity {
        ProxyIdentity {
            proxy_type: self.proxy_type(),
            server: self.server.clone(),
            port: self.port,
        }
    }

    /// Cipher of the record, if the protocol has one.
    pub fn cipher(&self) -> Option<&str> {
        match &self.settings {
            ProxySettings::VMess(vmess) => Some(&vmess.cipher),
            ProxySettings::Shadowsocks(ss) => Some(&ss.cipher),
            ProxySettings::ShadowsocksR(ssr) => Some(&ssr.cipher),
            ProxySettings::Trojan(_) => None,
        }
    }

    pub fn password(&self) -> Option<&str> {
        match &self.settings {
            ProxySettings::VMess(_) => None,
            ProxySettings::Shadowsocks(ss) => Some(&ss.password),
            ProxySettings::ShadowsocksR(ssr) => Some(&ssr.password),
            ProxySettings::Trojan(trojan) => Some(&trojan.password),
        }
    }
}

/// An un-decoded candidate pulled out of a subscription body.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEntry {
    /// A proxy link such as `ss://...`.
    Link(String),
    /// A structured Clash `proxies` entry.
    Fragment(Mapping),
}

impl From<String> for RawEntry {
    fn from(link: String) -> Self {
        RawEntry::Link(link)
    }
}

impl From<&str> for RawEntry {
    fn from(link: &str) -> Self {
        RawEntry::Link(link.to_string())
    }
}

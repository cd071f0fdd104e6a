use ipnet::IpNet;
use serde::Deserialize;

/// Client key extraction strategy
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// Key by client IP address
    /// Uses the first X-Forwarded-For entry when the peer is trusted, else the peer IP
    #[default]
    Ip,
    /// Key by the value of a request header (API key, verified token subject)
    /// Requires `header_name`
    Header,
}

impl KeyStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStrategy::Ip => "ip",
            KeyStrategy::Header => "header",
        }
    }
}

/// Client key configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct KeyConfig {
    /// Key extraction strategy
    /// Default: "ip"
    #[serde(default)]
    pub strategy: KeyStrategy,
    /// Header carrying the key for `strategy = "header"`
    /// Example: "x-api-key"
    #[serde(default)]
    pub header_name: Option<String>,
    /// Peers whose X-Forwarded-For header is honoured
    /// Supports CIDR notation: ["10.0.0.0/8", "127.0.0.1/32"]
    /// Default: empty (X-Forwarded-For is honoured from every peer)
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_ip_networks")]
    pub trusted_proxies: Vec<IpNet>,
}

fn deserialize_ip_networks<'de, D>(deserializer: D) -> Result<Vec<IpNet>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let strings: Vec<String> = Vec::deserialize(deserializer)?;
    strings
        .into_iter()
        .map(|s| {
            s.parse::<IpNet>().map_err(|e| {
                serde::de::Error::custom(format!("Invalid IP network '{}': {}", s, e))
            })
        })
        .collect()
}

use std::net::{IpAddr, SocketAddr};

use http::HeaderMap;

use crate::config::{KeyConfig, KeyStrategy};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Extract the admission key for a request
///
/// # Arguments
/// * `config` - Key extraction strategy and trusted proxies
/// * `peer` - Client socket address
/// * `headers` - HTTP request headers
///
/// # Returns
/// The key, or `None` when the configured header is missing or empty. The
/// caller turns `None` into a 400 rather than sharing one anonymous bucket.
pub fn extract_client_key(
    config: &KeyConfig,
    peer: SocketAddr,
    headers: &HeaderMap,
) -> Option<String> {
    match config.strategy {
        KeyStrategy::Ip => Some(client_ip(config, peer, headers).to_string()),
        KeyStrategy::Header => {
            let name = config.header_name.as_deref()?;
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        }
    }
}

/// Client IP, preferring the first X-Forwarded-For entry when the peer is a
/// trusted proxy. An empty trusted list trusts every peer.
pub fn client_ip(config: &KeyConfig, peer: SocketAddr, headers: &HeaderMap) -> IpAddr {
    let peer_ip = peer.ip();
    if !is_trusted_proxy(config, peer_ip) {
        return peer_ip;
    }
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|xff| xff.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .unwrap_or(peer_ip)
}

fn is_trusted_proxy(config: &KeyConfig, ip: IpAddr) -> bool {
    config.trusted_proxies.is_empty() || config.trusted_proxies.iter().any(|net| net.contains(&ip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use ipnet::IpNet;
    use std::str::FromStr;

    fn peer() -> SocketAddr {
        SocketAddr::from(([10, 0, 0, 5], 40000))
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_ip_falls_back_to_peer() {
        let config = KeyConfig::default();
        let key = extract_client_key(&config, peer(), &HeaderMap::new());
        assert_eq!(key.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_ip_uses_first_forwarded_entry() {
        let config = KeyConfig::default();
        let map = headers(&[("x-forwarded-for", " 203.0.113.9 , 10.0.0.1")]);
        assert_eq!(extract_client_key(&config, peer(), &map).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_ip_ignores_garbage_forwarded_header() {
        let config = KeyConfig::default();
        let map = headers(&[("x-forwarded-for", "not-an-ip")]);
        assert_eq!(extract_client_key(&config, peer(), &map).as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_untrusted_peer_cannot_spoof_forwarded_for() {
        let trusted = IpNet::from_str("192.168.0.0/16").unwrap_or_else(|e| panic!("{e}"));
        let config = KeyConfig { trusted_proxies: vec![trusted], ..KeyConfig::default() };
        let map = headers(&[("x-forwarded-for", "203.0.113.9")]);
        assert_eq!(extract_client_key(&config, peer(), &map).as_deref(), Some("10.0.0.5"));

        let proxy = SocketAddr::from(([192, 168, 1, 1], 443));
        assert_eq!(extract_client_key(&config, proxy, &map).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_header_strategy() {
        let config = KeyConfig {
            strategy: KeyStrategy::Header,
            header_name: Some("x-api-key".to_string()),
            ..KeyConfig::default()
        };
        let map = headers(&[("x-api-key", "key-123")]);
        assert_eq!(extract_client_key(&config, peer(), &map).as_deref(), Some("key-123"));

        assert_eq!(extract_client_key(&config, peer(), &HeaderMap::new()), None);
        let blank = headers(&[("x-api-key", "  ")]);
        assert_eq!(extract_client_key(&config, peer(), &blank), None);
    }
}

use axum::http::HeaderMap;
use pvault::domain::config::IpExtractor;
use std::net::IpAddr;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Caller address as configured: the socket peer, or a proxy header with the peer as
/// fallback. Empty when nothing is known.
#[must_use]
pub fn resolve(extractor: IpExtractor, headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let forwarded = match extractor {
        IpExtractor::Direct => None,
        IpExtractor::Xff => header(headers, X_FORWARDED_FOR)
            .and_then(|list| list.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty()),
        IpExtractor::RealIp => header(headers, X_REAL_IP).map(str::trim).filter(|ip| !ip.is_empty()),
    };

    forwarded
        .map(str::to_owned)
        .or_else(|| peer.map(|ip| ip.to_string()))
        .unwrap_or_default()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::net::Ipv4Addr;

    const PEER: Option<IpAddr> = Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn direct_ignores_proxy_headers() {
        let h = headers(&[(X_FORWARDED_FOR, "10.0.0.1")]);
        assert_eq!(resolve(IpExtractor::Direct, &h, PEER), "192.0.2.1");
    }

    #[test]
    fn forwarded_for_uses_the_first_hop() {
        let h = headers(&[(X_FORWARDED_FOR, " 10.0.0.1 , 10.0.0.2")]);
        assert_eq!(resolve(IpExtractor::Xff, &h, PEER), "10.0.0.1");
    }

    #[test]
    fn real_ip_header() {
        let h = headers(&[(X_REAL_IP, "10.9.9.9")]);
        assert_eq!(resolve(IpExtractor::RealIp, &h, PEER), "10.9.9.9");
    }

    #[test]
    fn missing_header_falls_back_to_peer() {
        assert_eq!(resolve(IpExtractor::Xff, &HeaderMap::new(), PEER), "192.0.2.1");
        assert_eq!(resolve(IpExtractor::RealIp, &HeaderMap::new(), None), "");
    }
}

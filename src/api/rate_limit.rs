use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use ipnetwork::IpNetwork;
use opentelemetry::{global, metrics::Counter};
use std::net::{IpAddr, SocketAddr};
use std::sync::LazyLock;
use tower_governor::GovernorError;
use tower_governor::key_extractor::KeyExtractor;

static THROTTLED_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    global::meter("marketplace-relay")
        .u64_counter("relay_rate_limited_requests_total")
        .with_description("Requests rejected by the per-IP rate limiter")
        .build()
});

/// Keys the rate limiter on the real client IP, honouring `X-Forwarded-For` only when
/// the direct peer is a trusted proxy.
#[derive(Clone, Debug)]
pub struct IpKeyExtractor {
    trusted_proxies: Vec<IpNetwork>,
}

impl IpKeyExtractor {
    #[must_use]
    pub const fn new(trusted_proxies: Vec<IpNetwork>) -> Self {
        Self { trusted_proxies }
    }

    #[must_use]
    pub fn identify_client_ip(&self, headers: &axum::http::HeaderMap, peer_addr: IpAddr) -> IpAddr {
        if !self.is_trusted(&peer_addr) {
            return peer_addr;
        }

        let xff = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok());

        if let Some(xff_val) = xff {
            // Rightmost untrusted hop is the client; everything after it is our own infrastructure.
            if let Some(real_ip) =
                xff_val.rsplit(',').filter_map(|s| s.trim().parse::<IpAddr>().ok()).find(|ip| !self.is_trusted(ip))
            {
                return real_ip;
            }
        }

        peer_addr
    }

    fn is_trusted(&self, ip: &IpAddr) -> bool {
        self.trusted_proxies.iter().any(|net| net.contains(*ip))
    }
}

impl KeyExtractor for IpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &axum::http::Request<T>) -> Result<Self::Key, GovernorError> {
        let peer_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)?;

        Ok(self.identify_client_ip(req.headers(), peer_ip))
    }
}

/// Logs and counts requests the governor turned away.
pub async fn log_rate_limit_events(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        THROTTLED_TOTAL.add(1, &[]);
        tracing::warn!(%path, "Request rate limited");
    }
    response
}

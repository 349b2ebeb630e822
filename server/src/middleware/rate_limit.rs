use axum::http::Request;
use governor::{clock::QuantaInstant, middleware::NoOpMiddleware};
use std::{
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
    time::Duration,
};
use tower_governor::{
    errors::GovernorError,
    governor::{GovernorConfig, GovernorConfigBuilder},
    key_extractor::KeyExtractor,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IpKeyExtractor;

impl KeyExtractor for IpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(client_ip(req))
    }
}

/// Best guess at the address of the client behind any proxies.
///
/// 1. `cf-connecting-ip` when we sit behind Cloudflare.
/// 2. The first hop of `x-forwarded-for` behind a generic load balancer.
/// 3. Loopback otherwise, so unknown callers share one bucket instead of failing.
pub fn client_ip<T>(req: &Request<T>) -> IpAddr {
    let headers = req.headers();

    if let Some(ip) = headers
        .get("cf-connecting-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

pub type ProgressConfig = GovernorConfig<IpKeyExtractor, NoOpMiddleware<QuantaInstant>>;

pub fn create_progress_config() -> Arc<ProgressConfig> {
    // A well behaved client saves at most about once a second, but a whole office
    // can sit behind one NAT address. 10 per second with a burst of 50 leaves
    // plenty of room for that and still stops a script hammering the database.
    Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(IpKeyExtractor)
            .period(Duration::from_millis(100))
            .burst_size(50)
            .finish()
            .expect("rate limit period and burst size are non-zero"),
    )
}

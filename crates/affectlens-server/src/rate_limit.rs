//! Per-endpoint, per-client rate limiting

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv6Addr};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::config::{RateLimit, RateLimitsConfig};
use crate::error::AppError;

/// Rate-limited endpoint groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Analyze,
    Sentiment,
    Emotion,
    Aspects,
    Bulk,
    Fetch,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Sentiment => "sentiment",
            Self::Emotion => "emotion",
            Self::Aspects => "aspects",
            Self::Bulk => "bulk",
            Self::Fetch => "fetch",
        }
    }
}

/// Keyed limiters for every endpoint with a non-zero quota
pub struct RateLimiters {
    limiters: HashMap<Endpoint, DefaultKeyedRateLimiter<IpAddr>>,
    clock: DefaultClock,
}

impl RateLimiters {
    pub fn new(config: &RateLimitsConfig) -> Self {
        let mut limiters = HashMap::new();
        if config.enabled {
            for (endpoint, limit) in [
                (Endpoint::Analyze, config.analyze),
                (Endpoint::Sentiment, config.sentiment),
                (Endpoint::Emotion, config.emotion),
                (Endpoint::Aspects, config.aspects),
                (Endpoint::Bulk, config.bulk),
                (Endpoint::Fetch, config.fetch),
            ] {
                if let Some(quota) = quota(limit) {
                    limiters.insert(endpoint, RateLimiter::keyed(quota));
                }
            }
        }

        Self {
            limiters,
            clock: DefaultClock::default(),
        }
    }

    /// A limiter set that admits everything
    pub fn disabled() -> Self {
        Self {
            limiters: HashMap::new(),
            clock: DefaultClock::default(),
        }
    }

    /// Admit one request from `ip`, or report how long to wait
    pub fn check(&self, endpoint: Endpoint, ip: IpAddr) -> Result<(), AppError> {
        let Some(limiter) = self.limiters.get(&endpoint) else {
            return Ok(());
        };

        limiter.check_key(&client_key(ip)).map_err(|not_until| {
            metrics::counter!("affectlens_rate_limited_total", "endpoint" => endpoint.as_str())
                .increment(1);
            AppError::RateLimited {
                retry_after: not_until.wait_time_from(self.clock.now()),
            }
        })
    }

    /// Drop state for clients whose quota has fully replenished
    pub fn retain_recent(&self) {
        for limiter in self.limiters.values() {
            limiter.retain_recent();
        }
    }
}

/// `requests` per `per_secs`, admitted as a burst and replenished evenly
fn quota(limit: RateLimit) -> Option<Quota> {
    let burst = NonZeroU32::new(limit.requests)?;
    if limit.per_secs == 0 {
        return None;
    }
    let period = Duration::from_secs(limit.per_secs) / limit.requests;
    Quota::with_period(period).map(|q| q.allow_burst(burst))
}

/// IPv6 clients are grouped by /64
fn client_key(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(_) => ip,
        IpAddr::V6(v6) => {
            let seg = v6.segments();
            IpAddr::V6(Ipv6Addr::new(seg[0], seg[1], seg[2], seg[3], 0, 0, 0, 0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn limits(requests: u32) -> RateLimitsConfig {
        RateLimitsConfig {
            bulk: RateLimit {
                requests,
                per_secs: 60,
            },
            ..RateLimitsConfig::default()
        }
    }

    #[test]
    fn test_quota_exhausts_per_client() {
        let limiters = RateLimiters::new(&limits(2));
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limiters.check(Endpoint::Bulk, a).is_ok());
        assert!(limiters.check(Endpoint::Bulk, a).is_ok());
        assert!(matches!(
            limiters.check(Endpoint::Bulk, a),
            Err(AppError::RateLimited { .. })
        ));

        assert!(limiters.check(Endpoint::Bulk, b).is_ok());
        assert!(limiters.check(Endpoint::Sentiment, a).is_ok());
    }

    #[test]
    fn test_zero_quota_disables_endpoint_limit() {
        let limiters = RateLimiters::new(&limits(0));
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        for _ in 0..20 {
            assert!(limiters.check(Endpoint::Bulk, ip).is_ok());
        }
    }

    #[test]
    fn test_ipv6_grouped_by_prefix() {
        let limiters = RateLimiters::new(&limits(1));
        let first: IpAddr = "2001:db8::1".parse().unwrap();
        let second: IpAddr = "2001:db8::2".parse().unwrap();

        assert!(limiters.check(Endpoint::Bulk, first).is_ok());
        assert!(limiters.check(Endpoint::Bulk, second).is_err());
    }
}

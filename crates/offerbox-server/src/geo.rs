use std::net::IpAddr;
use std::time::Duration;

use anyhow::{anyhow, bail};
use serde::Deserialize;
use tracing::{debug, warn};

/// Location recorded for requests from the local machine or without an IP.
pub const LOCAL_LOCATION: &str = "Local/Unknown";
/// Location recorded when the lookup service fails for any reason.
pub const UNAVAILABLE_LOCATION: &str = "N/A";

/// ip-api.com response fields we read.
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: Option<String>,
    city: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    country: Option<String>,
}

/// Maps a client IP to `"city, region, country"` via an ip-api.com
/// compatible HTTP service.
///
/// Never fails: local addresses short-circuit to [`LOCAL_LOCATION`] and any
/// lookup error is logged and absorbed into [`UNAVAILABLE_LOCATION`].
#[derive(Clone)]
pub struct GeoResolver {
    client: reqwest::Client,
    base_url: String,
}

impl GeoResolver {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "GeoIP client build failed, using defaults without timeout");
                reqwest::Client::new()
            });
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn locate(&self, ip: Option<&str>) -> String {
        let Some(ip) = ip.map(str::trim).filter(|ip| !ip.is_empty()) else {
            return LOCAL_LOCATION.to_string();
        };
        if is_local(ip) {
            return LOCAL_LOCATION.to_string();
        }

        match self.lookup(ip).await {
            Ok(location) => location,
            Err(e) => {
                warn!(ip, error = %e, "IP geolocation failed");
                UNAVAILABLE_LOCATION.to_string()
            }
        }
    }

    async fn lookup(&self, ip: &str) -> anyhow::Result<String> {
        // The IP comes from a client-controlled header; only real addresses
        // are put into the lookup URL.
        let addr: IpAddr = ip
            .parse()
            .map_err(|_| anyhow!("not an IP address: {ip:?}"))?;
        let url = format!("{}/{}", self.base_url, addr);

        let body: IpApiResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if body.status.as_deref() != Some("success") {
            bail!("lookup service answered status {:?}", body.status);
        }

        let location = format!(
            "{}, {}, {}",
            body.city.unwrap_or_default(),
            body.region_name.unwrap_or_default(),
            body.country.unwrap_or_default()
        );
        debug!(ip, location = %location, "IP geolocated");
        Ok(location)
    }
}

/// Loopback addresses, including IPv4-mapped ones like `::ffff:127.0.0.1`.
pub fn is_local(ip: &str) -> bool {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.is_loopback(),
        Ok(IpAddr::V6(v6)) => {
            v6.is_loopback() || v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback())
        }
        Err(_) => false,
    }
}

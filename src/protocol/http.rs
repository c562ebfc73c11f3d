// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP backend for the dashboard REST API.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::{ParseError, ProtocolError, Result};
use crate::protocol::{
    ApiEnvelope, BatchControlReport, MeterInfo, RemoteMeterService, RemoteScheduleService,
    SystemConfig,
};
use crate::schedule::PowerSchedule;
use crate::types::MeterId;

// ============================================================================
// HttpConfig - Connection parameters for the dashboard backend
// ============================================================================

/// Configuration for the dashboard backend.
///
/// # Examples
///
/// ```
/// use powersched_lib::protocol::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::new("192.168.1.20")
///     .with_port(5000)
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.base_url(), "http://192.168.1.20:5000");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    host: String,
    port: u16,
    use_https: bool,
    timeout: Duration,
}

impl HttpConfig {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default HTTPS port.
    pub const DEFAULT_HTTPS_PORT: u16 = 443;
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration for the specified host.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            use_https: false,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enables HTTPS.
    ///
    /// If the port hasn't been explicitly set, it is changed to 443.
    #[must_use]
    pub fn with_https(mut self) -> Self {
        self.use_https = true;
        if self.port == Self::DEFAULT_PORT {
            self.port = Self::DEFAULT_HTTPS_PORT;
        }
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns whether HTTPS is enabled.
    #[must_use]
    pub fn use_https(&self) -> bool {
        self.use_https
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the base URL from this configuration.
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        let port_suffix = if (self.use_https && self.port == Self::DEFAULT_HTTPS_PORT)
            || (!self.use_https && self.port == Self::DEFAULT_PORT)
        {
            String::new()
        } else {
            format!(":{}", self.port)
        };
        format!("{scheme}://{}{port_suffix}", self.host)
    }

    /// Creates an [`HttpBackend`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` for an empty host, or an
    /// error if the HTTP client cannot be created.
    pub fn into_backend(self) -> std::result::Result<HttpBackend, ProtocolError> {
        if self.host.trim().is_empty() {
            return Err(ProtocolError::InvalidAddress("empty host".to_string()));
        }
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(HttpBackend {
            base_url: self.base_url(),
            client,
            timeout: self.timeout,
        })
    }
}

// ============================================================================
// HttpBackend - REST client implementing both remote services
// ============================================================================

/// REST client for the dashboard backend.
///
/// Implements [`RemoteScheduleService`] and [`RemoteMeterService`].
///
/// # Examples
///
/// ```no_run
/// use powersched_lib::protocol::{HttpBackend, RemoteScheduleService};
///
/// # async fn example() -> powersched_lib::Result<()> {
/// let backend = HttpBackend::new("http://192.168.1.20:5000")?;
/// let schedule = backend.fetch_schedule().await?;
/// println!("{}", schedule.open_power);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl HttpBackend {
    /// Creates a backend for the given host or base URL.
    ///
    /// A bare host gets an `http://` prefix.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` for an empty host, or an
    /// error if the HTTP client cannot be created.
    pub fn new(host: impl Into<String>) -> std::result::Result<Self, ProtocolError> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(ProtocolError::InvalidAddress("empty host".to_string()));
        }
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("http://{host}")
        };

        let client = Client::builder()
            .timeout(HttpConfig::DEFAULT_TIMEOUT)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(Self {
            base_url,
            client,
            timeout: HttpConfig::DEFAULT_TIMEOUT,
        })
    }

    /// Returns the base URL of the backend.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn map_send_error(&self, err: reqwest::Error) -> ProtocolError {
        if err.is_timeout() {
            ProtocolError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
        } else {
            ProtocolError::Http(err)
        }
    }

    /// Sends a request and decodes the reply envelope.
    ///
    /// Error statuses whose body is still an envelope are passed through so
    /// the backend's own error text reaches the caller.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<ApiEnvelope<T>> {
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e))?;

        tracing::debug!(url = %url, status = status.as_u16(), body = %body, "Received HTTP response");

        if status.is_success() && body.trim().is_empty() {
            return Err(ParseError::UnexpectedFormat("empty response body".to_string()).into());
        }

        let parsed = serde_json::from_str::<ApiEnvelope<T>>(&body);
        let rejected = parsed.as_ref().is_ok_and(|envelope| !envelope.success);
        if !status.is_success() && !rejected {
            return Err(ProtocolError::ConnectionFailed(format!(
                "HTTP {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ))
            .into());
        }

        parsed.map_err(|e| ParseError::Json(e).into())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiEnvelope<T>> {
        let url = self.url(path);
        tracing::debug!(url = %url, "Sending HTTP GET");
        self.send(self.client.get(&url), &url).await
    }

    async fn put<B, T>(&self, path: &str, body: &B) -> Result<ApiEnvelope<T>>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!(url = %url, "Sending HTTP PUT");
        self.send(self.client.put(&url).json(body), &url).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiEnvelope<T>>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!(url = %url, "Sending HTTP POST");
        self.send(self.client.post(&url).json(body), &url).await
    }
}

#[derive(serde::Serialize)]
struct PowerControlBody {
    power_on: bool,
}

#[derive(serde::Serialize)]
struct BatchControlBody<'a> {
    meter_ids: &'a [MeterId],
    power_on: bool,
}

impl RemoteScheduleService for HttpBackend {
    async fn fetch_schedule(&self) -> Result<PowerSchedule> {
        self.get("/api/system/power-schedule").await?.into_data()
    }

    async fn save_schedule(&self, schedule: &PowerSchedule) -> Result<PowerSchedule> {
        let stored = self
            .put::<_, PowerSchedule>("/api/system/power-schedule", schedule)
            .await?
            .into_optional()?;
        Ok(stored.unwrap_or(*schedule))
    }

    async fn fetch_config(&self) -> Result<SystemConfig> {
        self.get("/api/system/config").await?.into_data()
    }
}

impl RemoteMeterService for HttpBackend {
    async fn list_meters(&self) -> Result<Vec<MeterInfo>> {
        self.get("/api/meters").await?.into_data()
    }

    async fn set_power(&self, meter_id: MeterId, power_on: bool) -> Result<()> {
        let path = format!("/api/meters/{meter_id}/control");
        self.post::<_, serde_json::Value>(&path, &PowerControlBody { power_on })
            .await?
            .into_optional()?;
        Ok(())
    }

    async fn batch_set_power(
        &self,
        meter_ids: &[MeterId],
        power_on: bool,
    ) -> Result<BatchControlReport> {
        let body = BatchControlBody {
            meter_ids,
            power_on,
        };
        let report = self
            .post::<_, BatchControlReport>("/api/meters/batch/control", &body)
            .await?
            .into_optional()?;
        Ok(report.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_prefixes_bare_host() {
        let backend = HttpBackend::new("192.168.1.20:5000").unwrap();
        assert_eq!(backend.base_url(), "http://192.168.1.20:5000");
    }

    #[test]
    fn backend_keeps_scheme_and_strips_slash() {
        let backend = HttpBackend::new("https://meters.local/").unwrap();
        assert_eq!(backend.base_url(), "https://meters.local");
        assert_eq!(
            backend.url("/api/meters"),
            "https://meters.local/api/meters"
        );
    }

    #[test]
    fn empty_host_is_invalid_address() {
        assert!(matches!(
            HttpBackend::new("  "),
            Err(ProtocolError::InvalidAddress(_))
        ));
        assert!(matches!(
            HttpConfig::new("").into_backend(),
            Err(ProtocolError::InvalidAddress(_))
        ));
    }

    #[test]
    fn http_config_default_values() {
        let config = HttpConfig::new("10.0.0.5");
        assert_eq!(config.host(), "10.0.0.5");
        assert_eq!(config.port(), 80);
        assert!(!config.use_https());
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn http_config_with_https() {
        let config = HttpConfig::new("10.0.0.5").with_https();
        assert!(config.use_https());
        assert_eq!(config.port(), 443);
        assert_eq!(config.base_url(), "https://10.0.0.5");
    }

    #[test]
    fn http_config_with_https_custom_port() {
        let config = HttpConfig::new("10.0.0.5").with_port(8443).with_https();
        assert_eq!(config.port(), 8443);
        assert_eq!(config.base_url(), "https://10.0.0.5:8443");
    }

    #[test]
    fn http_config_base_url_custom_port() {
        let config = HttpConfig::new("10.0.0.5").with_port(5000);
        assert_eq!(config.base_url(), "http://10.0.0.5:5000");
    }

    #[test]
    fn http_config_into_backend() {
        let backend = HttpConfig::new("10.0.0.5")
            .with_port(5000)
            .with_timeout(Duration::from_secs(3))
            .into_backend()
            .unwrap();
        assert_eq!(backend.base_url(), "http://10.0.0.5:5000");
        assert_eq!(backend.timeout, Duration::from_secs(3));
    }

    #[test]
    fn batch_body_serializes_ids() {
        let ids = [MeterId::new(1), MeterId::new(2)];
        let body = BatchControlBody {
            meter_ids: &ids,
            power_on: false,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"meter_ids":[1,2],"power_on":false}"#
        );
    }
}

//! Remote Feed Push
//!
//! ## Request Shape
//!
//! ```text
//! PUT <feeds url><feed id>.csv
//! X-ApiKey: <api key>
//!
//! current,<A>
//! voltage,<V>
//! power,<W>
//! switch,<0|1>
//! ```
//!
//! Values carry two decimals. A feed id of `0` means no feed is configured:
//! [`Pusher::push`] returns [`PushOutcome::Skipped`] without touching the
//! transport.
//!
//! ## Transports
//!
//! [`PushTransport`] is the seam between request building and the network.
//! Tests plug in a recorder; with the `http` feature [`UreqTransport`] sends
//! the request with `ureq`, retrying transport errors and 5xx/429 replies
//! with exponential backoff.

use energino_core::constants::protocol::REMOTE_DECIMALS;
use energino_core::{CalibrationSettings, Measurement, Metric};
use log::{debug, info, warn};
use thiserror::Error;

use crate::round_remote;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-ApiKey";

/// Push-specific errors
#[derive(Debug, Error)]
pub enum PushError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Transport(String),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// Transport configuration rejected
    #[error("Configuration error: {0}")]
    Config(String),
}

/// One feed update, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    /// Full target URL
    pub url: String,
    /// Value for the [`API_KEY_HEADER`] header
    pub api_key: String,
    /// CSV body
    pub body: String,
}

impl PushRequest {
    /// Build the update for `report`, or `None` when no feed is configured
    pub fn build(settings: &CalibrationSettings, report: &Measurement) -> Option<Self> {
        if !settings.has_feed() {
            return None;
        }

        let body = Metric::ALL
            .iter()
            .map(|&metric| match metric {
                Metric::Switch => format!("{},{}", metric.id(), u8::from(report.relay_on)),
                _ => format!(
                    "{},{:.prec$}",
                    metric.id(),
                    round_remote(report.value(metric)),
                    prec = REMOTE_DECIMALS
                ),
            })
            .collect::<Vec<_>>()
            .join("\n");

        Some(Self {
            url: format!("{}{}.csv", settings.feeds_url, settings.feed_id),
            api_key: settings.api_key.to_string(),
            body,
        })
    }
}

/// Sends a built request
pub trait PushTransport {
    /// Send one PUT
    fn put(&mut self, request: &PushRequest) -> Result<(), PushError>;
}

impl<T: PushTransport + ?Sized> PushTransport for &mut T {
    fn put(&mut self, request: &PushRequest) -> Result<(), PushError> {
        (**self).put(request)
    }
}

/// What a push attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// No feed configured, nothing sent
    Skipped,
    /// Request accepted by the transport
    Sent,
}

/// Push counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PushStats {
    /// Requests accepted
    pub sent: u64,
    /// Requests that failed
    pub failed: u64,
    /// Attempts skipped for lack of a feed
    pub skipped: u64,
}

/// Pushes measurements through a transport
#[derive(Debug)]
pub struct Pusher<T> {
    transport: T,
    stats: PushStats,
}

impl<T: PushTransport> Pusher<T> {
    /// Pusher over `transport`
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            stats: PushStats::default(),
        }
    }

    /// Push `report` to the feed configured in `settings`
    pub fn push(&mut self, settings: &CalibrationSettings, report: &Measurement) -> Result<PushOutcome, PushError> {
        let Some(request) = PushRequest::build(settings, report) else {
            debug!("No feed configured, skipping push");
            self.stats.skipped += 1;
            return Ok(PushOutcome::Skipped);
        };

        match self.transport.put(&request) {
            Ok(()) => {
                info!("Pushed measurement to {}", request.url);
                self.stats.sent += 1;
                Ok(PushOutcome::Sent)
            }
            Err(e) => {
                warn!("Push to {} failed: {}", request.url, e);
                self.stats.failed += 1;
                Err(e)
            }
        }
    }

    /// Counters so far
    pub fn stats(&self) -> &PushStats {
        &self.stats
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(feature = "http")]
pub use self::http::{PushConfig, UreqTransport};

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use log::debug;

    use super::{PushError, PushRequest, PushTransport, API_KEY_HEADER};

    /// HTTP transport configuration
    #[derive(Debug, Clone)]
    pub struct PushConfig {
        /// Request timeout
        pub timeout: Duration,
        /// User agent string
        pub user_agent: String,
        /// Retries after the first attempt
        pub max_retries: u32,
        /// Delay before the first retry, doubled for each further one
        pub backoff: Duration,
    }

    impl Default for PushConfig {
        fn default() -> Self {
            Self {
                timeout: Duration::from_secs(10),
                user_agent: format!("Energino/{}", env!("CARGO_PKG_VERSION")),
                max_retries: 2,
                backoff: Duration::from_millis(200),
            }
        }
    }

    impl PushConfig {
        /// Set request timeout in seconds
        pub fn timeout_secs(mut self, secs: u64) -> Self {
            self.timeout = Duration::from_secs(secs);
            self
        }

        /// Set the user agent
        pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
            self.user_agent = agent.into();
            self
        }

        /// Set how many times a failed request is retried
        pub fn max_retries(mut self, retries: u32) -> Self {
            self.max_retries = retries;
            self
        }

        /// Set the first retry delay
        pub fn backoff(mut self, delay: Duration) -> Self {
            self.backoff = delay;
            self
        }
    }

    /// Blocking `ureq` transport
    pub struct UreqTransport {
        config: PushConfig,
        agent: ureq::Agent,
    }

    impl UreqTransport {
        /// Transport with `config`
        pub fn new(config: PushConfig) -> Self {
            let agent = ureq::AgentBuilder::new()
                .timeout(config.timeout)
                .user_agent(&config.user_agent)
                .build();

            Self { config, agent }
        }

        /// Active configuration
        pub fn config(&self) -> &PushConfig {
            &self.config
        }
    }

    impl PushTransport for UreqTransport {
        fn put(&mut self, request: &PushRequest) -> Result<(), PushError> {
            if !request.url.starts_with("http://") && !request.url.starts_with("https://") {
                return Err(PushError::Config(format!("Feed URL must be http(s): {}", request.url)));
            }

            let mut last_error = None;

            for attempt in 0..=self.config.max_retries {
                if attempt > 0 {
                    let delay = self.config.backoff * (1 << (attempt - 1));
                    debug!("Retrying push in {:?} (attempt {})", delay, attempt + 1);
                    std::thread::sleep(delay);
                }

                let response = self
                    .agent
                    .put(&request.url)
                    .set(API_KEY_HEADER, &request.api_key)
                    .set("Content-Type", "text/csv")
                    .send_string(&request.body);

                match response {
                    Ok(_) => return Ok(()),
                    Err(ureq::Error::Status(code, resp)) => {
                        let error = PushError::Status {
                            status: code,
                            message: resp.into_string().unwrap_or_default(),
                        };
                        // Client errors will not improve on retry
                        if code < 500 && code != 429 {
                            return Err(error);
                        }
                        last_error = Some(error);
                    }
                    Err(ureq::Error::Transport(e)) => {
                        last_error = Some(PushError::Transport(e.to_string()));
                    }
                }
            }

            Err(last_error.unwrap_or_else(|| PushError::Transport("Unknown error".into())))
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        requests: Vec<PushRequest>,
        fail: bool,
    }

    impl PushTransport for Recorder {
        fn put(&mut self, request: &PushRequest) -> Result<(), PushError> {
            self.requests.push(request.clone());
            if self.fail {
                Err(PushError::Status { status: 503, message: "busy".into() })
            } else {
                Ok(())
            }
        }
    }

    fn report() -> Measurement {
        Measurement {
            voltage_v: 12.004,
            current_a: 0.3333,
            power_w: 4.0013,
            relay_on: true,
            period_ms: 200,
            samples: 9,
            voltage_error_mv: 54,
            current_error_ma: 26,
            updated_at: None,
        }
    }

    fn feed_settings() -> CalibrationSettings {
        let mut settings = CalibrationSettings::factory_defaults();
        settings.feed_id = 61916;
        settings.set_api_key("abc");
        settings
    }

    #[test]
    fn test_request_shape() {
        let request = PushRequest::build(&feed_settings(), &report()).unwrap();
        assert_eq!(request.url, "https://api.xively.com/v2/feeds/61916.csv");
        assert_eq!(request.api_key, "abc");
        assert_eq!(request.body, "current,0.33\nvoltage,12.00\npower,4.00\nswitch,1");
    }

    #[test]
    fn test_feed_zero_makes_no_call() {
        let mut pusher = Pusher::new(Recorder { requests: Vec::new(), fail: false });
        let outcome = pusher.push(&CalibrationSettings::factory_defaults(), &report()).unwrap();

        assert_eq!(outcome, PushOutcome::Skipped);
        assert!(pusher.transport().requests.is_empty());
        assert_eq!(pusher.stats().skipped, 1);
    }

    #[test]
    fn test_failures_counted() {
        let mut pusher = Pusher::new(Recorder { requests: Vec::new(), fail: true });
        assert!(pusher.push(&feed_settings(), &report()).is_err());
        assert_eq!(pusher.stats().failed, 1);
        assert_eq!(pusher.stats().sent, 0);
    }
}

use secrecy::SecretString;
use serde::Deserialize;
use std::{net::SocketAddr, time::Duration};

use super::ConfigError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const MIN_IO_TIMEOUT: Duration = Duration::from_millis(100);
const MAX_IO_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const MIN_HEARTBEAT: Duration = Duration::from_secs(1);
const MAX_HEARTBEAT: Duration = Duration::from_secs(5 * 60);

// -----------------------------------------------------------------------------
// ----- ProducerConfig --------------------------------------------------------

/// Options handed to every connection the pool creates.
///
/// The pool itself reads none of these; they pass straight through to the
/// connector.
#[derive(Clone, Debug)]
pub struct ProducerConfig {
    pub dial_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub local_addr: Option<SocketAddr>,

    /// `None` disables heartbeats.
    pub heartbeat_interval: Option<Duration>,

    pub client_id: Option<String>,
    pub hostname: Option<String>,
    pub user_agent: String,

    pub tls_v1: bool,
    pub deflate: bool,
    pub deflate_level: u8,
    pub snappy: bool,

    pub output_buffer_size: u64,
    pub output_buffer_timeout: Duration,
    pub sample_rate: u8,
    pub msg_timeout: Option<Duration>,

    pub auth_secret: Option<SecretString>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(1),
            local_addr: None,
            heartbeat_interval: Some(Duration::from_secs(30)),
            client_id: None,
            hostname: None,
            user_agent: format!("nsqpool/{}", env!("CARGO_PKG_VERSION")),
            tls_v1: false,
            deflate: false,
            deflate_level: 6,
            snappy: false,
            output_buffer_size: 16 * 1024,
            output_buffer_timeout: Duration::from_millis(250),
            sample_rate: 0,
            msg_timeout: None,
            auth_secret: None,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- ProducerConfig: Public ------------------------------------------------

impl ProducerConfig {
    /// Default producer options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("read_timeout", self.read_timeout, MIN_IO_TIMEOUT, MAX_IO_TIMEOUT)?;
        check_range("write_timeout", self.write_timeout, MIN_IO_TIMEOUT, MAX_IO_TIMEOUT)?;

        if let Some(heartbeat) = self.heartbeat_interval {
            check_range("heartbeat_interval", heartbeat, MIN_HEARTBEAT, MAX_HEARTBEAT)?;
            if heartbeat >= self.read_timeout {
                return Err(ConfigError::Conflict(format!(
                    "heartbeat_interval {heartbeat:?} must be less than read_timeout {:?}",
                    self.read_timeout
                )));
            }
        }

        if !(1..=9).contains(&self.deflate_level) {
            return Err(ConfigError::OutOfRange {
                field: "deflate_level",
                value: self.deflate_level.to_string(),
                expected: "1..=9",
            });
        }

        if self.sample_rate > 99 {
            return Err(ConfigError::OutOfRange {
                field: "sample_rate",
                value: self.sample_rate.to_string(),
                expected: "0..=99",
            });
        }

        if self.deflate && self.snappy {
            return Err(ConfigError::Conflict(
                "deflate and snappy cannot both be enabled".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidField("user_agent".to_string()));
        }

        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: On-disk format ----------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct ProducerFileEntry {
    #[serde(default, deserialize_with = "de_duration")]
    dial_timeout: Option<Duration>,

    #[serde(default, deserialize_with = "de_duration")]
    read_timeout: Option<Duration>,

    #[serde(default, deserialize_with = "de_duration")]
    write_timeout: Option<Duration>,

    #[serde(default)]
    local_addr: Option<SocketAddr>,

    // "0s" turns heartbeats off.
    #[serde(default, deserialize_with = "de_duration")]
    heartbeat_interval: Option<Duration>,

    #[serde(default)]
    client_id: Option<String>,

    #[serde(default)]
    hostname: Option<String>,

    #[serde(default)]
    user_agent: Option<String>,

    #[serde(default)]
    tls_v1: Option<bool>,

    #[serde(default)]
    deflate: Option<bool>,

    #[serde(default)]
    deflate_level: Option<u8>,

    #[serde(default)]
    snappy: Option<bool>,

    #[serde(default)]
    output_buffer_size: Option<u64>,

    #[serde(default, deserialize_with = "de_duration")]
    output_buffer_timeout: Option<Duration>,

    #[serde(default)]
    sample_rate: Option<u8>,

    #[serde(default, deserialize_with = "de_duration")]
    msg_timeout: Option<Duration>,

    #[serde(default)]
    auth_secret: Option<String>,
}

impl ProducerFileEntry {
    pub(super) fn into_config(self) -> ProducerConfig {
        let defaults = ProducerConfig::default();

        let heartbeat_interval = match self.heartbeat_interval {
            Some(d) if d.is_zero() => None,
            Some(d) => Some(d),
            None => defaults.heartbeat_interval,
        };

        ProducerConfig {
            dial_timeout: self.dial_timeout.unwrap_or(defaults.dial_timeout),
            read_timeout: self.read_timeout.unwrap_or(defaults.read_timeout),
            write_timeout: self.write_timeout.unwrap_or(defaults.write_timeout),
            local_addr: self.local_addr,
            heartbeat_interval,
            client_id: self.client_id,
            hostname: self.hostname,
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            tls_v1: self.tls_v1.unwrap_or(defaults.tls_v1),
            deflate: self.deflate.unwrap_or(defaults.deflate),
            deflate_level: self.deflate_level.unwrap_or(defaults.deflate_level),
            snappy: self.snappy.unwrap_or(defaults.snappy),
            output_buffer_size: self.output_buffer_size.unwrap_or(defaults.output_buffer_size),
            output_buffer_timeout: self
                .output_buffer_timeout
                .unwrap_or(defaults.output_buffer_timeout),
            sample_rate: self.sample_rate.unwrap_or(defaults.sample_rate),
            msg_timeout: self.msg_timeout,
            auth_secret: self
                .auth_secret
                .map(|s| SecretString::new(s.into_boxed_str())),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn check_range(
    field: &'static str,
    value: Duration,
    min: Duration,
    max: Duration,
) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value: humantime::format_duration(value).to_string(),
            expected: "100ms..=5m for timeouts, 1s..=5m for heartbeats",
        });
    }
    Ok(())
}

/// Accepts humantime strings ("250ms", "1m 30s") or integer milliseconds.
fn de_duration<'de, D>(d: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{Error, Unexpected, Visitor};
    use std::fmt;

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Option<Duration>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a duration string (e.g., \"250ms\") or integer milliseconds")
        }

        fn visit_u64<E: Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(Duration::from_millis(v)))
        }

        fn visit_i64<E: Error>(self, v: i64) -> Result<Self::Value, E> {
            if v < 0 {
                return Err(E::invalid_value(Unexpected::Signed(v), &self));
            }
            Ok(Some(Duration::from_millis(v as u64)))
        }

        fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
        }
    }

    d.deserialize_any(DurationVisitor)
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

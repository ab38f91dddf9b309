//! Connection and engine configuration

use crate::error::{Error, Result};
use crate::folder::Folders;
use crate::pattern::HostPatterns;
use crate::relocate::RelocationPolicy;
use crate::target::ScanStrategy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// How the TLS layer is negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// TLS from the first byte (port 993).
    #[default]
    Implicit,
    /// Plain TCP upgraded with `STARTTLS` (port 143, local bridges).
    Starttls,
}

impl TlsMode {
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Implicit => 993,
            Self::Starttls => 143,
        }
    }
}

impl FromStr for TlsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "implicit" | "tls" | "ssl" => Ok(Self::Implicit),
            "starttls" => Ok(Self::Starttls),
            other => Err(Error::Config(format!("Invalid TLS mode: {other}"))),
        }
    }
}

/// IMAP connection configuration
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub tls: TlsMode,
    /// Skip certificate verification (self-signed bridges only).
    pub accept_invalid_certs: bool,
}

impl ImapConfig {
    /// Load IMAP configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `IMAP_USERNAME`
    /// - `IMAP_PASSWORD`
    ///
    /// Optional (with defaults):
    /// - `IMAP_HOST` (default: `127.0.0.1`)
    /// - `IMAP_TLS` (default: `implicit`, or `starttls`)
    /// - `IMAP_PORT` (default: `993` for implicit TLS, `143` for STARTTLS)
    /// - `IMAP_ACCEPT_INVALID_CERTS` (default: `false`)
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let tls = optional("IMAP_TLS")
            .map(|s| s.parse::<TlsMode>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            host: env::var("IMAP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: optional("IMAP_PORT")
                .map(|p| {
                    p.parse::<u16>()
                        .map_err(|e| Error::Config(format!("Invalid IMAP_PORT: {e}")))
                })
                .transpose()?
                .unwrap_or_else(|| tls.default_port()),
            username: env::var("IMAP_USERNAME")
                .map_err(|_| Error::Config("IMAP_USERNAME not set".into()))?,
            password: env::var("IMAP_PASSWORD")
                .map_err(|_| Error::Config("IMAP_PASSWORD not set".into()))?,
            tls,
            accept_invalid_certs: optional("IMAP_ACCEPT_INVALID_CERTS")
                .map(|v| parse_bool("IMAP_ACCEPT_INVALID_CERTS", &v))
                .transpose()?
                .unwrap_or(false),
        })
    }
}

/// Engine configuration: folders, host lists and policies.
#[derive(Debug, Clone)]
pub struct SieveConfig {
    pub folders: Folders,
    /// Hosts never learned from the reference folder and never matched.
    pub exempt: HostPatterns,
    /// Hosts that always match.
    pub block: HostPatterns,
    /// Ask before each move.
    pub confirm: bool,
    pub strategy: ScanStrategy,
    pub on_relocation_failure: RelocationPolicy,
    pub queue_capacity: usize,
    /// How long a watcher stays in IDLE before re-issuing it.
    pub idle_timeout: Duration,
}

impl SieveConfig {
    pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;
    /// Just under the 30 minute server-side IDLE limit of RFC 2177.
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(29 * 60);

    /// Load engine configuration from environment variables
    ///
    /// All variables are optional:
    /// - `SIEVE_REFERENCE_FOLDER` (default: `INBOX.spam`)
    /// - `SIEVE_TARGET_FOLDER` (default: `INBOX`)
    /// - `SIEVE_DESTINATION_FOLDER` (default: `INBOX.Filtered`)
    /// - `SIEVE_EXEMPT`, `SIEVE_BLOCK` (comma-separated host globs)
    /// - `SIEVE_CONFIRM` (default: `false`)
    /// - `SIEVE_STRATEGY` (`exclusion` or `cursor`, default: `exclusion`)
    /// - `SIEVE_ON_RELOCATION_FAILURE` (`retry` or `skip`, default: `retry`)
    /// - `SIEVE_QUEUE_CAPACITY` (default: `4096`)
    /// - `SIEVE_IDLE_TIMEOUT_SECS` (default: `1740`)
    ///
    /// # Errors
    ///
    /// Returns an error if a value does not parse or a host pattern is
    /// malformed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Folders::default();
        let folders = Folders {
            reference: optional("SIEVE_REFERENCE_FOLDER").unwrap_or(defaults.reference),
            target: optional("SIEVE_TARGET_FOLDER").unwrap_or(defaults.target),
            destination: optional("SIEVE_DESTINATION_FOLDER").unwrap_or(defaults.destination),
        };

        let queue_capacity = optional("SIEVE_QUEUE_CAPACITY")
            .map(|v| {
                v.parse::<usize>()
                    .map_err(|e| Error::Config(format!("Invalid SIEVE_QUEUE_CAPACITY: {e}")))
            })
            .transpose()?
            .unwrap_or(Self::DEFAULT_QUEUE_CAPACITY);
        if queue_capacity == 0 {
            return Err(Error::Config("SIEVE_QUEUE_CAPACITY must be positive".into()));
        }

        Ok(Self {
            folders,
            exempt: HostPatterns::parse_list(&optional("SIEVE_EXEMPT").unwrap_or_default())?,
            block: HostPatterns::parse_list(&optional("SIEVE_BLOCK").unwrap_or_default())?,
            confirm: optional("SIEVE_CONFIRM")
                .map(|v| parse_bool("SIEVE_CONFIRM", &v))
                .transpose()?
                .unwrap_or(false),
            strategy: optional("SIEVE_STRATEGY")
                .map(|v| v.parse::<ScanStrategy>())
                .transpose()?
                .unwrap_or_default(),
            on_relocation_failure: optional("SIEVE_ON_RELOCATION_FAILURE")
                .map(|v| v.parse::<RelocationPolicy>())
                .transpose()?
                .unwrap_or_default(),
            queue_capacity,
            idle_timeout: optional("SIEVE_IDLE_TIMEOUT_SECS")
                .map(|v| {
                    v.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                        Error::Config(format!("Invalid SIEVE_IDLE_TIMEOUT_SECS: {e}"))
                    })
                })
                .transpose()?
                .unwrap_or(Self::DEFAULT_IDLE_TIMEOUT),
        })
    }
}

impl Default for SieveConfig {
    fn default() -> Self {
        Self {
            folders: Folders::default(),
            exempt: HostPatterns::default(),
            block: HostPatterns::default(),
            confirm: false,
            strategy: ScanStrategy::default(),
            on_relocation_failure: RelocationPolicy::default(),
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            idle_timeout: Self::DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// A set, non-empty environment variable.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("Invalid {key}: {other}"))),
    }
}

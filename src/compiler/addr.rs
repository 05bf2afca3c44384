//! Listen and dial address parsing.
//!
//! # Responsibilities
//! - Recognize `tcp/`, `udp/` and `unix/` network prefixes
//! - Apply the default port 80 to bare TCP addresses
//! - Enforce the address grammar `host? (":" port ("-" port)?)?`
//! - Reject port ranges where a single dial target is required
//!
//! # Design Decisions
//! - UDP is rejected outright; the engine only proxies HTTP
//! - Unix socket addresses are kept verbatim, prefix included, since that
//!   is exactly the engine's dial syntax for them
//! - Pure parsing; no DNS resolution, no socket probing

use std::sync::LazyLock;

use regex::Regex;

use crate::compiler::error::CompileError;

const PREFIX_TCP: &str = "tcp/";
const PREFIX_UDP: &str = "udp/";
const PREFIX_UNIX: &str = "unix/";

/// Grammar for a normalized TCP address: an optional colon-free host
/// followed by an optional port or port range.
static RE_TCP_ADDR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^:]*(:\d+(-\d+)?)?$").expect("tcp address regex"));

/// Matches an address ending in a port range.
static RE_PORT_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\d+-\d+$").expect("port range regex"));

/// Network family of a parsed address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Tcp,
    Unix,
}

/// A validated network address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetAddr {
    pub network: Network,
    pub address: String,
}

impl NetAddr {
    /// Parses a listen or dial address string.
    pub fn parse(address: &str) -> Result<Self, CompileError> {
        if let Some(rest) = address.strip_prefix(PREFIX_TCP) {
            return Ok(Self {
                network: Network::Tcp,
                address: check_tcp(rest, address)?,
            });
        }

        if address.starts_with(PREFIX_UDP) {
            return Err(CompileError::UnsupportedNetwork {
                address: address.to_string(),
            });
        }

        if let Some(rest) = address.strip_prefix(PREFIX_UNIX) {
            // The socket path must look absolute: "unix//var/run/app.sock".
            if !rest.starts_with('/') {
                return Err(CompileError::InvalidAddress {
                    address: address.to_string(),
                });
            }
            return Ok(Self {
                network: Network::Unix,
                address: address.to_string(),
            });
        }

        Ok(Self {
            network: Network::Tcp,
            address: check_tcp(address, address)?,
        })
    }

    /// Parses an address that will be used as a proxy dial target.
    ///
    /// A single upstream cannot dial a port range, so ranges that are valid
    /// for listening are rejected here.
    pub fn parse_dial(address: &str) -> Result<Self, CompileError> {
        let na = Self::parse(address)?;
        if na.network == Network::Tcp && RE_PORT_RANGE.is_match(&na.address) {
            return Err(CompileError::DialPortRange {
                address: address.to_string(),
            });
        }
        Ok(na)
    }

    /// Splits a TCP address into its host and port parts.
    pub fn host_port(&self) -> (&str, &str) {
        match self.address.split_once(':') {
            Some((host, port)) => (host, port),
            // Unreachable for TCP addresses, which always carry a port
            // after normalization.
            None => (self.address.as_str(), ""),
        }
    }
}

fn check_tcp(addr: &str, original: &str) -> Result<String, CompileError> {
    let normalized = if addr.contains(':') {
        addr.to_string()
    } else {
        format!("{addr}:80")
    };

    if !RE_TCP_ADDR.is_match(&normalized) {
        return Err(CompileError::InvalidAddress {
            address: original.to_string(),
        });
    }
    Ok(normalized)
}

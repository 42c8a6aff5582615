//! Server and client configuration.

use std::time::Duration;

use clap::Parser;

/// Default server address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Port appended to client addresses given without one
pub const DEFAULT_PORT: u16 = 8080;

/// Default maximum display name length, in characters
pub const DEFAULT_MAX_USERNAME_LEN: usize = 10;

/// Default maximum length of a single protocol line, in bytes
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

/// Default per-member outbound queue capacity
pub const DEFAULT_MEMBER_QUEUE_CAPACITY: usize = 256;

/// Default bound on a single socket write
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Relay server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_addr: String,
    /// Longest accepted display name, in characters
    pub max_username_len: usize,
    /// Longest accepted line, in bytes
    pub max_line_len: usize,
    /// Lines buffered per member before broadcasts to it are dropped
    pub member_queue_capacity: usize,
    /// A write that takes longer than this disconnects the member
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_username_len: DEFAULT_MAX_USERNAME_LEN,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            member_queue_capacity: DEFAULT_MEMBER_QUEUE_CAPACITY,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with `RELAY_*` environment variables
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(addr) = lookup("RELAY_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(len) = lookup("RELAY_MAX_USERNAME_LEN").and_then(|v| v.parse().ok()) {
            config.max_username_len = len;
        }
        if let Some(len) = lookup("RELAY_MAX_LINE_LEN").and_then(|v| v.parse().ok()) {
            config.max_line_len = len;
        }
        if let Some(cap) = lookup("RELAY_MEMBER_QUEUE_CAPACITY")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|cap| *cap > 0)
        {
            config.member_queue_capacity = cap;
        }
        if let Some(secs) = lookup("RELAY_WRITE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.write_timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// Encrypted room chat client
#[derive(Debug, Parser)]
#[command(name = "relay-client", version, about)]
pub struct ClientArgs {
    /// Server address, e.g. 192.168.1.100:8080
    #[arg(long, env = "SERVER_IP")]
    pub ip: String,

    /// Seconds to wait for the reachability check
    #[arg(long, default_value_t = 2)]
    pub probe_timeout_secs: u64,
}

impl ClientArgs {
    /// Server address with the default port filled in
    pub fn server_addr(&self) -> String {
        normalize_addr(&self.ip)
    }

    /// Reachability check timeout
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Append the default port when the address has none
pub fn normalize_addr(addr: &str) -> String {
    let addr = addr.trim();
    if addr.contains(':') {
        addr.to_string()
    } else {
        format!("{addr}:{DEFAULT_PORT}")
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Network utility functions

use std::net::{IpAddr, Ipv6Addr};

/// Check if a host address is a loopback address
/// Supports IPv4 (127.x.x.x), IPv6 (::1, also bracketed) and "localhost"
pub fn is_loopback_address(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }

    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return ip.is_loopback();
    }

    // Unparseable hostnames are treated as remote
    false
}

/// Join host and port for use in a URL, bracketing raw IPv6 addresses
pub fn format_host_port(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

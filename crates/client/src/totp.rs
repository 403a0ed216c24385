// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// RFC 6238 codes for the guac-totp login field

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{Error, Result};

const STEP_SECONDS: u64 = 30;
const DIGITS: u32 = 6;

/// HOTP value (RFC 4226) for a raw key and counter
fn hotp(key: &[u8], counter: u64) -> Result<u32> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key)
        .map_err(|e| Error::Totp(format!("invalid HMAC key: {}", e)))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);

    Ok(binary % 10u32.pow(DIGITS))
}

/// Decode a base32 secret as shown by authenticator apps (case and spaces ignored)
fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    let cleaned: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let unpadded = cleaned.trim_end_matches('=');

    base32::decode(base32::Alphabet::Rfc4648 { padding: false }, unpadded)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| Error::Totp("TOTP secret is not valid base32".to_string()))
}

/// Six-digit code for the given unix time, zero padded
pub fn totp_at(secret: &str, unix_seconds: u64) -> Result<String> {
    let key = decode_secret(secret)?;
    let code = hotp(&key, unix_seconds / STEP_SECONDS)?;
    Ok(format!("{:0width$}", code, width = DIGITS as usize))
}

/// Six-digit code for the current time
pub fn totp_now(secret: &str) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Totp(format!("system clock before epoch: {}", e)))?
        .as_secs();
    totp_at(secret, now)
}

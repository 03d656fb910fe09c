//! Dotted-quad to Address Key conversion.
//!
//! An Address Key is the canonical `u32` encoding of `A.B.C.D`:
//! `((A << 8 | B) << 8 | C) << 8 | D`, i.e. the big-endian value of the
//! address (the same number `u32::from(Ipv4Addr)` yields).
//!
//! Both parsers are single linear passes over the line bytes with no
//! allocation and no string splitting:
//!
//! - [`fold_address_key`] performs no validation. Digits accumulate into the
//!   current octet, dots shift it into the result. Octets above 255 bleed
//!   into the neighbouring octet's bits and foreign bytes produce arbitrary
//!   keys. It never panics.
//! - [`parse_address_key`] folds the same way while checking shape: exactly
//!   four octets of 1..=3 digits, each at most 255, with an optional trailing
//!   `\r`. Anything else yields `None`.

use crate::config::MalformedPolicy;

/// Address Key: canonical 32-bit encoding of an IPv4 address.
pub type AddressKey = u32;

/// Folds a line into an Address Key without validation.
///
/// # Examples
///
/// ```
/// use ipv4_counter::address::fold_address_key;
///
/// assert_eq!(fold_address_key(b"192.168.0.1"), 3_232_235_521);
/// // Out-of-range octets overflow into the next octet rather than erroring.
/// assert_eq!(fold_address_key(b"0.0.0.256"), 256);
/// ```
#[inline]
pub fn fold_address_key(line: &[u8]) -> AddressKey {
    let mut result: u32 = 0;
    let mut part: u32 = 0;
    for &b in line {
        if b == b'.' {
            result = (result << 8) | part;
            part = 0;
        } else {
            part = part
                .wrapping_mul(10)
                .wrapping_add(u32::from(b.wrapping_sub(b'0')));
        }
    }
    (result << 8) | part
}

/// Parses a dotted-quad line into an Address Key, rejecting malformed input.
///
/// Leading zeros are accepted (`"010.0.0.1"` is octet 10) as long as an
/// octet has at most three digits.
///
/// # Examples
///
/// ```
/// use ipv4_counter::address::parse_address_key;
///
/// assert_eq!(parse_address_key(b"127.255.255.255"), Some(2_147_483_647));
/// assert_eq!(parse_address_key(b"10.0.0.1\r"), Some(0x0A00_0001));
/// assert_eq!(parse_address_key(b"10.0.0.256"), None);
/// assert_eq!(parse_address_key(b""), None);
/// ```
#[inline]
pub fn parse_address_key(line: &[u8]) -> Option<AddressKey> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    let mut result: u32 = 0;
    let mut part: u32 = 0;
    let mut digits = 0u8;
    let mut dots = 0u8;

    for &b in line {
        match b {
            b'0'..=b'9' => {
                digits += 1;
                if digits > 3 {
                    return None;
                }
                part = part * 10 + u32::from(b - b'0');
            }
            b'.' => {
                if digits == 0 || part > 255 || dots == 3 {
                    return None;
                }
                result = (result << 8) | part;
                part = 0;
                digits = 0;
                dots += 1;
            }
            _ => return None,
        }
    }

    if dots != 3 || digits == 0 || part > 255 {
        return None;
    }
    Some((result << 8) | part)
}

/// Converts one line according to `policy`.
///
/// `Fold` accepts every line, including empty ones (key 0).
#[inline]
pub fn key_for_line(line: &[u8], policy: MalformedPolicy) -> Option<AddressKey> {
    match policy {
        MalformedPolicy::Skip => parse_address_key(line),
        MalformedPolicy::Fold => Some(fold_address_key(line)),
    }
}

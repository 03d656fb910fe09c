#![no_main]

use std::net::Ipv4Addr;

use libfuzzer_sys::fuzz_target;

use ipv4_counter::{fold_address_key, parse_address_key};

// Differential check of the strict parser against `Ipv4Addr`'s `FromStr`,
// which also rejects leading zeros in multi-digit octets. The strict parser
// accepts those, so they are normalised before comparing.
fuzz_target!(|data: &[u8]| {
    // Never panics, whatever the bytes.
    let _ = fold_address_key(data);

    let parsed = parse_address_key(data);
    let line = data.strip_suffix(b"\r").unwrap_or(data);

    if let Some(key) = parsed {
        // Accepted input folds to the same key.
        assert_eq!(fold_address_key(line), key);
        assert!(line.len() <= 15);
    }

    let Ok(text) = std::str::from_utf8(line) else {
        assert!(parsed.is_none());
        return;
    };
    let normalised: Option<String> = text
        .split('.')
        .map(|octet| {
            if octet.is_empty() || octet.len() > 3 || !octet.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                octet.parse::<u16>().ok().map(|v| v.to_string())
            }
        })
        .collect::<Option<Vec<_>>>()
        .map(|octets| octets.join("."));

    let reference = normalised
        .and_then(|s| s.parse::<Ipv4Addr>().ok())
        .map(u32::from);
    assert_eq!(parsed, reference, "mismatch on {text:?}");
});

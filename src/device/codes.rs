// ABOUTME: Device and user code generation plus user-code normalization
// ABOUTME: High-entropy hex device codes and grouped alphanumeric user codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use rand::Rng;
use teamsync_core::constants::device::{
    DEVICE_CODE_BYTES, USER_CODE_ALPHABET, USER_CODE_GROUP, USER_CODE_LENGTH,
};

/// 32 random bytes from the OS-seeded thread RNG, hex encoded
#[must_use]
pub fn generate_device_code() -> String {
    let mut bytes = [0u8; DEVICE_CODE_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Eight characters from `A-Z0-9` grouped as `XXXX-XXXX`
#[must_use]
pub fn generate_user_code() -> String {
    let mut rng = rand::thread_rng();
    let raw: String = (0..USER_CODE_LENGTH)
        .map(|_| char::from(USER_CODE_ALPHABET[rng.gen_range(0..USER_CODE_ALPHABET.len())]))
        .collect();
    group(&raw)
}

fn group(raw: &str) -> String {
    let mut grouped = String::with_capacity(raw.len() + raw.len() / USER_CODE_GROUP);
    for (i, c) in raw.chars().enumerate() {
        if i > 0 && i % USER_CODE_GROUP == 0 {
            grouped.push('-');
        }
        grouped.push(c);
    }
    grouped
}

/// Canonical form of a typed user code, or `None` if it cannot be one
///
/// Accepts lowercase, surrounding whitespace, and a missing or misplaced dash:
/// `"abcd1234"`, `" ABCD-1234 "` and `"ab-cd-12-34"` all become `"ABCD-1234"`.
#[must_use]
pub fn normalize_user_code(input: &str) -> Option<String> {
    let raw: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let valid = raw.len() == USER_CODE_LENGTH
        && raw.bytes().all(|b| USER_CODE_ALPHABET.contains(&b));
    valid.then(|| group(&raw))
}

/// Whether `code` is already in canonical `XXXX-XXXX` form
#[must_use]
pub fn is_canonical_user_code(code: &str) -> bool {
    normalize_user_code(code).is_some_and(|canonical| canonical == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_user_code_format() {
        for _ in 0..200 {
            let code = generate_user_code();
            assert_eq!(code.len(), 9);
            assert_eq!(&code[4..5], "-");
            assert!(is_canonical_user_code(&code), "{code}");
        }
    }

    #[test]
    fn test_device_code_entropy() {
        let codes: HashSet<String> = (0..100).map(|_| generate_device_code()).collect();
        assert_eq!(codes.len(), 100);
        for code in &codes {
            assert_eq!(code.len(), DEVICE_CODE_BYTES * 2);
            assert!(code.bytes().all(|b| b.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_normalize_user_code() {
        assert_eq!(normalize_user_code("abcd1234").as_deref(), Some("ABCD-1234"));
        assert_eq!(normalize_user_code(" ab-cd-12-34 ").as_deref(), Some("ABCD-1234"));
        assert_eq!(normalize_user_code("ABCD-123"), None);
        assert_eq!(normalize_user_code("ABCD-12#4"), None);
        assert_eq!(normalize_user_code(""), None);
    }
}

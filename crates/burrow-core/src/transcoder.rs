//! Bijective conversion between identifiers and short codes.
//!
//! A short code is the base-62 numeral of an identifier, written most
//! significant digit first, using [`ALPHABET`] as digit symbols. The alphabet
//! order defines the digit values, so `'a'` is zero and identifier `1`
//! encodes to `"b"`.

use crate::error::{CoreError, Result};
use crate::identifier::Identifier;
use crate::shortcode::ShortCode;

/// Digit symbols in value order.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// The base of the numeral system.
pub const BASE: u64 = ALPHABET.len() as u64;

/// Longest encoding of a `u64`: 62^10 < 2^64 <= 62^11.
pub const MAX_CODE_LEN: usize = 11;

const INVALID: u8 = u8::MAX;

const DIGITS: [u8; 128] = {
    let mut table = [INVALID; 128];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Returns the digit value of `c`, or `None` if it is not in the alphabet.
fn digit_value(c: u8) -> Option<u64> {
    match DIGITS.get(c as usize) {
        Some(&d) if d != INVALID => Some(u64::from(d)),
        _ => None,
    }
}

/// Encodes `id` as a base-62 numeral. Zero encodes to `"a"`.
pub fn encode(mut id: u64) -> String {
    if id == 0 {
        return char::from(ALPHABET[0]).to_string();
    }

    let mut buf = [0u8; MAX_CODE_LEN];
    let mut i = buf.len();
    while id > 0 {
        i -= 1;
        buf[i] = ALPHABET[(id % BASE) as usize];
        id /= BASE;
    }

    buf[i..].iter().copied().map(char::from).collect()
}

/// Evaluates `code` as a base-62 numeral.
///
/// Fails on the empty string, on any character outside [`ALPHABET`], and on
/// numerals whose value does not fit in a `u64`. Leading zero digits are
/// accepted, so `"ab"` decodes to the same value as `"b"`.
pub fn decode(code: &str) -> Result<u64> {
    if code.is_empty() {
        return Err(CoreError::InvalidShortCode(
            "short code cannot be empty".to_string(),
        ));
    }

    code.bytes().try_fold(0u64, |value, c| {
        let digit = digit_value(c).ok_or_else(|| {
            CoreError::InvalidShortCode(format!(
                "must contain only alphanumeric characters: '{}'",
                code
            ))
        })?;

        value
            .checked_mul(BASE)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| CoreError::InvalidShortCode(format!("value out of range: '{}'", code)))
    })
}

/// Typed front end over [`encode`] and [`decode`].
///
/// Holds no state; copies are free and it can be shared across tasks
/// without synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transcoder;

impl Transcoder {
    pub fn new() -> Self {
        Self
    }

    /// Derives the public short code for a storage identifier.
    pub fn encode(&self, id: Identifier) -> ShortCode {
        ShortCode::new_unchecked(encode(id.get()))
    }

    /// Recovers the identifier named by a short code.
    pub fn decode(&self, code: &str) -> Result<Identifier> {
        decode(code).map(Identifier::new)
    }
}

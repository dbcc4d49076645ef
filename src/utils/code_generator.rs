//! Deterministic short code generation.
//!
//! A code is derived from the SHA-256 digest of the original URL. Each retry
//! (`attempt`) reads a different 8-byte window of the same digest, so a given
//! URL always walks the same candidate sequence.

use sha2::{Digest, Sha256};

/// Base-62 alphabet: digits, lowercase, uppercase.
const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Width of the digest window interpreted as a big-endian `u64`.
const WINDOW_BYTES: usize = 8;

/// Lengths at or above this use the raw window value without modulo folding.
const FULL_WIDTH_LENGTH: usize = 10;

/// Number of candidates tried before creation gives up.
pub const MAX_ATTEMPTS: usize = 16;

/// Longest code length the generator can fill from a single window.
pub const MAX_CODE_LENGTH: usize = 11;

/// Produces the candidate short code for `original` at `attempt`.
///
/// Pure and deterministic. For `length < 10` the window value is reduced
/// modulo `62^length` before encoding. The encoded string is then fitted to
/// exactly `length` characters: longer encodings keep their least-significant
/// characters, shorter ones are left-padded with `'0'`.
///
/// `length` must be at least 1; callers validate it before calling.
///
/// # Examples
///
/// ```
/// use shortcode_service::utils::code_generator::generate;
///
/// let code = generate("https://example.com/a", 8, 0);
/// assert_eq!(code, "IPhmXSNu");
/// assert_eq!(code, generate("https://example.com/a", 8, 0));
/// ```
pub fn generate(original: &str, length: usize, attempt: usize) -> String {
    debug_assert!(length > 0, "short code length must be positive");

    let digest = Sha256::digest(original.as_bytes());
    let offset = attempt % (digest.len() - WINDOW_BYTES + 1);

    let mut window = [0u8; WINDOW_BYTES];
    window.copy_from_slice(&digest[offset..offset + WINDOW_BYTES]);
    let mut value = u64::from_be_bytes(window);

    if length < FULL_WIDTH_LENGTH {
        value %= 62u64.pow(length as u32);
    }

    fit_to_length(encode_base62(value), length)
}

/// Returns true if every character of `code` belongs to the base-62 alphabet.
pub fn is_base62(code: &str) -> bool {
    !code.is_empty() && code.bytes().all(|b| ALPHABET.contains(&b))
}

fn encode_base62(mut value: u64) -> String {
    if value == 0 {
        return (ALPHABET[0] as char).to_string();
    }

    let mut digits = Vec::with_capacity(MAX_CODE_LENGTH);
    while value > 0 {
        digits.push(ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    digits.reverse();

    // Alphabet is ASCII.
    String::from_utf8(digits).unwrap_or_default()
}

fn fit_to_length(encoded: String, length: usize) -> String {
    match encoded.len() {
        n if n > length => encoded[n - length..].to_string(),
        n if n < length => {
            let mut padded = String::with_capacity(length);
            padded.extend(std::iter::repeat_n(ALPHABET[0] as char, length - n));
            padded.push_str(&encoded);
            padded
        }
        _ => encoded,
    }
}

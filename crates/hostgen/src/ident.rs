//! Identifier normalization for generated C names.
//!
//! Names coming from file names and exported symbols are mapped onto C
//! identifiers by replacing every denied character with `_`. The mapping is
//! one character to one character and therefore not injective; callers that
//! need uniqueness check for collisions themselves.

/// Replacement for every denied character.
pub const PLACEHOLDER: char = '_';

/// Characters that may not appear in a generated identifier.
const DENIED: &[char] = &[
    '\\', '`', '*', '{', '}', '[', ']', '(', ')', '<', '>', '#', '+', '-', '.', '!', '$', '\'',
    '"', '/', ':', ';', ',', '?', '@', '&', '|', '%', '^', '~', '=',
];

/// Whether `ch` is replaced by [`normalize`].
pub fn is_denied(ch: char) -> bool {
    ch.is_ascii_whitespace() || DENIED.contains(&ch)
}

/// Map an arbitrary name onto a generated-code identifier.
///
/// `normalize("spectest.wasm") == "spectest_wasm"`.
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|ch| if is_denied(ch) { PLACEHOLDER } else { ch })
        .collect()
}

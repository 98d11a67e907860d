//! W3C WebDriver key codepoints for use with `send_keys`.
//!
//! Special keys live in the Unicode private use area starting at `U+E000`.

pub const ENTER: char = '\u{E007}';
pub const ARROW_DOWN: char = '\u{E015}';

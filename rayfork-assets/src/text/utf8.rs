//! UTF-8 decoding for the text pipeline.
//!
//! Implements RFC 3629 exactly: overlong encodings, surrogate codepoints and
//! anything above U+10FFFF are invalid. Invalid input decodes to `'?'` with
//! one byte consumed, so rendering shows a placeholder per bad byte and
//! always makes progress.

/// Replacement codepoint for undecodable bytes.
pub const REPLACEMENT: char = '?';

/// One decoded codepoint ("run" of bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rune {
    pub codepoint: char,
    pub byte_len: usize,
    pub valid: bool,
}

/// Aggregate counts over a byte buffer, computed without allocating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuneCount {
    pub total: usize,
    pub valid: usize,
    pub invalid_bytes: usize,
    pub byte_len: usize,
}

#[inline]
fn invalid() -> Rune {
    Rune {
        codepoint: REPLACEMENT,
        byte_len: 1,
        valid: false,
    }
}

#[inline]
fn is_continuation(b: u8) -> bool {
    b & 0xc0 == 0x80
}

/// Decode the first codepoint of `bytes`.
///
/// Empty input returns an invalid rune with `byte_len == 0`.
pub fn decode_rune(bytes: &[u8]) -> Rune {
    let Some(&b0) = bytes.first() else {
        return Rune {
            codepoint: REPLACEMENT,
            byte_len: 0,
            valid: false,
        };
    };

    match b0 {
        // ASCII
        0x00..=0x7f => Rune {
            codepoint: b0 as char,
            byte_len: 1,
            valid: true,
        },
        // Two bytes; 0xC0/0xC1 would be overlong
        0xc2..=0xdf => {
            let Some(&b1) = bytes.get(1) else {
                return invalid();
            };
            if !is_continuation(b1) {
                return invalid();
            }
            let cp = ((b0 as u32 & 0x1f) << 6) | (b1 as u32 & 0x3f);
            Rune {
                codepoint: char::from_u32(cp).unwrap_or(REPLACEMENT),
                byte_len: 2,
                valid: true,
            }
        }
        // Three bytes
        0xe0..=0xef => {
            let (Some(&b1), Some(&b2)) = (bytes.get(1), bytes.get(2)) else {
                return invalid();
            };
            if !is_continuation(b1) || !is_continuation(b2) {
                return invalid();
            }
            // Overlong (E0 A0..) and surrogate (ED 80..9F only) guards
            if b0 == 0xe0 && b1 < 0xa0 {
                return invalid();
            }
            if b0 == 0xed && b1 >= 0xa0 {
                return invalid();
            }
            let cp = ((b0 as u32 & 0x0f) << 12) | ((b1 as u32 & 0x3f) << 6) | (b2 as u32 & 0x3f);
            Rune {
                codepoint: char::from_u32(cp).unwrap_or(REPLACEMENT),
                byte_len: 3,
                valid: true,
            }
        }
        // Four bytes, capped at U+10FFFF
        0xf0..=0xf4 => {
            let (Some(&b1), Some(&b2), Some(&b3)) = (bytes.get(1), bytes.get(2), bytes.get(3))
            else {
                return invalid();
            };
            if !is_continuation(b1) || !is_continuation(b2) || !is_continuation(b3) {
                return invalid();
            }
            if b0 == 0xf0 && b1 < 0x90 {
                return invalid(); // overlong
            }
            if b0 == 0xf4 && b1 >= 0x90 {
                return invalid(); // above U+10FFFF
            }
            let cp = ((b0 as u32 & 0x07) << 18)
                | ((b1 as u32 & 0x3f) << 12)
                | ((b2 as u32 & 0x3f) << 6)
                | (b3 as u32 & 0x3f);
            Rune {
                codepoint: char::from_u32(cp).unwrap_or(REPLACEMENT),
                byte_len: 4,
                valid: true,
            }
        }
        // Stray continuation bytes and the never-valid 0xC0/0xC1/0xF5..0xFF
        _ => invalid(),
    }
}

/// Count runes without allocating.
pub fn count_runes(bytes: &[u8]) -> RuneCount {
    let mut count = RuneCount::default();
    let mut offset = 0;
    while offset < bytes.len() {
        let rune = decode_rune(&bytes[offset..]);
        count.total += 1;
        if rune.valid {
            count.valid += 1;
        } else {
            count.invalid_bytes += rune.byte_len;
        }
        count.byte_len += rune.byte_len;
        offset += rune.byte_len;
    }
    count
}

/// Iterator over the runes of a byte buffer.
pub fn runes(bytes: &[u8]) -> RuneIter<'_> {
    RuneIter { bytes, offset: 0 }
}

pub struct RuneIter<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Iterator for RuneIter<'_> {
    type Item = Rune;

    fn next(&mut self) -> Option<Rune> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        let rune = decode_rune(&self.bytes[self.offset..]);
        self.offset += rune.byte_len;
        Some(rune)
    }
}

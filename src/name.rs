//! Logical name reconstruction.
//!
//! VFAT stores a long name as a run of auxiliary slots preceding the short
//! entry, highest ordinal first, 13 UTF-16 code units per slot split across
//! three in-slot spans. The accumulator below reassembles them during one
//! parse pass; the short entry's own 8.3 fields are the fallback when no
//! long name precedes it.

use crate::dirent::read_u16;
use alloc::{
    string::{String, ToString as _},
    vec::Vec,
};

/// Ordinal bit marking the last logical fragment of a long name.
pub const LAST_FRAGMENT: u8 = 0x40;

/// Padding halfword used after the long name's terminator.
const PADDING: u16 = 0xFFFF;

/// In-slot spans of UTF-16 code units, in logical order.
const SPAN1: (usize, usize) = (1, 5);
const SPAN2: (usize, usize) = (14, 6);
const SPAN3: (usize, usize) = (28, 2);

/// Appends up to `max` UTF-16 units starting at `offset`, stopping at the
/// 0x0000 terminator.
fn push_units(slot: &[u8], offset: usize, max: usize, units: &mut Vec<u16>) {
    for i in 0..max {
        let unit = read_u16(slot, offset + 2 * i);
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
}

#[must_use]
/// Extracts the UTF-16 text carried by one long-name slot.
///
/// The second and third spans are only read if the halfword opening them is
/// not the 0xFFFF padding **or** the text so far already fills the previous
/// spans. The length check disambiguates a legitimate U+FFFF codepoint from
/// padding: 0xFFFF only terminates when it follows the 0x0000 terminator,
/// which would have left the previous span short.
pub(crate) fn extract_fragment(slot: &[u8]) -> String {
    let mut units = Vec::with_capacity(13);

    push_units(slot, SPAN1.0, SPAN1.1, &mut units);
    if read_u16(slot, SPAN2.0) != PADDING || units.len() == SPAN1.1 {
        push_units(slot, SPAN2.0, SPAN2.1, &mut units);
        if read_u16(slot, SPAN3.0) != PADDING || units.len() == SPAN1.1 + SPAN2.1 {
            push_units(slot, SPAN3.0, SPAN3.1, &mut units);
        }
    }

    // Unpaired surrogates are dropped rather than failing the listing.
    char::decode_utf16(units).filter_map(Result::ok).collect()
}

/// Trims a reassembled long name per the VFAT rules.
///
/// Surrounding spaces are ignored, then trailing periods are stripped.
/// A name consisting only of periods collapses to a single ".".
fn trim_long_name(name: &str) -> String {
    let trimmed = name.trim();
    if !trimmed.ends_with('.') {
        return trimmed.to_string();
    }

    let chars = trimmed.chars().collect::<Vec<char>>();
    let mut idx = chars.len() - 1;
    while idx > 0 && chars[idx] == '.' {
        idx -= 1;
    }
    chars[..=idx].iter().collect()
}

/// Trims trailing space padding and maps the OEM bytes to characters.
fn oem_trimmed(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(0, |idx| idx + 1);
    bytes[..end].iter().map(|&b| char::from(b)).collect()
}

#[must_use]
/// Reconstructs the 8.3 name of a short entry slot.
///
/// The 8-byte base and 3-byte extension are space-trimmed and joined with a
/// period only when the extension is non-empty.
pub(crate) fn short_name(slot: &[u8]) -> String {
    let base = oem_trimmed(&slot[..8]);
    let ext = oem_trimmed(&slot[8..11]);
    if ext.is_empty() {
        base
    } else {
        alloc::format!("{base}.{ext}")
    }
}

/// Reassembles long-name fragments across one parse pass.
///
/// Fragments arrive highest-ordinal first, so each one is *prepended*. The
/// 0x40 ordinal bit marks the logically last fragment, which is physically
/// the first slot of a new sequence: seeing it discards whatever a previous,
/// possibly orphaned sequence left behind before the fragment is stored.
#[derive(Debug)]
pub(crate) struct LongNameAccumulator {
    state: State,
}

#[derive(Debug)]
enum State {
    Idle,
    Accumulating(String),
}

impl LongNameAccumulator {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Prepends an already-extracted fragment, resetting first if the
    /// ordinal starts a new sequence.
    pub(crate) fn push_fragment(&mut self, ordinal: u8, fragment: &str) {
        if ordinal & LAST_FRAGMENT != 0 {
            self.state = State::Idle;
        }

        let mut name = String::from(fragment);
        if let State::Accumulating(rest) = &self.state {
            name.push_str(rest);
        }
        self.state = State::Accumulating(name);
    }

    /// Feeds one long-name slot into the accumulator.
    pub(crate) fn accept(&mut self, slot: &[u8]) {
        let ordinal = slot[0];
        let fragment = extract_fragment(slot);
        self.push_fragment(ordinal, &fragment);
    }

    /// Takes the resolved, trimmed name and returns to idle.
    ///
    /// Returns `None` when nothing was accumulated, in which case the caller
    /// falls back to the short entry's 8.3 fields.
    pub(crate) fn take(&mut self) -> Option<String> {
        match core::mem::replace(&mut self.state, State::Idle) {
            State::Accumulating(name) if !name.is_empty() => Some(trim_long_name(&name)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a long-name slot carrying `text` (at most 13 units).
    fn lfn_slot(ordinal: u8, text: &str) -> [u8; 32] {
        let mut slot = [0u8; 32];
        slot[0] = ordinal;
        slot[11] = crate::dirent::Attributes::LONG_NAME;

        let units = text.encode_utf16().collect::<Vec<u16>>();
        assert!(units.len() <= 13);
        let spans = [(1usize, 5usize), (14, 6), (28, 2)];
        let mut idx = 0;
        let mut terminated = false;
        for (offset, count) in spans {
            for i in 0..count {
                let unit = if idx < units.len() {
                    let u = units[idx];
                    idx += 1;
                    u
                } else if terminated {
                    0xFFFF
                } else {
                    terminated = true;
                    0x0000
                };
                slot[offset + 2 * i..offset + 2 * i + 2].copy_from_slice(&unit.to_le_bytes());
            }
        }
        slot
    }

    #[test]
    fn test_fragment_extraction() {
        assert_eq!(extract_fragment(&lfn_slot(0x41, "hi")), "hi");
        assert_eq!(extract_fragment(&lfn_slot(0x01, "hello_world12")), "hello_world12");
        assert_eq!(extract_fragment(&lfn_slot(0x41, "exactly5!")), "exactly5!");
    }

    #[test]
    fn test_fragment_u16_sentinel_is_a_valid_codepoint() {
        // A name whose 6th unit is a real U+FFFF: the halfword at offset 14
        // equals the padding value, but the first span is full so the spans
        // after it must still be read.
        let mut text = String::from("abcde");
        text.push('\u{FFFF}');
        text.push('f');
        let slot = lfn_slot(0x41, &text);
        assert_eq!(read_u16(&slot, 14), 0xFFFF);
        assert_eq!(extract_fragment(&slot), text);
    }

    #[test]
    fn test_fragment_padding_stops_extraction() {
        // Short fragment: terminator inside the first span, padding after.
        let slot = lfn_slot(0x41, "abc");
        assert_eq!(read_u16(&slot, 14), 0xFFFF);
        assert_eq!(extract_fragment(&slot), "abc");
    }

    #[test]
    fn test_accumulator_prepends_fragments() {
        let mut acc = LongNameAccumulator::new();
        // Physically first slot carries the tail of the name.
        acc.push_fragment(0x42, "_world");
        acc.push_fragment(0x01, "hello");
        assert_eq!(acc.take().as_deref(), Some("hello_world"));
        assert_eq!(acc.take(), None);
    }

    #[test]
    fn test_accumulator_resets_before_prepending_new_sequence() {
        let mut acc = LongNameAccumulator::new();
        acc.push_fragment(0x42, "orphaned");
        // A fresh sequence begins: the orphaned text must not leak into it.
        acc.push_fragment(0x41, "clean");
        assert_eq!(acc.take().as_deref(), Some("clean"));
    }

    #[test]
    fn test_long_name_trimming() {
        assert_eq!(trim_long_name("  notes..  "), "notes");
        assert_eq!(trim_long_name("notes"), "notes");
        assert_eq!(trim_long_name("a.b.."), "a.b");
        assert_eq!(trim_long_name("..."), ".");
    }

    #[test]
    fn test_short_name_reconstruction() {
        assert_eq!(short_name(b"README  TXT"), "README.TXT");
        assert_eq!(short_name(b"README     "), "README");
        assert_eq!(short_name(b"A       B  "), "A.B");
    }
}

use heapless::String;

/// Wrapper for printing byte buffers as readable text, escaping control
/// and non-ASCII bytes instead of failing on them.
pub struct LossyStr<'a>(pub &'a [u8]);

impl core::fmt::Debug for LossyStr<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for &b in self.0 {
            match b {
                b'\r' => write!(f, "\\r")?,
                b'\n' => write!(f, "\\n")?,
                0x20..=0x7e => write!(f, "{}", b as char)?,
                _ => write!(f, "\\x{:02x}", b)?,
            }
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LossyStr<'_> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=[u8]:a}", self.0);
    }
}

/// Best-effort text decoding. Valid UTF-8 passes through unchanged; in a
/// corrupted buffer every byte outside the ASCII range is substituted
/// with the replacement character, so one bad byte never hides the rest
/// of a reply. Output is silently truncated at the capacity.
pub(crate) fn decode_lossy<const N: usize>(bytes: &[u8]) -> String<N> {
    let mut out = String::new();
    match core::str::from_utf8(bytes) {
        Ok(text) => {
            for c in text.chars() {
                if out.push(c).is_err() {
                    break;
                }
            }
        }
        Err(_) => {
            for &b in bytes {
                let c = if b < 0x80 {
                    b as char
                } else {
                    char::REPLACEMENT_CHARACTER
                };
                if out.push(c).is_err() {
                    break;
                }
            }
        }
    }
    out
}

/// Copy `s` into a bounded string, truncating when it does not fit.
pub(crate) fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Substring search over raw window bytes.
pub(crate) fn find_token(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}

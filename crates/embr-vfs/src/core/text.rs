//! Capacity-checked text output.
//!
//! Rendered results (directory listings, status lines) are built in a
//! [`TextBuffer`] sized to the output buffer. A write that does not fit is
//! cut at a character boundary, the buffer is marked truncated, and every
//! later write is refused, so the content is always a clean prefix.

use std::fmt;

/// Bounded text accumulator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    capacity: usize,
    truncated: bool,
}

impl TextBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity.min(4096)),
            capacity,
            truncated: false,
        }
    }

    /// Append `s`. Returns false if it did not fit entirely.
    pub fn push_str(&mut self, s: &str) -> bool {
        if self.truncated {
            return false;
        }
        let room = self.remaining();
        if s.len() <= room {
            self.text.push_str(s);
            return true;
        }
        let mut cut = room;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&s[..cut]);
        self.truncated = true;
        false
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.text.len())
    }

    /// True once a write has been cut short.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Current content.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Consume the buffer, returning the content and the truncation flag.
    pub fn finish(self) -> (String, bool) {
        (self.text, self.truncated)
    }
}

impl fmt::Write for TextBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.push_str(s) {
            Ok(())
        } else {
            Err(fmt::Error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_fits_exactly() {
        let mut buf = TextBuffer::with_capacity(5);
        assert!(buf.push_str("hello"));
        assert!(!buf.is_truncated());
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_overflow_truncates_and_fails_closed() {
        let mut buf = TextBuffer::with_capacity(8);
        assert!(buf.push_str("abc\r\n"));
        assert!(!buf.push_str("defgh\r\n"));
        assert!(!buf.push_str("x"));
        let (text, truncated) = buf.finish();
        assert_eq!(text, "abc\r\ndef");
        assert!(truncated);
    }

    #[test]
    fn test_cut_respects_char_boundary() {
        let mut buf = TextBuffer::with_capacity(3);
        assert!(!buf.push_str("aéb"));
        assert_eq!(buf.as_str(), "aé");
        let mut buf = TextBuffer::with_capacity(2);
        buf.push_str("aé");
        assert_eq!(buf.as_str(), "a");
    }

    #[test]
    fn test_fmt_write_reports_overflow() {
        let mut buf = TextBuffer::with_capacity(4);
        assert!(write!(buf, "{}", 12345).is_err());
        assert_eq!(buf.as_str(), "1234");
    }
}

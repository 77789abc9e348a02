//! Byte-to-codepoint decoding (§3 "Encoding", §4.1 "Decoder").
//!
//! A chunk boundary can fall in the middle of a multi-byte UTF-8 sequence;
//! the decoder carries the incomplete tail over to the next [`feed`] call
//! rather than losing or misinterpreting it. `SO`/`SI` (G0/G1 shift) bytes
//! are left as plain control characters for the dispatch layer to act on —
//! the decoder itself only resolves bytes to scalar values.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    /// Every byte maps 1:1 to its Unicode scalar value (ISO-8859-1).
    Latin1,
}

impl Encoding {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Encoding::Utf8),
            "iso-8859-1" | "latin1" | "latin-1" => Some(Encoding::Latin1),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Latin1 => "ISO-8859-1",
        }
    }
}

#[derive(Debug)]
pub struct Decoder {
    encoding: Encoding,
    pending: Vec<u8>,
}

impl Decoder {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            pending: Vec::new(),
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Switching encodings mid-stream discards any partial sequence rather
    /// than trying to reinterpret it under the new encoding.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
        self.pending.clear();
    }

    pub fn feed(&mut self, bytes: &[u8], out: &mut Vec<char>) {
        match self.encoding {
            Encoding::Latin1 => out.extend(bytes.iter().map(|&b| b as char)),
            Encoding::Utf8 => self.feed_utf8(bytes, out),
        }
    }

    fn feed_utf8(&mut self, bytes: &[u8], out: &mut Vec<char>) {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(bytes);
        let mut remaining: &[u8] = &buf;
        loop {
            match std::str::from_utf8(remaining) {
                Ok(s) => {
                    out.extend(s.chars());
                    return;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    out.extend(
                        std::str::from_utf8(&remaining[..valid_up_to])
                            .expect("prefix validated by from_utf8's own error")
                            .chars(),
                    );
                    match e.error_len() {
                        None => {
                            // Incomplete sequence at the tail: carry it over
                            // for the next chunk instead of discarding it.
                            self.pending = remaining[valid_up_to..].to_vec();
                            return;
                        }
                        Some(len) => {
                            out.push('\u{fffd}');
                            remaining = &remaining[valid_up_to + len..];
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_decodes_straight_through() {
        let mut d = Decoder::new(Encoding::Utf8);
        let mut out = Vec::new();
        d.feed(b"hello", &mut out);
        assert_eq!(out.iter().collect::<String>(), "hello");
    }

    #[test]
    fn multibyte_sequence_split_across_chunks_reassembles() {
        let mut d = Decoder::new(Encoding::Utf8);
        let bytes = "\u{4e2d}\u{6587}".as_bytes().to_vec(); // two 3-byte CJK chars
        let mut out = Vec::new();
        d.feed(&bytes[..2], &mut out); // split mid-sequence
        assert!(out.is_empty());
        d.feed(&bytes[2..], &mut out);
        assert_eq!(out.iter().collect::<String>(), "\u{4e2d}\u{6587}");
    }

    #[test]
    fn invalid_byte_becomes_replacement_character_and_resumes() {
        let mut d = Decoder::new(Encoding::Utf8);
        let mut bytes = vec![b'a'];
        bytes.push(0xff);
        bytes.push(b'b');
        let mut out = Vec::new();
        d.feed(&bytes, &mut out);
        assert_eq!(out, vec!['a', '\u{fffd}', 'b']);
    }

    #[test]
    fn latin1_maps_bytes_one_to_one() {
        let mut d = Decoder::new(Encoding::Latin1);
        let mut out = Vec::new();
        d.feed(&[0xe9], &mut out); // e-acute in Latin-1
        assert_eq!(out, vec!['\u{e9}']);
    }
}

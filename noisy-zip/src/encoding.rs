//! Character encodings for entry names.
//!
//! On the write side names are emitted either as UTF-8 (with bit 11 of the
//! general-purpose flags set) or as CP1251. On the read side the flag is the
//! only hint we get, and archives in the wild lie about it or predate it, so
//! the decoder tries several historical code pages and keeps whichever
//! produces the most plausible-looking text.

use std::fmt;

use tracing::trace;

use crate::format::FLAG_UTF8;

/// CP1251's high half (0x80..=0xFF). Position 0x98 is unassigned and must
/// not be produced by the encoder; `'\0'` marks it (no non-ASCII char ever
/// compares equal to it).
const CP1251_HIGH: [char; 128] = [
    '\u{0402}', '\u{0403}', '\u{201A}', '\u{0453}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{20AC}', '\u{2030}', '\u{0409}', '\u{2039}', '\u{040A}', '\u{040C}', '\u{040B}', '\u{040F}',
    '\u{0452}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\0', '\u{2122}', '\u{0459}', '\u{203A}', '\u{045A}', '\u{045C}', '\u{045B}', '\u{045F}',
    '\u{00A0}', '\u{040E}', '\u{045E}', '\u{0408}', '\u{00A4}', '\u{0490}', '\u{00A6}', '\u{00A7}',
    '\u{0401}', '\u{00A9}', '\u{0404}', '\u{00AB}', '\u{00AC}', '\u{00AD}', '\u{00AE}', '\u{0407}',
    '\u{00B0}', '\u{00B1}', '\u{0406}', '\u{0456}', '\u{0491}', '\u{00B5}', '\u{00B6}', '\u{00B7}',
    '\u{0451}', '\u{2116}', '\u{0454}', '\u{00BB}', '\u{0458}', '\u{0405}', '\u{0455}', '\u{0457}',
    '\u{0410}', '\u{0411}', '\u{0412}', '\u{0413}', '\u{0414}', '\u{0415}', '\u{0416}', '\u{0417}',
    '\u{0418}', '\u{0419}', '\u{041A}', '\u{041B}', '\u{041C}', '\u{041D}', '\u{041E}', '\u{041F}',
    '\u{0420}', '\u{0421}', '\u{0422}', '\u{0423}', '\u{0424}', '\u{0425}', '\u{0426}', '\u{0427}',
    '\u{0428}', '\u{0429}', '\u{042A}', '\u{042B}', '\u{042C}', '\u{042D}', '\u{042E}', '\u{042F}',
    '\u{0430}', '\u{0431}', '\u{0432}', '\u{0433}', '\u{0434}', '\u{0435}', '\u{0436}', '\u{0437}',
    '\u{0438}', '\u{0439}', '\u{043A}', '\u{043B}', '\u{043C}', '\u{043D}', '\u{043E}', '\u{043F}',
    '\u{0440}', '\u{0441}', '\u{0442}', '\u{0443}', '\u{0444}', '\u{0445}', '\u{0446}', '\u{0447}',
    '\u{0448}', '\u{0449}', '\u{044A}', '\u{044B}', '\u{044C}', '\u{044D}', '\u{044E}', '\u{044F}',
];

/// Name encodings the writer can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameEncoding {
    /// [UTF-8](https://en.wikipedia.org/wiki/UTF-8), opt-in for ZIP files
    /// via bit 11 of the general-purpose flags.
    #[default]
    Utf8,

    /// [Windows-1251](https://en.wikipedia.org/wiki/Windows-1251), the
    /// legacy Cyrillic code page. Emitted with bit 11 clear.
    Cp1251,
}

impl fmt::Display for NameEncoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NameEncoding::Utf8 => write!(f, "utf-8"),
            NameEncoding::Cp1251 => write!(f, "cp1251"),
        }
    }
}

impl NameEncoding {
    /// Whether names in this encoding carry the UTF-8 flag (bit 11).
    pub fn is_utf8(self) -> bool {
        matches!(self, NameEncoding::Utf8)
    }

    /// Encode a name for the archive.
    ///
    /// CP1251 maps ASCII by identity and the high half through a fixed
    /// table; a character outside that table is an error, there is no `?`
    /// substitution.
    pub fn encode(self, name: &str) -> Result<Vec<u8>, EncodingError> {
        match self {
            NameEncoding::Utf8 => Ok(name.as_bytes().to_vec()),
            NameEncoding::Cp1251 => {
                let mut out = Vec::with_capacity(name.len());
                for ch in name.chars() {
                    if ch.is_ascii() {
                        out.push(ch as u8);
                    } else if let Some(idx) = CP1251_HIGH.iter().position(|&t| t == ch) {
                        out.push(0x80 + idx as u8);
                    } else {
                        return Err(EncodingError::Unrepresentable { ch, encoding: self });
                    }
                }
                Ok(out)
            }
        }
    }
}

/// Candidate encodings the recovery scanner tries for un-flagged names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// UTF-8; only a candidate when the bytes happen to validate.
    Utf8,

    /// [Codepage 866](https://en.wikipedia.org/wiki/Code_page_866), the DOS
    /// Cyrillic code page.
    Cp866,

    /// Windows-1251.
    Cp1251,

    /// [Codepage 437](https://en.wikipedia.org/wiki/Code_page_437), the
    /// original encoding of the zip format.
    Cp437,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Encoding as T;
        match self {
            T::Utf8 => write!(f, "utf-8"),
            T::Cp866 => write!(f, "cp866"),
            T::Cp1251 => write!(f, "cp1251"),
            T::Cp437 => write!(f, "cp-437"),
        }
    }
}

impl Encoding {
    fn decode(self, raw: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(raw).ok().map(str::to_string),
            Encoding::Cp866 => Some(decode_as(raw, encoding_rs::IBM866)),
            Encoding::Cp1251 => Some(decode_as(raw, encoding_rs::WINDOWS_1251)),
            Encoding::Cp437 => Some(oem_cp::decode_string_complete_table(
                raw,
                &oem_cp::code_table::DECODING_TABLE_CP437,
            )),
        }
    }
}

fn decode_as(raw: &[u8], encoding: &'static encoding_rs::Encoding) -> String {
    let (text, _had_errors) = encoding.decode_without_bom_handling(raw);
    text.into_owned()
}

/// Errors encountered while encoding names into an archive.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// A character has no mapping in the selected output encoding.
    #[error("{ch:?} is not representable in {encoding}")]
    Unrepresentable {
        /// The offending character
        ch: char,
        /// The encoding that rejected it
        encoding: NameEncoding,
    },
}

/// Errors encountered while converting raw name bytes back to text.
#[derive(Debug, thiserror::Error)]
pub enum DecodingError {
    /// Bit 11 promised UTF-8 and the bytes do not deliver.
    #[error("name is flagged utf-8 but is not valid utf-8")]
    FlaggedUtf8Invalid,
}

/// Decode raw name bytes from a local file header.
///
/// When bit 11 is set the bytes must be valid UTF-8, full stop. Otherwise
/// every candidate encoding is tried and the decoding with the highest
/// plausibility score wins; Cyrillic text mis-read as CP437 turns into
/// box-drawing soup and loses reliably.
pub fn decode_name(raw: &[u8], flags: u16) -> Result<String, DecodingError> {
    if flags & FLAG_UTF8 != 0 {
        return match std::str::from_utf8(raw) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(DecodingError::FlaggedUtf8Invalid),
        };
    }

    const CANDIDATES: [Encoding; 4] = [
        Encoding::Utf8,
        Encoding::Cp866,
        Encoding::Cp1251,
        Encoding::Cp437,
    ];

    let mut best: Option<(i32, String)> = None;
    for encoding in CANDIDATES {
        let Some(text) = encoding.decode(raw) else {
            continue;
        };
        let score = plausibility(&text);
        trace!(%encoding, score, "name candidate");
        if best.as_ref().map_or(true, |(top, _)| score > *top) {
            best = Some((score, text));
        }
    }
    // The single-byte candidates decode unconditionally, so `best` is only
    // empty for an empty name, which the path sanitizer rejects anyway.
    Ok(best.map(|(_, text)| text).unwrap_or_default())
}

fn plausibility(text: &str) -> i32 {
    text.chars().map(score_char).sum()
}

fn score_char(c: char) -> i32 {
    match c {
        c if c.is_alphanumeric() => 2,
        ' ' | '.' | '_' | '-' | '(' | ')' | '[' | ']' | '{' | '}' | '/' | '\\' => 1,
        '\t' | '\r' | '\n' => -5,
        '\u{2500}'..='\u{257F}' => -3,
        '\u{FFFD}' => -5,
        c if c.is_control() => -3,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cp1251_round_trips_through_the_heuristic() {
        let name = "Документы/заметка.txt";
        let raw = NameEncoding::Cp1251.encode(name).unwrap();
        assert_eq!(decode_name(&raw, 0).unwrap(), name);
    }

    #[test]
    fn cp1251_beats_the_oem_codepages_on_cyrillic() {
        let raw = NameEncoding::Cp1251.encode("Документы/заметка.txt").unwrap();
        let cp1251 = plausibility(&Encoding::Cp1251.decode(&raw).unwrap());
        let cp866 = plausibility(&Encoding::Cp866.decode(&raw).unwrap());
        let cp437 = plausibility(&Encoding::Cp437.decode(&raw).unwrap());
        assert!(cp1251 > cp866, "{cp1251} vs {cp866}");
        assert!(cp1251 > cp437, "{cp1251} vs {cp437}");
    }

    #[test]
    fn unassigned_0x98_rejects_on_encode() {
        let err = NameEncoding::Cp1251.encode("\u{0098}").unwrap_err();
        assert!(matches!(err, EncodingError::Unrepresentable { .. }));
    }

    #[test]
    fn unmapped_characters_reject_on_encode() {
        assert!(NameEncoding::Cp1251.encode("漢字.txt").is_err());
        // the euro sign is in the table though
        assert_eq!(NameEncoding::Cp1251.encode("€").unwrap(), vec![0x88]);
    }

    #[test]
    fn flagged_utf8_must_be_valid() {
        assert!(decode_name(b"caf\xe9", FLAG_UTF8).is_err());
        assert_eq!(decode_name("café".as_bytes(), FLAG_UTF8).unwrap(), "café");
    }

    #[test]
    fn ascii_decodes_as_itself() {
        assert_eq!(decode_name(b"plain/name.txt", 0).unwrap(), "plain/name.txt");
    }
}

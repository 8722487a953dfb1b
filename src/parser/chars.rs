//! Character classes from XML 1.0 §2.2 and §2.3.
//!
//! The serializer and the path lexer share these with the parser, so a name
//! the parser accepts is exactly a name the other two accept.

/// `NameStartChar` ranges beyond ASCII, inclusive, in ascending order.
const NAME_START: &[(char, char)] = &[
    ('\u{C0}', '\u{D6}'),
    ('\u{D8}', '\u{F6}'),
    ('\u{F8}', '\u{2FF}'),
    ('\u{370}', '\u{37D}'),
    ('\u{37F}', '\u{1FFF}'),
    ('\u{200C}', '\u{200D}'),
    ('\u{2070}', '\u{218F}'),
    ('\u{2C00}', '\u{2FEF}'),
    ('\u{3001}', '\u{D7FF}'),
    ('\u{F900}', '\u{FDCF}'),
    ('\u{FDF0}', '\u{FFFD}'),
    ('\u{10000}', '\u{EFFFF}'),
];

/// Extra `NameChar` ranges beyond ASCII.
const NAME_EXTRA: &[(char, char)] = &[
    ('\u{B7}', '\u{B7}'),
    ('\u{300}', '\u{36F}'),
    ('\u{203F}', '\u{2040}'),
];

fn in_ranges(c: char, ranges: &[(char, char)]) -> bool {
    ranges.iter().any(|&(lo, hi)| (lo..=hi).contains(&c))
}

/// `Char` (XML 1.0 `[2]`): the characters a document may contain at all.
pub(crate) fn is_xml_char(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => true,
        // Surrogates cannot occur in a `char`.
        _ => c >= ' ' && !matches!(c, '\u{FFFE}' | '\u{FFFF}'),
    }
}

/// `NameStartChar` (XML 1.0 `[4]`).
pub(crate) fn is_name_start_char(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_alphabetic() || c == '_' || c == ':';
    }
    in_ranges(c, NAME_START)
}

/// `NameChar` (XML 1.0 `[4a]`).
pub(crate) fn is_name_char(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-' | '.');
    }
    in_ranges(c, NAME_START) || in_ranges(c, NAME_EXTRA)
}

/// `Name` (XML 1.0 `[5]`).
pub(crate) fn is_xml_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char)
}

/// `S` (XML 1.0 `[3]`) as a byte test, for scanning ASCII markup.
pub(crate) fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_char_boundaries() {
        assert!(is_xml_char('\t'));
        assert!(!is_xml_char('\u{0}'));
        assert!(!is_xml_char('\u{1F}'));
        assert!(is_xml_char('\u{D7FF}'));
        assert!(is_xml_char('\u{E000}'));
        assert!(!is_xml_char('\u{FFFE}'));
        assert!(is_xml_char('\u{10FFFF}'));
    }

    #[test]
    fn test_name_chars() {
        assert!(is_name_start_char('\u{E9}'));
        assert!(!is_name_start_char('\u{D7}'));
        assert!(!is_name_start_char('-'));
        assert!(is_name_char('-'));
        assert!(is_name_char('\u{B7}'));
        assert!(!is_name_start_char('\u{B7}'));
    }

    #[test]
    fn test_is_xml_name() {
        assert!(is_xml_name("a-b.c"));
        assert!(is_xml_name("_x:y"));
        assert!(is_xml_name("\u{4e2d}\u{6587}"));
        assert!(!is_xml_name("-a"));
        assert!(!is_xml_name("a b"));
        assert!(!is_xml_name(""));
    }
}

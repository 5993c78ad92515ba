//! Conversions between the application's code page 437 strings and what the host expects.

use webpal_base::FilePath;

/// Longest string, in code page 437 characters, that may be expanded for the host.
pub const FILENAME_SIZE: usize = 260;

/// Glyphs shown for bytes 0x00..0x20. Zero stays NUL.
const CONTROL_CHARS: [char; 32] = [
    '\0', '☺', '☻', '♥', '♦', '♣', '♠', '•', '◘', '○', '◙', '♂', '♀', '♪', '♫', '☼', //
    '►', '◄', '↕', '‼', '¶', '§', '▬', '↨', '↑', '↓', '→', '←', '∟', '↔', '▲', '▼',
];

/// Glyphs for bytes 0x7F..=0xFF.
const EXTENDED_CHARS: [char; 129] = [
    '⌂', //
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', //
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ', //
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»', //
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐', //
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧', //
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀', //
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩', //
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}',
];

/// The Unicode character a code page 437 byte stands for.
pub fn cp437_to_char(byte: u8) -> char {
    match byte {
        0x00..=0x1F => CONTROL_CHARS[usize::from(byte)],
        0x20..=0x7E => char::from(byte),
        _ => EXTENDED_CHARS[usize::from(byte - 0x7F)],
    }
}

/// Expand code page 437 text into UTF-8.
///
/// # Panics
///
/// Panics if `text` is longer than [`FILENAME_SIZE`]. Callers never pass strings that long;
/// one that does is a bug, not a recoverable condition.
pub fn encode_utf8(text: &[u8]) -> String {
    assert!(
        text.len() <= FILENAME_SIZE,
        "string too long to expand ({} > {})",
        text.len(),
        FILENAME_SIZE
    );
    text.iter().copied().map(cp437_to_char).collect()
}

/// Host path for a code page 437 path string.
pub fn path_from_cp437(text: &[u8]) -> FilePath {
    FilePath::from(encode_utf8(text))
}

/// System description of an error code.
///
/// Codes from 1000 upwards are never native errno values, and asking the system about them
/// only produces filler like "Unknown error", so those yield `None`.
pub fn describe_error(code: u32) -> Option<String> {
    if code >= 1000 {
        return None;
    }
    let raw = i32::try_from(code).ok()?;
    let message = std::io::Error::from_raw_os_error(raw).to_string();
    // std appends " (os error N)"; only the system text is wanted.
    let message = match message.rfind(" (os error") {
        Some(end) => message[..end].to_string(),
        None => message,
    };
    if message.is_empty() || message.starts_with("Unknown error") {
        None
    } else {
        Some(message)
    }
}

/// The arguments after the executable path, at most `max` of them.
pub fn command_line_args<S: AsRef<str>>(argv: &[S], max: usize) -> Vec<String> {
    argv.iter()
        .skip(1)
        .take(max)
        .map(|arg| arg.as_ref().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_unchanged() {
        assert_eq!(encode_utf8(b"maps/level.cw"), "maps/level.cw");
    }

    #[test]
    fn test_extended_characters() {
        assert_eq!(encode_utf8(&[0x80, 0x81, 0xE1]), "Çüß");
        assert_eq!(cp437_to_char(0x7F), '⌂');
        assert_eq!(cp437_to_char(0xFF), '\u{a0}');
        assert_eq!(cp437_to_char(0x01), '☺');
    }

    #[test]
    fn test_multi_byte_output() {
        let encoded = encode_utf8(&[0xB0, b'x']);
        assert_eq!(encoded, "░x");
        assert_eq!(encoded.len(), 4);
    }

    #[test]
    fn test_limit_is_inclusive() {
        let text = vec![b'a'; FILENAME_SIZE];
        assert_eq!(encode_utf8(&text).len(), FILENAME_SIZE);
    }

    #[test]
    #[should_panic(expected = "string too long to expand")]
    fn test_too_long_aborts() {
        encode_utf8(&vec![b'a'; FILENAME_SIZE + 1]);
    }

    #[test]
    fn test_path_from_cp437() {
        assert_eq!(
            path_from_cp437(b"texpacks/\x84.zip").as_str(),
            "texpacks/ä.zip"
        );
    }

    #[test]
    fn test_describe_error() {
        assert_eq!(describe_error(1000), None);
        assert_eq!(describe_error(0xCCDE_D001), None);
        let message = describe_error(2).unwrap();
        assert!(!message.is_empty());
        assert!(!message.contains("os error"));
    }

    #[test]
    fn test_command_line_args() {
        let argv = ["webpal", "a", "b", "c", "d", "e", "f", "g"];
        assert_eq!(command_line_args(&argv, 5), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(command_line_args(&argv[..2], 5), vec!["a"]);
        assert!(command_line_args::<&str>(&[], 5).is_empty());
    }
}

//! JSON string quoting.

/// `true` for every ASCII byte that may appear unescaped inside a JSON
/// string: everything from space upwards except `"` and `\`.
static SAFE: [bool; 128] = {
    let mut table = [false; 128];
    let mut i = 0x20;
    while i < 128 {
        table[i] = i != b'"' as usize && i != b'\\' as usize;
        i += 1;
    }
    table
};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Appends `s` to `out` as a quoted JSON string.
///
/// Runs of bytes that need no escaping are copied in one go. Bytes that are
/// not part of a well-formed UTF-8 sequence are written as `\ufffd`.
pub(crate) fn quote(out: &mut Vec<u8>, s: &[u8]) {
    out.push(b'"');
    let mut start = 0;
    let mut i = 0;
    while i < s.len() {
        let b = s[i];
        if b.is_ascii() {
            if SAFE[usize::from(b)] {
                i += 1;
                continue;
            }
            out.extend_from_slice(&s[start..i]);
            match b {
                b'"' | b'\\' => out.extend_from_slice(&[b'\\', b]),
                b'\n' => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                b'\t' => out.extend_from_slice(b"\\t"),
                _ => out.extend_from_slice(&[
                    b'\\',
                    b'u',
                    b'0',
                    b'0',
                    HEX[usize::from(b >> 4)],
                    HEX[usize::from(b & 0xF)],
                ]),
            }
            i += 1;
            start = i;
            continue;
        }
        let (ch, size) = bstr::decode_utf8(&s[i..]);
        if ch.is_none() {
            out.extend_from_slice(&s[start..i]);
            out.extend_from_slice(b"\\ufffd");
            i += size;
            start = i;
            continue;
        }
        i += size;
    }
    out.extend_from_slice(&s[start..]);
    out.push(b'"');
}

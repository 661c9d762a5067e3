// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.4.7
//
// Modified UTF-8 differs from UTF-8 in two ways: NUL is written as the two
// bytes `C0 80`, and supplementary characters are written as a surrogate pair
// with each half encoded as a three byte sequence.

use std::borrow::Cow;

pub(crate) fn decode(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(s);
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let (unit, width) = if b & 0x80 == 0 {
            (b as u16, 1)
        } else if b & 0xe0 == 0xc0 && continuation(bytes, i + 1) {
            ((b as u16 & 0x1f) << 6 | bytes[i + 1] as u16 & 0x3f, 2)
        } else if b & 0xf0 == 0xe0 && continuation(bytes, i + 1) && continuation(bytes, i + 2) {
            (
                (b as u16 & 0x0f) << 12 | (bytes[i + 1] as u16 & 0x3f) << 6 | bytes[i + 2] as u16 & 0x3f,
                3,
            )
        } else {
            (0xfffd, 1)
        };

        units.push(unit);
        i += width;
    }

    Cow::Owned(String::from_utf16_lossy(&units))
}

fn continuation(bytes: &[u8], i: usize) -> bool {
    bytes.get(i).map_or(false, |b| b & 0xc0 == 0x80)
}

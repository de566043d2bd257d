//! Filtering and decoding of `type.object.key` values.

/// Bare MusicBrainz namespace keys are at most this long.
const MUSICBRAINZ_MIN_LEN: usize = 59;

/// Whether a raw key is worth storing. Rules are checked in order and the
/// first matching prefix decides.
pub fn is_interesting_key(key: &str) -> bool {
    if key.starts_with("/authority/musicbrainz/") {
        return key.len() > MUSICBRAINZ_MIN_LEN;
    }
    if key.starts_with("/en") {
        return false;
    }
    if key.starts_with("/wikipedia/") {
        return !key.contains("_id/") && !key.contains("_title/");
    }
    if key.starts_with("/dataworld/") {
        return false;
    }
    true
}

/// Replace every `$XXXX` escape (four uppercase hex digits) with the code
/// point it names. Sequences that are not a valid escape are kept verbatim.
pub fn decode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut rest = key;
    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let candidate = &rest[idx + 1..];
        match decode_escape(candidate) {
            Some(c) => {
                out.push(c);
                rest = &candidate[4..];
            }
            None => {
                out.push('$');
                rest = candidate;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_escape(candidate: &str) -> Option<char> {
    let hex = candidate.get(..4)?;
    if !hex.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

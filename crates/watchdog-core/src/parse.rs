//! Parser for the textual control-channel protocol.
//!
//! External processes write newline-separated ASCII integers to the control
//! FIFO. The last token that parses fully as a base-10 integer wins; anything
//! else in a non-empty chunk still counts as evidence the writer is alive.

/// Outcome of one delivered control-channel chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetRequest {
    /// Move the deadline to `now + seconds`.
    ExtendSeconds(u64),
    /// Non-empty traffic with no usable integer; treated as a bare pet.
    Ping,
}

/// Last newline-delimited token in `buf` that parses fully as an integer.
///
/// A token only counts if parsing consumes it entirely; partial parses such
/// as `12x` are rejected. Malformed tokens never abort the scan, so later
/// valid tokens still win. Trailing data without a final newline forms a
/// token of its own.
#[must_use]
pub fn last_integer(buf: &[u8]) -> Option<i64> {
    buf.split(|byte| *byte == b'\n')
        .filter(|token| !token.is_empty())
        .filter_map(|token| std::str::from_utf8(token).ok())
        .filter_map(|token| token.parse::<i64>().ok())
        .next_back()
}

/// Maps a delivered chunk to a request per the control protocol.
///
/// An empty chunk carries no request. A non-negative integer asks for an
/// extension of that many seconds. Negative integers and chunks without any
/// fully-valid integer degrade to [`PetRequest::Ping`].
#[must_use]
pub fn interpret(buf: &[u8]) -> Option<PetRequest> {
    if buf.is_empty() {
        return None;
    }
    let request = last_integer(buf).map_or(PetRequest::Ping, |value| {
        u64::try_from(value).map_or(PetRequest::Ping, PetRequest::ExtendSeconds)
    });
    Some(request)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{PetRequest, interpret, last_integer};

    #[rstest]
    #[case::single_token(b"5\n".as_slice(), Some(5))]
    #[case::last_valid_wins(b"5\n12\n".as_slice(), Some(12))]
    #[case::malformed_prefix_ignored(b"banana\n12\n".as_slice(), Some(12))]
    #[case::malformed_suffix_ignored(b"12\nbanana\n".as_slice(), Some(12))]
    #[case::malformed_between_ignored(b"3\nbanana\n7\n".as_slice(), Some(7))]
    #[case::partial_parse_rejected(b"12x\n".as_slice(), None)]
    #[case::negative_accepted(b"-3\n".as_slice(), Some(-3))]
    #[case::no_trailing_newline(b"42".as_slice(), Some(42))]
    #[case::empty_lines_skipped(b"\n\n9\n\n".as_slice(), Some(9))]
    #[case::nothing_valid(b"banana\n".as_slice(), None)]
    #[case::empty_buffer(b"".as_slice(), None)]
    #[case::overflowing_number_rejected(b"99999999999999999999\n".as_slice(), None)]
    #[case::non_utf8_token_rejected(b"\xff\xfe\n8\n".as_slice(), Some(8))]
    fn scans_for_the_last_full_integer(#[case] buf: &[u8], #[case] expected: Option<i64>) {
        assert_eq!(last_integer(buf), expected);
    }

    #[rstest]
    #[case::extension(b"30\n".as_slice(), Some(PetRequest::ExtendSeconds(30)))]
    #[case::zero_extension(b"0\n".as_slice(), Some(PetRequest::ExtendSeconds(0)))]
    #[case::negative_degrades_to_ping(b"-5\n".as_slice(), Some(PetRequest::Ping))]
    #[case::garbage_degrades_to_ping(b"hello\n".as_slice(), Some(PetRequest::Ping))]
    #[case::bare_newline_is_a_ping(b"\n".as_slice(), Some(PetRequest::Ping))]
    #[case::empty_chunk_is_no_request(b"".as_slice(), None)]
    fn interprets_chunks_as_requests(#[case] buf: &[u8], #[case] expected: Option<PetRequest>) {
        assert_eq!(interpret(buf), expected);
    }
}

//! Decoding of the socket shim's signed return values.
//!
//! The shim packs success and failure into one `i32`: a non-negative value is the payload
//! (byte count, pending bytes, readiness bits), a negative value is the negated error code.
//! Each shim call is decoded exactly once, right where it returns.

use webpal_base::ReturnCode;

/// Split a raw shim result into its payload or its error code.
pub fn decode(raw: i32) -> Result<u32, ReturnCode> {
    match u32::try_from(raw) {
        Ok(payload) => Ok(payload),
        // Negative values are never zero once negated.
        Err(_) => Err(ReturnCode::new(raw.unsigned_abs()).unwrap_or(ReturnCode::INVALID_ARGUMENT)),
    }
}

/// [`decode`] for the connect call.
///
/// The shim answers a malformed address with "host unreachable"; callers see that as an
/// invalid argument. No other call gets this remap.
pub fn decode_connect(raw: i32) -> Result<u32, ReturnCode> {
    decode(raw).map_err(|code| {
        if code == ReturnCode::SOCKET_HOST_UNREACHABLE {
            ReturnCode::INVALID_ARGUMENT
        } else {
            code
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpal_base::errno::transport;

    #[test]
    fn test_non_negative_passes_through() {
        assert_eq!(decode(0), Ok(0));
        assert_eq!(decode(25), Ok(25));
        assert_eq!(decode(i32::MAX), Ok(i32::MAX as u32));
    }

    #[test]
    fn test_negative_is_negated_code() {
        assert_eq!(
            decode(transport::failure(transport::EAGAIN)),
            Err(ReturnCode::SOCKET_WOULD_BLOCK)
        );
        assert_eq!(decode(-1234), Err(ReturnCode::new(1234).unwrap()));
    }

    #[test]
    fn test_most_negative_value() {
        assert_eq!(decode(i32::MIN), Err(ReturnCode::new(1 << 31).unwrap()));
    }

    #[test]
    fn test_host_unreachable_remapped_only_on_connect() {
        let raw = transport::failure(transport::EHOSTUNREACH);
        assert_eq!(decode_connect(raw), Err(ReturnCode::INVALID_ARGUMENT));
        assert_eq!(decode(raw), Err(ReturnCode::SOCKET_HOST_UNREACHABLE));
    }

    #[test]
    fn test_connect_in_progress_is_kept() {
        assert_eq!(
            decode_connect(transport::failure(transport::EINPROGRESS)),
            Err(ReturnCode::SOCKET_IN_PROGRESS)
        );
        assert_eq!(decode_connect(0), Ok(0));
    }
}

//! Encryption of stored secrets. The host offers no key store to build it on.

use webpal_base::{PalResult, ReturnCode};

pub fn encrypt(_data: &[u8]) -> PalResult<Vec<u8>> {
    Err(ReturnCode::NOT_SUPPORTED)
}

pub fn decrypt(_data: &[u8]) -> PalResult<Vec<u8>> {
    Err(ReturnCode::NOT_SUPPORTED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_supported() {
        assert_eq!(encrypt(b"secret"), Err(ReturnCode::NOT_SUPPORTED));
        assert_eq!(decrypt(b"secret"), Err(ReturnCode::NOT_SUPPORTED));
    }
}

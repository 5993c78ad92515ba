//! Dynamic libraries. The host has no loader, so nothing is ever found.

use webpal_base::FilePath;

/// A loaded library. No value of this type can be obtained on this backend.
#[derive(Debug)]
pub struct DynamicLib(());

pub fn load(_path: &FilePath) -> Option<DynamicLib> {
    None
}

pub fn symbol(_lib: &DynamicLib, _name: &str) -> Option<usize> {
    None
}

/// Details of the last load failure; there never are any.
pub fn describe_error() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_loads() {
        assert!(load(&FilePath::from("libcurl.so")).is_none());
        assert_eq!(describe_error(), None);
    }
}

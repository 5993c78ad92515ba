use relative_path::{RelativePath, RelativePathBuf};
use std::path::{Path, PathBuf};

/* 📖 # Why use RelativePathBuf for FilePath?

Paths handed to the PAL are namespace paths of the emulated filesystem, always '/'-separated
regardless of the machine running the tests. RelativePathBuf gives us that separator
discipline and a safe way to map a namespace path under a real base directory
(`to_path`), where a leading '/' never escapes the base.
*/

/// Namespace path inside the host filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath(RelativePathBuf);

impl FilePath {
    /// Returns the underlying RelativePathBuf as a reference.
    pub fn as_relative(&self) -> &RelativePath {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Converts to a regular Path, without any base directory.
    pub fn as_path(&self) -> &Path {
        Path::new(self.as_str())
    }

    /// Consumes the FilePath and returns a PathBuf.
    pub fn into_path_buf(self) -> PathBuf {
        PathBuf::from(self.0.as_str())
    }

    /// Maps the namespace path below `base`.
    pub fn to_path(&self, base: &Path) -> PathBuf {
        self.0.to_path(base)
    }

    /// Path of an entry inside this directory: `self + "/" + name`, verbatim.
    pub fn child(&self, name: &str) -> FilePath {
        FilePath(RelativePathBuf::from(format!("{}/{}", self.0, name)))
    }

    /// Canonical form used as a lookup key: `.` and `..` resolved, empty segments and
    /// leading/trailing separators dropped. The root is the empty string.
    pub fn normalized(&self) -> String {
        self.0.normalize().into_string()
    }

    pub fn is_absolute(&self) -> bool {
        self.0.as_str().starts_with('/')
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<RelativePathBuf> for FilePath {
    fn from(p: RelativePathBuf) -> Self {
        Self(p)
    }
}

impl From<&Path> for FilePath {
    fn from(p: &Path) -> Self {
        Self(RelativePathBuf::from(p.to_string_lossy().into_owned()))
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<RelativePath> for FilePath {
    fn as_ref(&self) -> &RelativePath {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_concatenates_verbatim() {
        let root = FilePath::from("maps");
        assert_eq!(root.child("level.cw").as_str(), "maps/level.cw");
        assert_eq!(
            root.child("sub").child("a.txt").as_str(),
            "maps/sub/a.txt"
        );
    }

    #[test]
    fn test_normalized() {
        assert_eq!(FilePath::from("./maps/../texpacks/").normalized(), "texpacks");
        assert_eq!(FilePath::from("/classicube/maps").normalized(), "classicube/maps");
        assert_eq!(FilePath::from(".").normalized(), "");
    }

    #[test]
    fn test_to_path_stays_below_base() {
        let base = Path::new("base");
        let resolved = FilePath::from("/classicube").to_path(base);
        assert!(resolved.starts_with(base));
        assert!(resolved.ends_with("classicube"));
    }

    #[test]
    fn test_is_absolute() {
        assert!(FilePath::from("/classicube").is_absolute());
        assert!(!FilePath::from("maps").is_absolute());
    }

    #[test]
    fn test_display() {
        assert_eq!(FilePath::from("src/main.rs").to_string(), "src/main.rs");
    }
}

/* 📖 # Why does the walker stop at the first error?

Callers use enumeration to build lists they act on (maps to load, texture packs to offer). A
partial list that silently misses a subtree is worse than no list, so the first failure
anywhere in the tree aborts the whole walk and is returned as is. Directory handles are held by
a guard and released on every exit path, including the early return.
*/

use tracing::{debug, instrument};

use webpal_base::pal::{EntryKind, HostHandle, RawDir};
use webpal_base::{FilePath, PalResult};

/// Open listing that is closed when dropped.
struct DirStream<'a> {
    host: &'a HostHandle,
    raw: RawDir,
}

impl<'a> DirStream<'a> {
    fn open(host: &'a HostHandle, path: &FilePath) -> PalResult<Self> {
        let raw = host.open_dir(path)?;
        Ok(Self { host, raw })
    }
}

impl Drop for DirStream<'_> {
    fn drop(&mut self) {
        self.host.close_dir(self.raw);
    }
}

/// Walk `root` in pre-order and call `callback` with the path of every non-directory entry.
///
/// Child paths are built as `parent + "/" + name`; `.` and `..` are skipped. When the listing
/// carries no type for an entry, the entry is `stat`ed to decide whether to descend.
#[instrument(skip(host, callback), fields(root = %root))]
pub fn enumerate<F>(host: &HostHandle, root: &FilePath, mut callback: F) -> PalResult<()>
where
    F: FnMut(&FilePath),
{
    walk(host, root, &mut callback)
}

fn walk<F>(host: &HostHandle, dir: &FilePath, callback: &mut F) -> PalResult<()>
where
    F: FnMut(&FilePath),
{
    let stream = DirStream::open(host, dir)?;
    while let Some(entry) = host.read_dir(stream.raw)? {
        if entry.is_dot_entry() {
            continue;
        }
        let child = dir.child(&entry.name);
        let is_directory = match entry.kind {
            EntryKind::Directory => true,
            EntryKind::File => false,
            EntryKind::Unknown => host.stat(&child)?.kind == EntryKind::Directory,
        };
        if is_directory {
            walk(host, &child, callback).inspect_err(|code| {
                debug!(path = %child, ?code, "aborting walk");
            })?;
        } else {
            callback(&child);
        }
    }
    Ok(())
}

/// Create a single directory. An existing directory reports `ReturnCode::DIRECTORY_EXISTS`.
#[instrument(skip(host), fields(path = %path))]
pub fn create_directory(host: &HostHandle, path: &FilePath) -> PalResult<()> {
    host.create_dir(path)
}

/// Whether `path` names an existing regular file.
pub fn file_exists(host: &HostHandle, path: &FilePath) -> bool {
    host.stat(path)
        .is_ok_and(|meta| meta.kind == EntryKind::File)
}

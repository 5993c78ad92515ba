use std::io::{self, SeekFrom};

use tracing::{debug, instrument, warn};

use webpal_base::pal::{HostHandle, OpenMode, RawFile};
use webpal_base::{FilePath, PalResult};

/* 📖 # Why does closing a file also sync the filesystem?

The browser host keeps its filesystem in memory and only persists it when asked. Every close is
therefore followed by a sync request so that data written through a File survives a page
reload. The sync is fire-and-forget: its outcome cannot be observed and is never reported to the
caller, who only ever sees the result of the close itself.
*/

/// An open file in the host filesystem.
///
/// The handle is released when the value is dropped. Call [`File::close`] to observe the
/// result of closing; dropping discards it.
#[derive(Debug)]
pub struct File {
    host: HostHandle,
    raw: RawFile,
    path: FilePath,
    closed: bool,
}

impl File {
    /// Open an existing file for reading.
    pub fn open(host: &HostHandle, path: &FilePath) -> PalResult<File> {
        Self::open_with(host, path, OpenMode::ReadOnly)
    }

    /// Create a file for reading and writing, truncating it if it exists.
    pub fn create(host: &HostHandle, path: &FilePath) -> PalResult<File> {
        Self::open_with(host, path, OpenMode::CreateTruncate)
    }

    /// Open a file for reading and writing, creating it if it does not exist.
    pub fn open_or_create(host: &HostHandle, path: &FilePath) -> PalResult<File> {
        Self::open_with(host, path, OpenMode::OpenOrCreate)
    }

    #[instrument(skip(host), fields(path = %path))]
    fn open_with(host: &HostHandle, path: &FilePath, mode: OpenMode) -> PalResult<File> {
        let raw = host.open_file(path, mode)?;
        debug!(raw, "file opened");
        Ok(File {
            host: host.clone(),
            raw,
            path: path.clone(),
            closed: false,
        })
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    pub fn raw(&self) -> RawFile {
        self.raw
    }

    /// Read up to `buf.len()` bytes; returns the count read, zero at end of file.
    pub fn read(&mut self, buf: &mut [u8]) -> PalResult<usize> {
        self.host.read_file(self.raw, buf)
    }

    /// Write up to `data.len()` bytes; returns the count written.
    pub fn write(&mut self, data: &[u8]) -> PalResult<usize> {
        self.host.write_file(self.raw, data)
    }

    /// Move the position; returns the new position from the start of the file.
    pub fn seek(&mut self, pos: SeekFrom) -> PalResult<u64> {
        self.host.seek_file(self.raw, pos)
    }

    pub fn position(&mut self) -> PalResult<u64> {
        self.host.seek_file(self.raw, SeekFrom::Current(0))
    }

    pub fn length(&self) -> PalResult<u64> {
        self.host.file_length(self.raw)
    }

    /// Close the file and request a filesystem sync.
    pub fn close(mut self) -> PalResult<()> {
        self.release()
    }

    fn release(&mut self) -> PalResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let result = self.host.close_file(self.raw);
        self.host.sync_fs();
        result
    }
}

impl Drop for File {
    fn drop(&mut self) {
        if let Err(code) = self.release() {
            warn!(path = %self.path, %code, "failed to close file on drop");
        }
    }
}

impl io::Read for File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        File::read(self, buf).map_err(io::Error::other)
    }
}

impl io::Write for File {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        File::write(self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for File {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        File::seek(self, pos).map_err(io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use webpal_base::errno::native;
    use webpal_base::{MockHost, ReturnCode};

    fn host() -> (MockHost, HostHandle) {
        let mock = MockHost::new();
        let host = HostHandle::new(mock.clone());
        (mock, host)
    }

    #[test]
    fn test_round_trip() {
        let (_mock, host) = host();
        let path = FilePath::from("options.txt");
        let payload = b"usetexturepack=classic.zip\n";

        let mut file = File::create(&host, &path).unwrap();
        assert_eq!(file.write(payload).unwrap(), payload.len());
        file.close().unwrap();

        let mut file = File::open(&host, &path).unwrap();
        let mut buf = vec![0u8; 64];
        let count = file.read(&mut buf).unwrap();
        assert_eq!(&buf[..count], payload);
        assert_eq!(file.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_open_missing_passes_code_through() {
        let (_mock, host) = host();
        let result = File::open(&host, &FilePath::from("missing.txt"));
        assert_eq!(result.unwrap_err(), ReturnCode::FILE_NOT_FOUND);
    }

    #[test]
    fn test_close_syncs_after_closing() {
        let (mock, host) = host();
        let file = File::create(&host, &FilePath::from("a.bin")).unwrap();
        assert_eq!(mock.open_file_count(), 1);
        assert_eq!(mock.sync_count(), 0);

        file.close().unwrap();

        assert_eq!(mock.open_file_count(), 0);
        assert_eq!(mock.sync_count(), 1);
    }

    #[test]
    fn test_drop_closes_and_syncs() {
        let (mock, host) = host();
        {
            let mut file = File::create(&host, &FilePath::from("a.bin")).unwrap();
            file.write(b"data").unwrap();
        }
        assert_eq!(mock.open_file_count(), 0);
        assert_eq!(mock.sync_count(), 1);
        assert_eq!(mock.file_contents("a.bin"), Some(b"data".to_vec()));
    }

    #[test]
    fn test_position_length_and_seek() {
        let (mock, host) = host();
        mock.add_file("level.cw", b"0123456789".to_vec());
        let mut file = File::open(&host, &FilePath::from("level.cw")).unwrap();

        assert_eq!(file.length().unwrap(), 10);
        assert_eq!(file.position().unwrap(), 0);
        assert_eq!(file.seek(SeekFrom::Start(4)).unwrap(), 4);
        assert_eq!(file.seek(SeekFrom::Current(2)).unwrap(), 6);
        assert_eq!(file.seek(SeekFrom::End(-1)).unwrap(), 9);
        assert_eq!(file.position().unwrap(), 9);

        let mut buf = [0u8; 4];
        assert_eq!(file.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'9');
    }

    #[test]
    fn test_open_or_create_keeps_contents() {
        let (mock, host) = host();
        mock.add_file("keep.txt", b"old".to_vec());

        let mut file = File::open_or_create(&host, &FilePath::from("keep.txt")).unwrap();
        file.seek(SeekFrom::End(0)).unwrap();
        file.write(b"+new").unwrap();
        file.close().unwrap();

        assert_eq!(mock.file_contents("keep.txt"), Some(b"old+new".to_vec()));
    }

    #[test]
    fn test_write_to_read_only_surfaces_native_code() {
        let (mock, host) = host();
        mock.add_file("ro.txt", Vec::new());
        let mut file = File::open(&host, &FilePath::from("ro.txt")).unwrap();
        assert_eq!(file.write(b"x"), Err(ReturnCode::new(native::EBADF).unwrap()));
    }

    #[test]
    fn test_std_io_traits() {
        let (_mock, host) = host();
        let path = FilePath::from("notes.txt");
        let mut file = File::create(&host, &path).unwrap();
        writeln!(file, "hello {}", 42).unwrap();
        drop(file);

        let mut text = String::new();
        File::open(&host, &path)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "hello 42\n");
    }

    #[test]
    fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let host = HostHandle::new(webpal_base::StdHost::new(dir.path().to_path_buf()));
        let path = FilePath::from("blob.bin");
        let payload: Vec<u8> = (0..=255u8).collect();

        let mut file = File::create(&host, &path).unwrap();
        file.write(&payload).unwrap();
        file.close().unwrap();

        let mut read_back = Vec::new();
        File::open(&host, &path)
            .unwrap()
            .read_to_end(&mut read_back)
            .unwrap();
        assert_eq!(read_back, payload);
    }
}

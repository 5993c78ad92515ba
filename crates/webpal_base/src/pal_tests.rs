/* 📖 # Host conformance tests

The backend only ever sees a HostHandle, so every host implementation must agree on the
collaborator contract. These tests run the same scenarios against MockHost and StdHost.

Key test categories:
- HostHandle sharing
- Filesystem contract (codes, listings, current directory)
- Transport raw-integer contract
*/

#[cfg(test)]
mod host_contract_tests {
    use crate::errno::transport;
    use crate::pal::{EntryKind, HostHandle, MockHost, OpenMode, StdHost};
    use crate::{FilePath, ReturnCode};

    fn hosts() -> Vec<(&'static str, HostHandle, Option<tempfile::TempDir>)> {
        let dir = tempfile::tempdir().unwrap();
        let std_host = HostHandle::new(StdHost::new(dir.path().to_path_buf()));
        vec![
            ("mock", HostHandle::new(MockHost::new()), None),
            ("std", std_host, Some(dir)),
        ]
    }

    fn listing(host: &HostHandle, path: &str) -> Vec<(String, EntryKind)> {
        let dir = host.open_dir(&FilePath::from(path)).unwrap();
        let mut entries = Vec::new();
        while let Some(entry) = host.read_dir(dir).unwrap() {
            if !entry.is_dot_entry() {
                entries.push((entry.name, entry.kind));
            }
        }
        host.close_dir(dir);
        entries.sort();
        entries
    }

    #[test]
    fn test_host_handle_shares_state() {
        let mock = MockHost::new();
        let handle = HostHandle::new(mock.clone());
        handle.create_dir(&FilePath::from("maps")).unwrap();
        assert!(mock.is_directory("maps"));
    }

    #[test]
    fn test_missing_file_code_agrees() {
        for (name, host, _dir) in hosts() {
            let result = host.open_file(&FilePath::from("absent.txt"), OpenMode::ReadOnly);
            assert_eq!(result, Err(ReturnCode::FILE_NOT_FOUND), "host {name}");
        }
    }

    #[test]
    fn test_parent_of_root_is_not_found() {
        for (name, host, _dir) in hosts() {
            for path in ["../outside.txt", "/../outside.txt"] {
                assert_eq!(
                    host.open_file(&FilePath::from(path), OpenMode::ReadOnly),
                    Err(ReturnCode::FILE_NOT_FOUND),
                    "host {name} path {path}"
                );
            }
            assert_eq!(
                host.open_file(&FilePath::from("../outside.txt"), OpenMode::CreateTruncate),
                Err(ReturnCode::FILE_NOT_FOUND),
                "host {name}"
            );
            assert!(host.open_dir(&FilePath::from("..")).is_err(), "host {name}");
        }
    }

    #[test]
    fn test_directory_exists_code_agrees() {
        for (name, host, _dir) in hosts() {
            host.create_dir(&FilePath::from("texpacks")).unwrap();
            assert_eq!(
                host.create_dir(&FilePath::from("texpacks")),
                Err(ReturnCode::DIRECTORY_EXISTS),
                "host {name}"
            );
        }
    }

    #[test]
    fn test_listing_agrees() {
        for (name, host, _dir) in hosts() {
            host.create_dir(&FilePath::from("root")).unwrap();
            host.create_dir(&FilePath::from("root/sub")).unwrap();
            let file = host
                .open_file(&FilePath::from("root/a.txt"), OpenMode::CreateTruncate)
                .unwrap();
            host.close_file(file).unwrap();

            assert_eq!(
                listing(&host, "root"),
                vec![
                    ("a.txt".to_string(), EntryKind::File),
                    ("sub".to_string(), EntryKind::Directory),
                ],
                "host {name}"
            );
        }
    }

    #[test]
    fn test_reopen_keeps_or_truncates() {
        for (name, host, _dir) in hosts() {
            let path = FilePath::from("options.txt");
            let file = host.open_file(&path, OpenMode::CreateTruncate).unwrap();
            host.write_file(file, b"abc").unwrap();
            host.close_file(file).unwrap();

            let file = host.open_file(&path, OpenMode::OpenOrCreate).unwrap();
            assert_eq!(host.file_length(file).unwrap(), 3, "host {name}");
            host.close_file(file).unwrap();

            let file = host.open_file(&path, OpenMode::CreateTruncate).unwrap();
            assert_eq!(host.file_length(file).unwrap(), 0, "host {name}");
            host.close_file(file).unwrap();
        }
    }

    #[test]
    fn test_change_dir_agrees() {
        for (name, host, _dir) in hosts() {
            host.create_dir(&FilePath::from("/classicube")).unwrap();
            host.change_dir(&FilePath::from("/classicube")).unwrap();
            let file = host
                .open_file(&FilePath::from("relative.txt"), OpenMode::CreateTruncate)
                .unwrap();
            host.close_file(file).unwrap();

            let meta = host.stat(&FilePath::from("/classicube/relative.txt")).unwrap();
            assert_eq!(meta.kind, EntryKind::File, "host {name}");
        }
    }

    #[test]
    fn test_transport_bad_handle_agrees() {
        for (name, host, _dir) in hosts() {
            let sock = host.socket_create();
            assert_eq!(host.socket_close(sock), 0, "host {name}");
            assert_eq!(
                host.socket_pending(sock),
                transport::failure(transport::EBADF),
                "host {name}"
            );
        }
    }

    #[test]
    fn test_transport_fresh_socket_is_not_ready() {
        for (name, host, _dir) in hosts() {
            let sock = host.socket_create();
            assert_eq!(host.socket_poll(sock), 0, "host {name}");
            assert_eq!(host.socket_error(sock), 0, "host {name}");
            host.socket_close(sock);
        }
    }
}

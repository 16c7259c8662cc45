//! Unit tests for StorageManager
//!
//! The manager is driven directly, without a task, over a [`MemoryFs`].
//!
//! # Test Categories
//!
//! - Boot: mount, format fallback, mount failure and recovery
//! - Queries: rendering, truncation, negative existence answers
//! - Mutations: error phrases on the system log, state left untouched
//! - Bus: replies reach the right slot, abandoned callers

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use embr_hal::DeviceSlot;
    use embr_ipc::{queue, reply_pair, status_channel, BusError, QueueSender, RequestToken, SysLog};
    use embr_vfs::testing::{MemoryFs, MemoryFsProbe};
    use embr_vfs::{StorageError, StorageMutation, StorageQuery, StorageRequest};

    use crate::config::StorageConfig;
    use crate::services::storage::{
        MountState, StorageManager, StorageParts, FLASH_DEVICE, FORMAT_COMPLETE, LISTING_HEADER,
        UNMOUNT_NOTICE,
    };

    struct Rig {
        manager: StorageManager<MemoryFs>,
        tx: QueueSender<StorageRequest>,
        syslog: SysLog,
        probe: MemoryFsProbe,
    }

    impl Rig {
        fn texts(&self) -> Vec<String> {
            self.syslog.drain().into_iter().map(|line| line.text).collect()
        }

        fn write(&mut self, path: &str, data: &str) {
            self.manager
                .mutate(&StorageMutation::WriteFile {
                    path: path.into(),
                    data: data.as_bytes().to_vec(),
                })
                .unwrap();
        }
    }

    fn rig_with(fs: MemoryFs, config: StorageConfig) -> Rig {
        let _ = env_logger::builder().is_test(true).try_init();
        let probe = fs.probe();
        let (tx, rx) = queue(1);
        let (state, _reader) = status_channel(MountState::Unmounted);
        let slot = DeviceSlot::new(
            FLASH_DEVICE,
            StorageParts {
                fs,
                requests: rx,
                state,
            },
        );
        let syslog = SysLog::new(32, || 0);
        let manager = StorageManager::new(slot.claim().unwrap(), &config, syslog.clone());
        Rig {
            manager,
            tx,
            syslog,
            probe,
        }
    }

    fn booted() -> Rig {
        let mut rig = rig_with(MemoryFs::formatted(), StorageConfig::default());
        assert_eq!(rig.manager.boot(), MountState::Mounted);
        rig.syslog.drain();
        rig
    }

    fn stat(path: &str) -> StorageQuery {
        StorageQuery::FileStat { path: path.into() }
    }

    // =========================================================================
    // Boot
    // =========================================================================

    #[test]
    fn test_boot_mounts_existing_filesystem() {
        let mut rig = rig_with(MemoryFs::formatted(), StorageConfig::default());
        assert_eq!(rig.manager.boot(), MountState::Mounted);
        assert_eq!(rig.probe.format_calls(), 0);
        assert_eq!(rig.texts(), vec!["flash0 mounted in /mnt".to_string()]);
    }

    #[test]
    fn test_boot_formats_blank_device() {
        let mut rig = rig_with(MemoryFs::new(), StorageConfig::default());
        assert_eq!(rig.manager.boot(), MountState::Mounted);
        assert_eq!(rig.probe.format_calls(), 1);
        assert_eq!(rig.probe.mount_calls(), 2);
        assert!(rig.probe.is_formatted());
    }

    #[test]
    fn test_mount_failure_rejects_everything_until_format() {
        let mut rig = rig_with(MemoryFs::new(), StorageConfig::default());
        rig.probe.fail_format(true);
        assert_eq!(rig.manager.boot(), MountState::MountFailed);

        assert_eq!(rig.manager.query(&stat("a")), Err(StorageError::NotMounted));
        assert_eq!(
            rig.manager.mutate(&StorageMutation::MakeDir { path: "d".into() }),
            Err(StorageError::NotMounted)
        );

        rig.probe.fail_format(false);
        let out = rig.manager.query(&StorageQuery::Format).unwrap();
        assert_eq!(out.as_text(), FORMAT_COMPLETE);
        assert_eq!(rig.manager.state(), MountState::Mounted);
        rig.manager
            .mutate(&StorageMutation::MakeDir { path: "d".into() })
            .unwrap();
    }

    #[test]
    fn test_failed_format_reports_error() {
        let mut rig = booted();
        rig.probe.fail_format(true);
        assert_eq!(
            rig.manager.query(&StorageQuery::Format),
            Err(StorageError::IoFault)
        );
        assert_eq!(rig.manager.state(), MountState::MountFailed);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[test]
    fn test_write_then_dump() {
        let mut rig = booted();
        rig.write("notes.txt", "hello");
        let out = rig
            .manager
            .query(&StorageQuery::DumpFile {
                path: "notes.txt".into(),
            })
            .unwrap();
        assert_eq!(out.data, b"hello");
        assert!(!out.truncated);
    }

    #[test]
    fn test_write_replaces_and_append_extends() {
        let mut rig = booted();
        rig.write("log", "first");
        rig.write("log", "ab");
        rig.manager
            .mutate(&StorageMutation::AppendFile {
                path: "log".into(),
                data: b"cd".to_vec(),
            })
            .unwrap();
        assert_eq!(rig.probe.file("log").unwrap(), b"abcd");
    }

    #[test]
    fn test_read_file_range() {
        let mut rig = booted();
        rig.write("data.bin", "0123456789");
        let out = rig
            .manager
            .query(&StorageQuery::ReadFile {
                path: "data.bin".into(),
                offset: 3,
                length: 4,
            })
            .unwrap();
        assert_eq!(out.data, b"3456");
    }

    #[test]
    fn test_dump_beyond_capacity_is_marked_truncated() {
        let config = StorageConfig {
            output_capacity: 8,
            ..StorageConfig::default()
        };
        let mut rig = rig_with(MemoryFs::formatted(), config);
        rig.manager.boot();
        rig.write("big.log", "0123456789abcdef");
        rig.write("small.log", "0123");
        rig.syslog.drain();

        let out = rig
            .manager
            .query(&StorageQuery::DumpFile {
                path: "big.log".into(),
            })
            .unwrap();
        assert_eq!(out.data, b"01234567");
        assert!(out.truncated);
        assert_eq!(out.into_complete(), Err(StorageError::TooLarge));
        assert!(rig.texts().iter().any(|t| t.contains("output truncated at 8 bytes")));

        // A long range over a short file is not a cut.
        let out = rig
            .manager
            .query(&StorageQuery::ReadFile {
                path: "small.log".into(),
                offset: 0,
                length: 64,
            })
            .unwrap();
        assert_eq!(out.into_complete().unwrap(), b"0123");
    }

    #[test]
    fn test_list_dir_renders_entries() {
        let mut rig = booted();
        rig.manager
            .mutate(&StorageMutation::MakeDir { path: "logs".into() })
            .unwrap();
        rig.write("wifi.cfg", "lab,pw");

        let out = rig
            .manager
            .query(&StorageQuery::ListDir { path: "/".into() })
            .unwrap();
        let text = out.as_text();
        assert!(text.starts_with(LISTING_HEADER));
        assert!(text.contains("logs/\r\n"));
        assert!(text.contains("wifi.cfg\r\n"));
        assert!(!text.contains(".\r\n"));
        assert!(!out.truncated);
    }

    #[test]
    fn test_list_dir_truncates_and_logs() {
        let config = StorageConfig {
            output_capacity: LISTING_HEADER.len() + 12,
            ..StorageConfig::default()
        };
        let mut rig = rig_with(MemoryFs::formatted(), config);
        rig.manager.boot();
        for name in ["alpha.txt", "bravo.txt", "charlie.txt"] {
            rig.write(name, "x");
        }
        rig.syslog.drain();

        let out = rig
            .manager
            .query(&StorageQuery::ListDir { path: "".into() })
            .unwrap();
        assert!(out.truncated);
        assert_eq!(out.data.len(), LISTING_HEADER.len() + 12);
        assert!(out.as_text().starts_with(LISTING_HEADER));
        assert!(rig.texts().iter().any(|t| t.contains("lsdir output truncated")));
    }

    #[test]
    fn test_list_missing_dir_is_not_found() {
        let mut rig = booted();
        assert_eq!(
            rig.manager
                .query(&StorageQuery::ListDir { path: "nope".into() }),
            Err(StorageError::NotFound)
        );
    }

    #[test]
    fn test_file_exists_negative_is_not_an_error() {
        let mut rig = booted();
        let missing = rig
            .manager
            .query(&StorageQuery::FileExists {
                path: "wifi.cfg".into(),
            })
            .unwrap();
        assert!(!missing.exists());

        rig.write("wifi.cfg", "lab,pw");
        let found = rig
            .manager
            .query(&StorageQuery::FileExists {
                path: "wifi.cfg".into(),
            })
            .unwrap();
        assert!(found.exists());
        assert_eq!(found.info.unwrap().size, 6);
    }

    #[test]
    fn test_file_stat_and_fs_stat_render() {
        let mut rig = booted();
        rig.write("boot.log", "12345");
        let out = rig.manager.query(&stat("boot.log")).unwrap();
        assert_eq!(out.as_text(), "boot.log: 5 bytes");

        let usage = rig.manager.query(&StorageQuery::FsStat).unwrap();
        let text = usage.as_text().into_owned();
        assert!(text.starts_with("Filesystem usage: "));
        assert!(usage.usage.unwrap().used_blocks > 0);
    }

    #[test]
    fn test_overlong_path_rejected() {
        let mut rig = booted();
        let long = "a".repeat(80);
        assert_eq!(
            rig.manager.query(&stat(&long)),
            Err(StorageError::NameTooLong)
        );
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    #[test]
    fn test_make_existing_file_fails_and_keeps_content() {
        let mut rig = booted();
        rig.write("keep.txt", "original");
        rig.tx
            .send(
                StorageRequest::Mutate(StorageMutation::MakeFile {
                    path: "keep.txt".into(),
                }),
                Duration::ZERO,
            )
            .unwrap();

        assert!(rig.manager.serve_once());

        assert_eq!(rig.probe.file("keep.txt").unwrap(), b"original");
        assert_eq!(
            rig.texts(),
            vec!["filesystem error: entry already exists".to_string()]
        );
    }

    #[test]
    fn test_remove_non_empty_dir_fails() {
        let mut rig = booted();
        rig.manager
            .mutate(&StorageMutation::MakeDir { path: "logs".into() })
            .unwrap();
        rig.write("logs/today", "x");
        assert_eq!(
            rig.manager
                .mutate(&StorageMutation::RemoveDir { path: "logs".into() }),
            Err(StorageError::DirectoryNotEmpty)
        );
        assert!(rig.probe.exists("logs/today"));
    }

    #[test]
    fn test_remove_kind_mismatch() {
        let mut rig = booted();
        rig.manager
            .mutate(&StorageMutation::MakeDir { path: "logs".into() })
            .unwrap();
        rig.write("f", "x");
        assert_eq!(
            rig.manager
                .mutate(&StorageMutation::RemoveFile { path: "logs".into() }),
            Err(StorageError::IsADirectory)
        );
        assert_eq!(
            rig.manager
                .mutate(&StorageMutation::RemoveDir { path: "f".into() }),
            Err(StorageError::NotADirectory)
        );
        rig.manager
            .mutate(&StorageMutation::RemoveFile { path: "f".into() })
            .unwrap();
        assert!(!rig.probe.exists("f"));
    }

    #[test]
    fn test_append_to_missing_file_fails() {
        let mut rig = booted();
        assert_eq!(
            rig.manager.mutate(&StorageMutation::AppendFile {
                path: "ghost".into(),
                data: b"x".to_vec(),
            }),
            Err(StorageError::NotFound)
        );
        assert!(!rig.probe.exists("ghost"));
    }

    #[test]
    fn test_unmount_then_not_mounted() {
        let mut rig = booted();
        rig.manager.mutate(&StorageMutation::Unmount).unwrap();
        assert_eq!(rig.manager.state(), MountState::Unmounted);
        assert_eq!(rig.texts(), vec![UNMOUNT_NOTICE.to_string()]);

        assert_eq!(rig.manager.query(&stat("x")), Err(StorageError::NotMounted));

        rig.tx
            .send(
                StorageRequest::Mutate(StorageMutation::MakeDir { path: "d".into() }),
                Duration::ZERO,
            )
            .unwrap();
        rig.manager.serve_once();
        assert_eq!(
            rig.texts(),
            vec!["filesystem error: filesystem not mounted".to_string()]
        );
    }

    #[test]
    fn test_format_refused_after_unmount() {
        let mut rig = booted();
        rig.write("keep.txt", "data");
        rig.manager.mutate(&StorageMutation::Unmount).unwrap();

        assert_eq!(
            rig.manager.query(&StorageQuery::Format),
            Err(StorageError::NotMounted)
        );
        assert_eq!(rig.manager.state(), MountState::Unmounted);
        assert_eq!(rig.probe.format_calls(), 0);
        assert_eq!(rig.manager.query(&stat("x")), Err(StorageError::NotMounted));
        assert_eq!(rig.probe.file("keep.txt").unwrap(), b"data");
    }

    // =========================================================================
    // Bus
    // =========================================================================

    #[test]
    fn test_query_reply_reaches_its_slot() {
        let mut rig = booted();
        rig.write("a", "1");

        let (reply, pending) = reply_pair(RequestToken::next());
        rig.tx
            .send(
                StorageRequest::Query {
                    query: stat("a"),
                    reply,
                },
                Duration::ZERO,
            )
            .unwrap();
        assert!(rig.manager.serve_once());
        assert!(!rig.manager.serve_once());

        let out = pending
            .await_result(Duration::from_millis(50))
            .unwrap()
            .unwrap();
        assert_eq!(out.as_text(), "a: 1 bytes");
    }

    #[test]
    fn test_failed_query_still_replies() {
        let mut rig = booted();
        let (reply, pending) = reply_pair(RequestToken::next());
        rig.tx
            .send(
                StorageRequest::Query {
                    query: StorageQuery::DumpFile {
                        path: "missing".into(),
                    },
                    reply,
                },
                Duration::ZERO,
            )
            .unwrap();
        rig.manager.serve_once();
        assert_eq!(
            pending.await_result(Duration::from_millis(50)).unwrap(),
            Err(StorageError::NotFound)
        );
    }

    #[test]
    fn test_abandoned_caller_does_not_block_manager() {
        let mut rig = booted();
        let (reply, pending) = reply_pair(RequestToken::next());
        rig.tx
            .send(
                StorageRequest::Query {
                    query: StorageQuery::FsStat,
                    reply,
                },
                Duration::ZERO,
            )
            .unwrap();
        assert_eq!(
            pending_timeout(pending),
            BusError::TimedOut,
            "nothing served yet"
        );
        assert!(rig.manager.serve_once());
        assert_eq!(rig.manager.state(), MountState::Mounted);
    }

    fn pending_timeout<T: std::fmt::Debug>(pending: embr_ipc::PendingReply<T>) -> BusError {
        pending.await_result(Duration::from_millis(5)).unwrap_err()
    }
}

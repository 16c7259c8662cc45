//! In-memory flash engine for testing.
//!
//! Behaves like the real engine where the Storage Manager can tell the
//! difference: a blank device fails to mount until formatted, directory
//! iteration yields `.` and `..` first, names and files have size limits,
//! and blocks run out. The flash contents live behind an `Arc` so a test
//! can inspect them through a [`MemoryFsProbe`] and attach a fresh engine
//! to the same "chip" to simulate a restart.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::core::error::{EngineError, EngineResult};
use crate::core::path::{file_name, normalize};
use crate::core::types::{EntryInfo, FsGeometry, OpenFlags};
use crate::engine::FlashFs;

/// Blocks taken by an empty filesystem (superblock pair).
const METADATA_BLOCKS: u32 = 2;

#[derive(Clone, Debug)]
enum Node {
    Dir,
    File(Vec<u8>),
}

/// Engine limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryFsLimits {
    /// Device layout
    pub geometry: FsGeometry,
    /// Longest single name component
    pub name_max: usize,
    /// Largest file in bytes
    pub file_max: u32,
}

impl Default for MemoryFsLimits {
    fn default() -> Self {
        Self {
            geometry: FsGeometry {
                block_size: 4096,
                block_count: 64,
            },
            name_max: 32,
            file_max: 4096,
        }
    }
}

#[derive(Debug, Default)]
struct Flash {
    formatted: bool,
    tree: BTreeMap<String, Node>,
    fail_mount: bool,
    fail_format: bool,
    op_delay: Duration,
    mount_calls: u32,
    format_calls: u32,
}

impl Flash {
    fn used_blocks(&self, block_size: u32) -> u32 {
        self.tree
            .iter()
            .map(|(path, node)| match node {
                Node::Dir if path.is_empty() => 0,
                Node::Dir => 1,
                Node::File(data) => blocks_for(data.len(), block_size),
            })
            .sum::<u32>()
            + METADATA_BLOCKS
    }
}

fn blocks_for(len: usize, block_size: u32) -> u32 {
    let block_size = block_size.max(1) as usize;
    u32::try_from(len.div_ceil(block_size).max(1)).unwrap_or(u32::MAX)
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

/// Open file handle.
#[derive(Debug)]
pub struct MemFile {
    path: String,
    flags: OpenFlags,
    pos: u32,
}

/// Open directory iterator.
#[derive(Debug)]
pub struct MemDir {
    entries: Vec<EntryInfo>,
    next: usize,
}

/// RAM-backed [`FlashFs`].
#[derive(Debug)]
pub struct MemoryFs {
    flash: Arc<Mutex<Flash>>,
    limits: MemoryFsLimits,
    mounted: bool,
}

impl MemoryFs {
    /// A blank (unformatted) device with default limits.
    pub fn new() -> Self {
        Self::with_limits(MemoryFsLimits::default())
    }

    /// A blank device with the given limits.
    pub fn with_limits(limits: MemoryFsLimits) -> Self {
        Self {
            flash: Arc::new(Mutex::new(Flash::default())),
            limits,
            mounted: false,
        }
    }

    /// A device that already holds an empty filesystem.
    pub fn formatted() -> Self {
        let fs = Self::new();
        {
            let mut flash = fs.flash();
            flash.formatted = true;
            flash.tree.insert(String::new(), Node::Dir);
        }
        fs
    }

    /// Probe for inspecting and steering this device from a test.
    pub fn probe(&self) -> MemoryFsProbe {
        MemoryFsProbe {
            flash: Arc::clone(&self.flash),
            limits: self.limits,
        }
    }

    fn flash(&self) -> MutexGuard<'_, Flash> {
        self.flash.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mounted_flash(&self) -> EngineResult<MutexGuard<'_, Flash>> {
        if !self.mounted {
            return Err(EngineError::INVAL);
        }
        let flash = self.flash();
        if !flash.op_delay.is_zero() {
            thread::sleep(flash.op_delay);
        }
        Ok(flash)
    }

    fn key(&self, path: &str) -> EngineResult<String> {
        let key = normalize(path).map_err(|_| EngineError::INVAL)?;
        if key.split('/').any(|part| part.len() > self.limits.name_max) {
            return Err(EngineError::NAMETOOLONG);
        }
        Ok(key)
    }

    /// Check that `key`'s parent exists and is a directory.
    fn check_parent(flash: &Flash, key: &str) -> EngineResult<()> {
        match flash.tree.get(parent_of(key)) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File(_)) => Err(EngineError::NOTDIR),
            None => Err(EngineError::NOENT),
        }
    }

    fn check_space(&self, flash: &Flash, extra_blocks: u32) -> EngineResult<()> {
        let used = flash.used_blocks(self.limits.geometry.block_size);
        if used + extra_blocks > self.limits.geometry.block_count {
            return Err(EngineError::NOSPC);
        }
        Ok(())
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashFs for MemoryFs {
    type File = MemFile;
    type Dir = MemDir;

    fn mount(&mut self) -> EngineResult<()> {
        let mut flash = self.flash();
        flash.mount_calls += 1;
        if flash.fail_mount {
            return Err(EngineError::IO);
        }
        if !flash.formatted {
            return Err(EngineError::CORRUPT);
        }
        drop(flash);
        self.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) -> EngineResult<()> {
        self.mounted = false;
        Ok(())
    }

    fn format(&mut self) -> EngineResult<()> {
        let mut flash = self.flash();
        flash.format_calls += 1;
        if flash.fail_format {
            return Err(EngineError::IO);
        }
        flash.tree.clear();
        flash.tree.insert(String::new(), Node::Dir);
        flash.formatted = true;
        drop(flash);
        self.mounted = false;
        Ok(())
    }

    fn fs_size(&mut self) -> EngineResult<u32> {
        let flash = self.mounted_flash()?;
        Ok(flash.used_blocks(self.limits.geometry.block_size))
    }

    fn geometry(&self) -> FsGeometry {
        self.limits.geometry
    }

    fn mkdir(&mut self, path: &str) -> EngineResult<()> {
        let key = self.key(path)?;
        let mut flash = self.mounted_flash()?;
        if flash.tree.contains_key(&key) {
            return Err(EngineError::EXIST);
        }
        Self::check_parent(&flash, &key)?;
        self.check_space(&flash, 1)?;
        flash.tree.insert(key, Node::Dir);
        Ok(())
    }

    fn remove(&mut self, path: &str) -> EngineResult<()> {
        let key = self.key(path)?;
        if key.is_empty() {
            return Err(EngineError::INVAL);
        }
        let mut flash = self.mounted_flash()?;
        match flash.tree.get(&key) {
            None => return Err(EngineError::NOENT),
            Some(Node::Dir) => {
                let prefix = format!("{}/", key);
                if flash.tree.keys().any(|k| k.starts_with(&prefix)) {
                    return Err(EngineError::NOTEMPTY);
                }
            }
            Some(Node::File(_)) => {}
        }
        flash.tree.remove(&key);
        Ok(())
    }

    fn stat(&mut self, path: &str) -> EngineResult<EntryInfo> {
        let key = self.key(path)?;
        let flash = self.mounted_flash()?;
        match flash.tree.get(&key) {
            None => Err(EngineError::NOENT),
            Some(Node::Dir) if key.is_empty() => Ok(EntryInfo::dir("/")),
            Some(Node::Dir) => Ok(EntryInfo::dir(file_name(&key))),
            Some(Node::File(data)) => Ok(EntryInfo::file(
                file_name(&key),
                u32::try_from(data.len()).unwrap_or(u32::MAX),
            )),
        }
    }

    fn dir_open(&mut self, path: &str) -> EngineResult<MemDir> {
        let key = self.key(path)?;
        let flash = self.mounted_flash()?;
        match flash.tree.get(&key) {
            None => return Err(EngineError::NOENT),
            Some(Node::File(_)) => return Err(EngineError::NOTDIR),
            Some(Node::Dir) => {}
        }
        let mut entries = vec![EntryInfo::dir("."), EntryInfo::dir("..")];
        entries.extend(
            flash
                .tree
                .iter()
                .filter(|(k, _)| !k.is_empty() && parent_of(k) == key)
                .map(|(k, node)| match node {
                    Node::Dir => EntryInfo::dir(file_name(k)),
                    Node::File(data) => EntryInfo::file(
                        file_name(k),
                        u32::try_from(data.len()).unwrap_or(u32::MAX),
                    ),
                }),
        );
        Ok(MemDir { entries, next: 0 })
    }

    fn dir_read(&mut self, dir: &mut MemDir) -> EngineResult<Option<EntryInfo>> {
        let entry = dir.entries.get(dir.next).cloned();
        if entry.is_some() {
            dir.next += 1;
        }
        Ok(entry)
    }

    fn dir_close(&mut self, _dir: MemDir) -> EngineResult<()> {
        Ok(())
    }

    fn file_open(&mut self, path: &str, flags: OpenFlags) -> EngineResult<MemFile> {
        let key = self.key(path)?;
        if key.is_empty() {
            return Err(EngineError::ISDIR);
        }
        let mut flash = self.mounted_flash()?;
        match flash.tree.get(&key) {
            Some(Node::Dir) => return Err(EngineError::ISDIR),
            Some(Node::File(_)) => {
                if flags.contains(OpenFlags::CREAT | OpenFlags::EXCL) {
                    return Err(EngineError::EXIST);
                }
            }
            None => {
                if !flags.contains(OpenFlags::CREAT) {
                    return Err(EngineError::NOENT);
                }
                Self::check_parent(&flash, &key)?;
                self.check_space(&flash, 1)?;
                flash.tree.insert(key.clone(), Node::File(Vec::new()));
            }
        }
        if flags.contains(OpenFlags::TRUNC) {
            if let Some(Node::File(data)) = flash.tree.get_mut(&key) {
                data.clear();
            }
        }
        Ok(MemFile {
            path: key,
            flags,
            pos: 0,
        })
    }

    fn file_seek(&mut self, file: &mut MemFile, offset: u32) -> EngineResult<u32> {
        file.pos = offset;
        Ok(offset)
    }

    fn file_read(&mut self, file: &mut MemFile, buf: &mut [u8]) -> EngineResult<usize> {
        if !file.flags.readable() {
            return Err(EngineError::BADF);
        }
        let flash = self.mounted_flash()?;
        let data = match flash.tree.get(&file.path) {
            Some(Node::File(data)) => data,
            _ => return Err(EngineError::BADF),
        };
        let start = (file.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        file.pos += u32::try_from(n).unwrap_or(u32::MAX);
        Ok(n)
    }

    fn file_write(&mut self, file: &mut MemFile, bytes: &[u8]) -> EngineResult<usize> {
        if !file.flags.writable() {
            return Err(EngineError::BADF);
        }
        let block_size = self.limits.geometry.block_size;
        let file_max = self.limits.file_max as usize;
        let mut flash = self.mounted_flash()?;
        let current = match flash.tree.get(&file.path) {
            Some(Node::File(data)) => data.len(),
            _ => return Err(EngineError::BADF),
        };
        let start = if file.flags.contains(OpenFlags::APPEND) {
            current
        } else {
            file.pos as usize
        };
        let end = start + bytes.len();
        if end > file_max {
            return Err(EngineError::FBIG);
        }
        let grow = blocks_for(end.max(current), block_size).saturating_sub(blocks_for(current, block_size));
        self.check_space(&flash, grow)?;

        if let Some(Node::File(data)) = flash.tree.get_mut(&file.path) {
            if data.len() < end {
                data.resize(end, 0);
            }
            data[start..end].copy_from_slice(bytes);
        }
        file.pos = u32::try_from(end).unwrap_or(u32::MAX);
        Ok(bytes.len())
    }

    fn file_size(&mut self, file: &MemFile) -> EngineResult<u32> {
        let flash = self.mounted_flash()?;
        match flash.tree.get(&file.path) {
            Some(Node::File(data)) => Ok(u32::try_from(data.len()).unwrap_or(u32::MAX)),
            _ => Err(EngineError::BADF),
        }
    }

    fn file_close(&mut self, _file: MemFile) -> EngineResult<()> {
        Ok(())
    }
}

/// Test-side view of a [`MemoryFs`] device.
#[derive(Clone, Debug)]
pub struct MemoryFsProbe {
    flash: Arc<Mutex<Flash>>,
    limits: MemoryFsLimits,
}

impl MemoryFsProbe {
    fn flash(&self) -> MutexGuard<'_, Flash> {
        self.flash.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A fresh, unmounted engine over the same device.
    pub fn attach(&self) -> MemoryFs {
        MemoryFs {
            flash: Arc::clone(&self.flash),
            limits: self.limits,
            mounted: false,
        }
    }

    /// Contents of a file, if it exists.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        let key = normalize(path).ok()?;
        match self.flash().tree.get(&key) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// True if the entry exists.
    pub fn exists(&self, path: &str) -> bool {
        normalize(path)
            .map(|key| self.flash().tree.contains_key(&key))
            .unwrap_or(false)
    }

    /// Place a file directly on the device, creating parent directories.
    pub fn seed_file(&self, path: &str, data: &[u8]) {
        let Ok(key) = normalize(path) else { return };
        let mut flash = self.flash();
        let parts: Vec<&str> = key.split('/').collect();
        let mut parent = String::new();
        for part in &parts[..parts.len().saturating_sub(1)] {
            if !parent.is_empty() {
                parent.push('/');
            }
            parent.push_str(part);
            flash.tree.entry(parent.clone()).or_insert(Node::Dir);
        }
        flash.tree.insert(key, Node::File(data.to_vec()));
    }

    /// True once the device holds a filesystem.
    pub fn is_formatted(&self) -> bool {
        self.flash().formatted
    }

    /// Make every mount attempt fail with an I/O error.
    pub fn fail_mount(&self, fail: bool) {
        self.flash().fail_mount = fail;
    }

    /// Make every format attempt fail with an I/O error.
    pub fn fail_format(&self, fail: bool) {
        self.flash().fail_format = fail;
    }

    /// Slow down every namespace and file operation.
    pub fn set_op_delay(&self, delay: Duration) {
        self.flash().op_delay = delay;
    }

    /// Number of mount attempts so far.
    pub fn mount_calls(&self) -> u32 {
        self.flash().mount_calls
    }

    /// Number of format attempts so far.
    pub fn format_calls(&self) -> u32 {
        self.flash().format_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mounted() -> MemoryFs {
        let mut fs = MemoryFs::formatted();
        fs.mount().unwrap();
        fs
    }

    #[test]
    fn test_blank_device_needs_format() {
        let mut fs = MemoryFs::new();
        assert_eq!(fs.mount(), Err(EngineError::CORRUPT));
        fs.format().unwrap();
        assert!(fs.mount().is_ok());
    }

    #[test]
    fn test_exclusive_create_on_existing() {
        let mut fs = mounted();
        let f = fs
            .file_open("a.txt", OpenFlags::WRONLY | OpenFlags::CREAT)
            .unwrap();
        fs.file_close(f).unwrap();
        let err = fs
            .file_open("a.txt", OpenFlags::WRONLY | OpenFlags::CREAT | OpenFlags::EXCL)
            .unwrap_err();
        assert_eq!(err, EngineError::EXIST);
    }

    #[test]
    fn test_remove_non_empty_dir() {
        let mut fs = mounted();
        fs.mkdir("logs").unwrap();
        let f = fs
            .file_open("logs/boot", OpenFlags::WRONLY | OpenFlags::CREAT)
            .unwrap();
        fs.file_close(f).unwrap();
        assert_eq!(fs.remove("logs"), Err(EngineError::NOTEMPTY));
        fs.remove("logs/boot").unwrap();
        fs.remove("logs").unwrap();
    }

    #[test]
    fn test_dir_iteration_starts_with_dot_entries() {
        let mut fs = mounted();
        fs.mkdir("sub").unwrap();
        let mut dir = fs.dir_open("/").unwrap();
        let mut names = Vec::new();
        while let Some(entry) = fs.dir_read(&mut dir).unwrap() {
            names.push(entry.name);
        }
        fs.dir_close(dir).unwrap();
        assert_eq!(names, vec![".", "..", "sub"]);
    }

    #[test]
    fn test_append_and_seek_read() {
        let mut fs = mounted();
        let mut f = fs
            .file_open("log", OpenFlags::WRONLY | OpenFlags::CREAT)
            .unwrap();
        fs.file_write(&mut f, b"abc").unwrap();
        fs.file_close(f).unwrap();

        let mut f = fs
            .file_open("log", OpenFlags::WRONLY | OpenFlags::APPEND)
            .unwrap();
        fs.file_write(&mut f, b"def").unwrap();
        fs.file_close(f).unwrap();

        let mut f = fs.file_open("log", OpenFlags::RDONLY).unwrap();
        fs.file_seek(&mut f, 2).unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(fs.file_read(&mut f, &mut buf).unwrap(), 3);
        assert_eq!(&buf, b"cde");
    }

    #[test]
    fn test_limits() {
        let mut fs = mounted();
        assert_eq!(fs.mkdir(&"n".repeat(40)), Err(EngineError::NAMETOOLONG));
        let mut f = fs
            .file_open("big", OpenFlags::WRONLY | OpenFlags::CREAT)
            .unwrap();
        assert_eq!(
            fs.file_write(&mut f, &vec![0u8; 5000]),
            Err(EngineError::FBIG)
        );
    }

    #[test]
    fn test_probe_survives_restart() {
        let mut fs = mounted();
        let mut f = fs
            .file_open("keep", OpenFlags::WRONLY | OpenFlags::CREAT)
            .unwrap();
        fs.file_write(&mut f, b"1").unwrap();
        fs.file_close(f).unwrap();

        let probe = fs.probe();
        drop(fs);
        let mut again = probe.attach();
        again.mount().unwrap();
        assert_eq!(probe.file("/keep"), Some(b"1".to_vec()));
        assert_eq!(probe.mount_calls(), 2);
    }
}

//! Request execution against the flash engine.
//!
//! Every function here runs on the Storage Manager task with the engine
//! already mounted. File and directory handles are always closed before
//! returning, also on the error path; the first error wins.

use std::fmt::Write as _;

use embr_vfs::{
    validate_path, EngineError, EntryInfo, FlashFs, FsUsage, OpenFlags, StorageError,
    StorageMutation, StorageOutput, StorageQuery, StorageResult, TextBuffer,
};
use log::warn;

/// Header of a rendered directory listing.
pub const LISTING_HEADER: &str = "File List\r\n---------\r\n";

/// Reply text of a successful format.
pub const FORMAT_COMPLETE: &str = "formatting complete";

/// Output limits applied while executing.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Limits {
    pub output_capacity: usize,
    pub path_max: usize,
}

// =============================================================================
// Handle helpers
// =============================================================================

fn with_file<F, T>(
    fs: &mut F,
    path: &str,
    flags: OpenFlags,
    op: impl FnOnce(&mut F, &mut F::File) -> Result<T, EngineError>,
) -> Result<T, EngineError>
where
    F: FlashFs,
{
    let mut file = fs.file_open(path, flags)?;
    let result = op(fs, &mut file);
    let closed = fs.file_close(file);
    let value = result?;
    closed?;
    Ok(value)
}

fn with_dir<F, T>(
    fs: &mut F,
    path: &str,
    op: impl FnOnce(&mut F, &mut F::Dir) -> Result<T, EngineError>,
) -> Result<T, EngineError>
where
    F: FlashFs,
{
    let mut dir = fs.dir_open(path)?;
    let result = op(fs, &mut dir);
    let closed = fs.dir_close(dir);
    let value = result?;
    closed?;
    Ok(value)
}

fn read_up_to<F: FlashFs>(fs: &mut F, file: &mut F::File, limit: usize) -> Result<Vec<u8>, EngineError> {
    let mut data = vec![0u8; limit];
    let mut filled = 0;
    while filled < limit {
        let n = fs.file_read(file, &mut data[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    data.truncate(filled);
    Ok(data)
}

fn write_all<F: FlashFs>(fs: &mut F, file: &mut F::File, mut data: &[u8]) -> Result<(), EngineError> {
    while !data.is_empty() {
        let n = fs.file_write(file, data)?;
        if n == 0 {
            return Err(EngineError::NOSPC);
        }
        data = &data[n.min(data.len())..];
    }
    Ok(())
}

// =============================================================================
// Queries
// =============================================================================

/// Execute a query. `Format` is handled by the manager, not here.
pub(crate) fn execute_query<F: FlashFs>(fs: &mut F, limits: Limits, query: &StorageQuery) -> StorageResult {
    if let Some(path) = query.path() {
        validate_path(path, limits.path_max)?;
    }
    match query {
        StorageQuery::ListDir { path } => list_dir(fs, limits, path),
        StorageQuery::DumpFile { path } => dump_file(fs, limits, path),
        StorageQuery::ReadFile {
            path,
            offset,
            length,
        } => read_file(fs, limits, path, *offset, *length),
        StorageQuery::FileStat { path } => file_stat(fs, path),
        StorageQuery::FileExists { path } => file_exists(fs, path),
        StorageQuery::FsStat => fs_stat(fs),
        StorageQuery::Format => format(fs),
    }
}

fn list_dir<F: FlashFs>(fs: &mut F, limits: Limits, path: &str) -> StorageResult {
    let mut text = TextBuffer::with_capacity(limits.output_capacity);
    text.push_str(LISTING_HEADER);
    with_dir(fs, path, |fs, dir| {
        while let Some(entry) = fs.dir_read(dir)? {
            if entry.name == "." || entry.name == ".." {
                continue;
            }
            let suffix = if entry.is_dir() { "/" } else { "" };
            if write!(text, "{}{}\r\n", entry.name, suffix).is_err() {
                break;
            }
        }
        Ok(())
    })?;
    let (rendered, truncated) = text.finish();
    Ok(StorageOutput {
        truncated,
        ..StorageOutput::text(rendered)
    })
}

fn dump_file<F: FlashFs>(fs: &mut F, limits: Limits, path: &str) -> StorageResult {
    let (data, size) = with_file(fs, path, OpenFlags::RDONLY, |fs, file| {
        let size = fs.file_size(file)?;
        let data = read_up_to(fs, file, limits.output_capacity)?;
        Ok((data, size))
    })?;
    let truncated = (data.len() as u64) < u64::from(size);
    Ok(StorageOutput {
        truncated,
        ..StorageOutput::bytes(data)
    })
}

fn read_file<F: FlashFs>(fs: &mut F, limits: Limits, path: &str, offset: u32, length: u32) -> StorageResult {
    let limit = (length as usize).min(limits.output_capacity);
    let data = with_file(fs, path, OpenFlags::RDONLY, |fs, file| {
        fs.file_seek(file, offset)?;
        read_up_to(fs, file, limit)
    })?;
    let truncated = limit < length as usize && data.len() == limit;
    Ok(StorageOutput {
        truncated,
        ..StorageOutput::bytes(data)
    })
}

fn file_stat<F: FlashFs>(fs: &mut F, path: &str) -> StorageResult {
    let info = fs.stat(path)?;
    Ok(StorageOutput {
        info: Some(info.clone()),
        ..StorageOutput::text(render_stat(&info))
    })
}

fn file_exists<F: FlashFs>(fs: &mut F, path: &str) -> StorageResult {
    match fs.stat(path) {
        Ok(info) => Ok(StorageOutput {
            info: Some(info),
            ..StorageOutput::default()
        }),
        Err(EngineError::NOENT) => Ok(StorageOutput::default()),
        Err(err) => Err(err.into()),
    }
}

fn fs_stat<F: FlashFs>(fs: &mut F) -> StorageResult {
    let usage = FsUsage {
        used_blocks: fs.fs_size()?,
        geometry: fs.geometry(),
    };
    Ok(StorageOutput {
        usage: Some(usage),
        ..StorageOutput::text(usage.to_string())
    })
}

fn format<F: FlashFs>(fs: &mut F) -> StorageResult {
    // The engine may or may not be mounted; format wants it released.
    if let Err(err) = fs.unmount() {
        warn!("unmount before format failed: {}", StorageError::from(err));
    }
    fs.format()?;
    fs.mount()?;
    Ok(StorageOutput::text(FORMAT_COMPLETE))
}

/// `"name: N bytes"`
pub(crate) fn render_stat(info: &EntryInfo) -> String {
    format!("{}: {} bytes", info.name, info.size)
}

// =============================================================================
// Mutations
// =============================================================================

/// Execute a mutation. `Unmount` is handled by the manager, not here.
pub(crate) fn execute_mutation<F: FlashFs>(
    fs: &mut F,
    limits: Limits,
    mutation: &StorageMutation,
) -> Result<(), StorageError> {
    if let Some(path) = mutation.path() {
        validate_path(path, limits.path_max)?;
    }
    match mutation {
        StorageMutation::MakeDir { path } => fs.mkdir(path)?,
        StorageMutation::RemoveDir { path } => {
            if !fs.stat(path)?.is_dir() {
                return Err(StorageError::NotADirectory);
            }
            fs.remove(path)?;
        }
        StorageMutation::MakeFile { path } => {
            let flags = OpenFlags::WRONLY | OpenFlags::CREAT | OpenFlags::EXCL;
            with_file(fs, path, flags, |_, _| Ok(()))?;
        }
        StorageMutation::RemoveFile { path } => {
            if fs.stat(path)?.is_dir() {
                return Err(StorageError::IsADirectory);
            }
            fs.remove(path)?;
        }
        StorageMutation::WriteFile { path, data } => {
            let flags = OpenFlags::WRONLY | OpenFlags::CREAT | OpenFlags::TRUNC;
            with_file(fs, path, flags, |fs, file| write_all(fs, file, data))?;
        }
        StorageMutation::AppendFile { path, data } => {
            let flags = OpenFlags::WRONLY | OpenFlags::APPEND;
            with_file(fs, path, flags, |fs, file| write_all(fs, file, data))?;
        }
        StorageMutation::Unmount => fs.unmount()?,
    }
    Ok(())
}

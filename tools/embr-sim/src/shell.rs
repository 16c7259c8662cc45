//! Shell command interpreter.
//!
//! One line in, one rendered reply out. Storage queries block for their
//! result; mutations and network actions return as soon as they are queued
//! and report through the system log.

use std::thread;
use std::time::Duration;

use embr_init::ControlError;
use embr_ipc::BusError;
use embr_services::{Hosted, System};
use embr_vfs::StorageError;
use thiserror::Error;

/// Errors from a shell command.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Control(#[from] ControlError),
    #[error("network request failed: {0}")]
    Bus(#[from] BusError),
}

pub const HELP: &str = "\
ls [dir]              list a directory
cat <file>            print a file
read <file> <off> <n> print n bytes from off
write <file> <text>   create or replace a file
append <file> <text>  append to a file
touch <file>          create an empty file
rm <file>             remove a file
mkdir <dir>           create a directory
rmdir <dir>           remove an empty directory
stat <path>           size of an entry
df                    filesystem usage
format                erase and remount the filesystem
umount                release the filesystem
fs status             storage manager state
net join|leave|status network control
service list          registered services
service start|suspend|resume <name>
kill <name>           terminate a task
sleep <ms>            wait
help                  this text";

fn queued() -> Result<String, ShellError> {
    Ok("queued".to_string())
}

/// Run one command line.
pub fn execute(system: &System<Hosted>, line: &str) -> Result<String, ShellError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let storage = system.storage();

    match words.as_slice() {
        [] => Ok(String::new()),
        ["help"] => Ok(HELP.to_string()),

        ["ls"] => Ok(storage.list_dir("/")?.as_text().into_owned()),
        ["ls", dir] => Ok(storage.list_dir(dir)?.as_text().into_owned()),
        ["cat", file] => Ok(String::from_utf8_lossy(&storage.dump_file(file)?).into_owned()),
        ["read", file, offset, length] => {
            let offset = offset.parse().map_err(|_| ShellError::Usage("read <file> <off> <n>"))?;
            let length = length.parse().map_err(|_| ShellError::Usage("read <file> <off> <n>"))?;
            let data = storage.read_file(file, offset, length)?;
            Ok(String::from_utf8_lossy(&data).into_owned())
        }
        ["stat", path] => {
            let info = storage.file_stat(path)?;
            Ok(format!("{}: {} bytes", info.name, info.size))
        }
        ["df"] => Ok(storage.fs_stat()?.to_string()),
        ["format"] => Ok(storage.format()?),

        ["write", file, text @ ..] if !text.is_empty() => {
            storage.write_file(file, text.join(" "))?;
            queued()
        }
        ["append", file, text @ ..] if !text.is_empty() => {
            storage.append_file(file, text.join(" "))?;
            queued()
        }
        ["touch", file] => {
            storage.make_file(file)?;
            queued()
        }
        ["rm", file] => {
            storage.remove_file(file)?;
            queued()
        }
        ["mkdir", dir] => {
            storage.make_dir(dir)?;
            queued()
        }
        ["rmdir", dir] => {
            storage.remove_dir(dir)?;
            queued()
        }
        ["umount"] => {
            storage.unmount()?;
            queued()
        }
        ["fs", "status"] => Ok(system.storage_status()),

        ["net", "join"] => {
            system.join()?;
            Ok("join requested".to_string())
        }
        ["net", "leave"] => {
            system.leave()?;
            Ok("leave requested".to_string())
        }
        ["net", "status"] => Ok(system.network_status_text()),

        ["service", "list"] => Ok(system.list_services()),
        ["service", "start", name] => {
            system.start_service(name)?;
            Ok(format!("{} service started", name))
        }
        ["service", "suspend", name] => Ok(system.suspend(name)?),
        ["service", "resume", name] => Ok(system.resume(name)?),
        ["kill", name] => {
            system.kill(name)?;
            Ok(format!("{} killed", name))
        }

        ["sleep", ms] => {
            let ms = ms.parse().map_err(|_| ShellError::Usage("sleep <ms>"))?;
            thread::sleep(Duration::from_millis(ms));
            Ok(String::new())
        }

        ["write" | "append", ..] => Err(ShellError::Usage("write|append <file> <text>")),
        [other, ..] => Err(ShellError::Unknown((*other).to_string())),
    }
}

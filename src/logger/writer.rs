//! Access log writer
//!
//! Access lines go to stdout unless an append-only file is configured.
//! Diagnostics never pass through here; they are `tracing` events.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};

static ACCESS_WRITER: OnceLock<AccessWriter> = OnceLock::new();

enum Target {
    Stdout,
    File(Mutex<File>),
}

pub struct AccessWriter {
    target: Target,
}

impl AccessWriter {
    pub fn open(path: Option<&Path>) -> io::Result<Self> {
        let target = match path {
            Some(path) => Target::File(Mutex::new(open_append(path)?)),
            None => Target::Stdout,
        };
        Ok(Self { target })
    }

    pub fn write(&self, line: &str) {
        match &self.target {
            Target::Stdout => println!("{line}"),
            Target::File(file) => {
                let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
                if let Err(e) = writeln!(file, "{line}") {
                    tracing::warn!(error = %e, "failed to write access log");
                }
            }
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the process-wide access writer. Only the first call takes effect.
pub fn init(path: Option<&Path>) -> io::Result<()> {
    let writer = AccessWriter::open(path)?;
    if ACCESS_WRITER.set(writer).is_err() {
        tracing::debug!("access log writer already initialized");
    }
    Ok(())
}

/// Write one access line, falling back to stdout before [`init`].
pub fn write_access(line: &str) {
    match ACCESS_WRITER.get() {
        Some(writer) => writer.write(line),
        None => println!("{line}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_target_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("access.log");
        let writer = AccessWriter::open(Some(&path)).unwrap();
        writer.write("first");
        writer.write("second");

        let reopened = AccessWriter::open(Some(&path)).unwrap();
        reopened.write("third");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\nthird\n");
    }
}

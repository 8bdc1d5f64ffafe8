#![forbid(unsafe_code)]

use std::{
    fs::File,
    io::{self, ErrorKind},
    path::Path,
};

use tracing::trace;

use crate::types::{Result, StoreError};

/// Positioned file I/O used by the pager.
pub trait FileIo: Send + Sync + 'static {
    /// Fills `dst` with the bytes stored at `off`; a short read is an error.
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<()>;
    /// Writes all of `src` at `off`.
    fn write_at(&self, off: u64, src: &[u8]) -> Result<()>;
    /// Returns the current length of the file in bytes.
    fn len(&self) -> Result<u64>;
    /// Returns true if the file is empty.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Repeats a positioned read until `dst` is full.
fn fill_at<F>(mut off: u64, mut dst: &mut [u8], mut read: F) -> io::Result<()>
where
    F: FnMut(&mut [u8], u64) -> io::Result<usize>,
{
    while !dst.is_empty() {
        match read(dst, off)? {
            0 => return Err(io::Error::new(ErrorKind::UnexpectedEof, "short page read")),
            n => {
                dst = &mut dst[n..];
                off += n as u64;
            }
        }
    }
    Ok(())
}

/// Repeats a positioned write until all of `src` is on disk.
fn drain_at<F>(mut off: u64, mut src: &[u8], mut write: F) -> io::Result<()>
where
    F: FnMut(&[u8], u64) -> io::Result<usize>,
{
    while !src.is_empty() {
        match write(src, off)? {
            0 => return Err(io::Error::new(ErrorKind::WriteZero, "short page write")),
            n => {
                src = &src[n..];
                off += n as u64;
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn read_exact(file: &File, off: u64, dst: &mut [u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    fill_at(off, dst, |buf, at| file.read_at(buf, at))
}

#[cfg(unix)]
fn write_all(file: &File, off: u64, src: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    drain_at(off, src, |buf, at| file.write_at(buf, at))
}

#[cfg(windows)]
fn read_exact(file: &File, off: u64, dst: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    fill_at(off, dst, |buf, at| file.seek_read(buf, at))
}

#[cfg(windows)]
fn write_all(file: &File, off: u64, src: &[u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    drain_at(off, src, |buf, at| file.seek_write(buf, at))
}

#[cfg(not(any(unix, windows)))]
fn read_exact(_file: &File, _off: u64, _dst: &mut [u8]) -> io::Result<()> {
    Err(io::Error::new(ErrorKind::Unsupported, "positioned reads unsupported"))
}

#[cfg(not(any(unix, windows)))]
fn write_all(_file: &File, _off: u64, _src: &[u8]) -> io::Result<()> {
    Err(io::Error::new(ErrorKind::Unsupported, "positioned writes unsupported"))
}

/// [`FileIo`] backed by a `std::fs::File`.
pub struct StdFileIo {
    file: File,
}

impl StdFileIo {
    /// Wraps an already opened file.
    pub fn new(file: File) -> Self {
        Self { file }
    }

    /// Opens `path` for read/write, creating it if missing. Existing contents are kept.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(file))
    }
}

impl FileIo for StdFileIo {
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<()> {
        trace!(off, len = dst.len(), "io.read_at");
        read_exact(&self.file, off, dst).map_err(StoreError::from)
    }

    fn write_at(&self, off: u64, src: &[u8]) -> Result<()> {
        trace!(off, len = src.len(), "io.write_at");
        write_all(&self.file, off, src).map_err(StoreError::from)
    }

    fn len(&self) -> Result<u64> {
        let meta = self.file.metadata().map_err(StoreError::from)?;
        Ok(meta.len())
    }
}

impl std::fmt::Debug for StdFileIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdFileIo").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_read_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("io.bin");
        let io = StdFileIo::open(&path).unwrap();

        let payload = b"hello pages";
        io.write_at(0, payload).unwrap();

        let mut buf = vec![0u8; payload.len()];
        io.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, payload);
        assert_eq!(io.len().unwrap(), payload.len() as u64);
    }

    #[test]
    fn read_past_eof_returns_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("io.bin");
        let io = StdFileIo::open(&path).unwrap();
        assert!(io.is_empty().unwrap());
        let mut buf = [0u8; 8];
        let err = io.read_at(0, &mut buf).unwrap_err();
        match err {
            StoreError::Io(inner) => assert_eq!(inner.kind(), ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn partial_transfers_are_resumed() {
        let source: Vec<u8> = (0..10).collect();
        let mut dst = [0u8; 10];
        let mut calls = Vec::new();
        fill_at(100, &mut dst, |buf, at| {
            calls.push(at);
            let n = buf.len().min(3);
            let start = (at - 100) as usize;
            buf[..n].copy_from_slice(&source[start..start + n]);
            Ok(n)
        })
        .unwrap();
        assert_eq!(dst.to_vec(), source);
        assert_eq!(calls, vec![100, 103, 106, 109]);

        let mut written = Vec::new();
        drain_at(0, &source, |buf, _| {
            written.push(buf[0]);
            Ok(1)
        })
        .unwrap();
        assert_eq!(written, source);

        let err = drain_at(0, &source, |_, _| Ok(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);
    }

    #[test]
    fn open_keeps_existing_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keep.bin");
        {
            let io = StdFileIo::open(&path).unwrap();
            io.write_at(4096, &[7u8; 16]).unwrap();
        }
        let reopen = StdFileIo::open(&path).unwrap();
        assert_eq!(reopen.len().unwrap(), 4096 + 16);
        let mut buf = [0u8; 16];
        reopen.read_at(4096, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 7));
    }

    #[test]
    fn open_missing_directory_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("db.bin");
        match StdFileIo::open(&path) {
            Err(StoreError::Open { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

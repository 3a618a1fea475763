//! Storage access for content files

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Byte source a codec pulls from
///
/// Any codec written against these three operations can decode from any
/// storage the pipeline supports.
pub trait CodecIo {
    /// Reads up to `buf.len()` bytes, returning how many were read
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Advances past `count` bytes without returning them
    fn skip(&mut self, count: u64) -> io::Result<()>;

    /// True once no bytes remain
    fn at_end(&mut self) -> bool;
}

/// An open content file
#[derive(Debug)]
pub struct ContentStream {
    path: PathBuf,
    file: File,
    size: u64,
}

impl ContentStream {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self { path, file, size })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file when it was opened
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Read for ContentStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for ContentStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl CodecIo for ContentStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(&mut self.file, buf)
    }

    fn skip(&mut self, count: u64) -> io::Result<()> {
        let offset = i64::try_from(count)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "skip too large"))?;
        self.file.seek(SeekFrom::Current(offset))?;
        Ok(())
    }

    fn at_end(&mut self) -> bool {
        self.file
            .stream_position()
            .map(|pos| pos >= self.size)
            .unwrap_or(true)
    }
}

impl<T: AsRef<[u8]>> CodecIo for io::Cursor<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn skip(&mut self, count: u64) -> io::Result<()> {
        let len = self.get_ref().as_ref().len() as u64;
        self.set_position(self.position().saturating_add(count).min(len));
        Ok(())
    }

    fn at_end(&mut self) -> bool {
        self.position() >= self.get_ref().as_ref().len() as u64
    }
}

/// [`Read`] over a [`CodecIo`], for codecs that want a standard reader
pub struct CodecReader<'a> {
    io: &'a mut dyn CodecIo,
}

impl<'a> CodecReader<'a> {
    pub fn new(io: &'a mut dyn CodecIo) -> Self {
        Self { io }
    }
}

impl Read for CodecReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.io.at_end() {
            return Ok(0);
        }
        self.io.read(buf)
    }
}

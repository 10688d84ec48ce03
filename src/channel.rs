use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::core::{Channel, Metadata, Stat};
use crate::mode::AccessMode;

/// Largest single read handed to the OS, below what Linux `read(2)` returns in one call.
const MAX_READ: usize = 1 << 30;

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "channel is closed")
}

/// A channel over an OS file handle.
pub struct FileChannel {
    file: Option<fs::File>,
    mode: String,
    uri: String,
    seekable: bool,
    eof_reached: bool,
}

impl FileChannel {
    /// Wrap `file`, reporting `mode` as its access mode.
    pub fn new(file: fs::File, mode: AccessMode, uri: impl Into<String>) -> Self {
        Self::with_raw_mode(file, mode.as_str(), uri)
    }

    pub(crate) fn with_raw_mode(file: fs::File, mode: &str, uri: impl Into<String>) -> Self {
        let seekable = (&file).stream_position().is_ok();
        Self {
            file: Some(file),
            mode: mode.to_owned(),
            uri: uri.into(),
            seekable,
            eof_reached: false,
        }
    }

    /// Open `path` with an already classified mode.
    pub fn open(path: &Path, mode: AccessMode) -> io::Result<Self> {
        let file = mode.open_options().open(path)?;
        debug!(path = %path.display(), mode = %mode, "opened file channel");
        Ok(Self::new(file, mode, path.display().to_string()))
    }

    /// Wrap an already open file, inferring its mode from the descriptor's access flags.
    #[cfg(unix)]
    pub fn from_file(file: fs::File) -> io::Result<Self> {
        use std::os::fd::AsRawFd;

        // SAFETY: the descriptor is owned by `file` and stays open for the duration of the call.
        let flags = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_GETFL) };
        if flags == -1 {
            return Err(io::Error::last_os_error());
        }

        let append = flags & libc::O_APPEND != 0;
        let mode = match (flags & libc::O_ACCMODE, append) {
            (libc::O_RDONLY, _) => "r",
            (libc::O_WRONLY, false) => "w",
            (libc::O_WRONLY, true) => "a",
            (_, false) => "r+",
            (_, true) => "a+",
        };

        let uri = format!("fd://{}", file.as_raw_fd());
        Ok(Self::with_raw_mode(file, mode, uri))
    }

    fn file(&mut self) -> io::Result<&mut fs::File> {
        self.file.as_mut().ok_or_else(closed_error)
    }
}

impl Channel for FileChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let seekable = self.seekable;
        let len = buf.len().min(MAX_READ);
        let buf = &mut buf[..len];
        let n = self.file()?.read(buf)?;
        // A short read on a plain file means the end was reached.
        if n == 0 || (seekable && n < buf.len()) {
            self.eof_reached = true;
        }
        trace!(requested = buf.len(), read = n, "file channel read");
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file()?.write_all(data)?;
        Ok(data.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let offset = self.file()?.seek(pos)?;
        self.eof_reached = false;
        Ok(offset)
    }

    fn tell(&mut self) -> io::Result<u64> {
        self.file()?.stream_position()
    }

    fn stat(&self) -> io::Result<Stat> {
        let file = self.file.as_ref().ok_or_else(closed_error)?;
        Ok(Stat {
            size: file.metadata()?.len(),
        })
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            timed_out: false,
            blocked: true,
            eof: self.eof_reached,
            unread_bytes: 0,
            stream_type: "STDIO".into(),
            wrapper_type: "plainfile".into(),
            wrapper_data: String::new(),
            mode: self.mode.clone(),
            seekable: self.seekable && self.file.is_some(),
            uri: self.uri.clone(),
        }
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            debug!(uri = %self.uri, "closed file channel");
        }
    }
}

enum Backing {
    Memory(Cursor<Vec<u8>>),
    Disk(fs::File),
}

/// An anonymous read+write channel. Content stays in memory until it would
/// outgrow `max_memory`, then moves to an unnamed temporary file.
pub struct TempChannel {
    backing: Option<Backing>,
    max_memory: usize,
    temp_dir: Option<PathBuf>,
    eof_reached: bool,
}

impl TempChannel {
    pub const MODE: &'static str = "w+b";

    pub fn new(max_memory: usize, temp_dir: Option<PathBuf>) -> Self {
        Self {
            backing: Some(Backing::Memory(Cursor::new(Vec::new()))),
            max_memory,
            temp_dir,
            eof_reached: false,
        }
    }

    pub fn is_spilled(&self) -> bool {
        matches!(self.backing, Some(Backing::Disk(_)))
    }

    fn backing(&mut self) -> io::Result<&mut Backing> {
        self.backing.as_mut().ok_or_else(closed_error)
    }

    fn spill(&self, cursor: &Cursor<Vec<u8>>) -> io::Result<fs::File> {
        let mut file = match &self.temp_dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        file.write_all(cursor.get_ref())?;
        file.seek(SeekFrom::Start(cursor.position()))?;
        debug!(
            bytes = cursor.get_ref().len(),
            limit = self.max_memory,
            "temp channel spilled to disk"
        );
        Ok(file)
    }

    fn ensure_capacity(&mut self, incoming: usize) -> io::Result<()> {
        let spill_needed = match &self.backing {
            Some(Backing::Memory(cursor)) => {
                let end = usize::try_from(cursor.position())
                    .unwrap_or(usize::MAX)
                    .saturating_add(incoming);
                end.max(cursor.get_ref().len()) > self.max_memory
            }
            _ => false,
        };
        if !spill_needed {
            return Ok(());
        }

        if let Some(Backing::Memory(cursor)) = self.backing.take() {
            match self.spill(&cursor) {
                Ok(file) => self.backing = Some(Backing::Disk(file)),
                Err(e) => {
                    self.backing = Some(Backing::Memory(cursor));
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

impl Channel for TempChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match self.backing()? {
            Backing::Memory(cursor) => cursor.read(buf)?,
            Backing::Disk(file) => file.read(buf)?,
        };
        if n < buf.len() {
            self.eof_reached = true;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.ensure_capacity(data.len())?;
        match self.backing()? {
            Backing::Memory(cursor) => cursor.write_all(data)?,
            Backing::Disk(file) => file.write_all(data)?,
        }
        Ok(data.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let offset = match self.backing()? {
            Backing::Memory(cursor) => cursor.seek(pos)?,
            Backing::Disk(file) => file.seek(pos)?,
        };
        self.eof_reached = false;
        Ok(offset)
    }

    fn tell(&mut self) -> io::Result<u64> {
        match self.backing()? {
            Backing::Memory(cursor) => Ok(cursor.position()),
            Backing::Disk(file) => file.stream_position(),
        }
    }

    fn stat(&self) -> io::Result<Stat> {
        let size = match self.backing.as_ref().ok_or_else(closed_error)? {
            Backing::Memory(cursor) => cursor.get_ref().len() as u64,
            Backing::Disk(file) => file.metadata()?.len(),
        };
        Ok(Stat { size })
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            timed_out: false,
            blocked: true,
            eof: self.eof_reached,
            unread_bytes: 0,
            stream_type: "TEMP".into(),
            wrapper_type: "PHP".into(),
            wrapper_data: String::new(),
            mode: Self::MODE.into(),
            seekable: self.backing.is_some(),
            uri: "php://temp".into(),
        }
    }

    fn close(&mut self) {
        if self.backing.take().is_some() {
            debug!("closed temp channel");
        }
    }
}

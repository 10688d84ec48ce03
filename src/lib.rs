//! # Dhara
//!
//! Dhara (धारा - "stream" in Sanskrit) puts a file on disk, a temp buffer, or any other byte
//! channel behind one stream interface, the kind HTTP message libraries use for bodies.
//!
//! ## Basic usage
//!
//! ```rust,no_run
//! use dhara::{open, Whence};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut stream = open("/var/www/body.json", "r")?;
//!
//! let head = stream.read(16)?;
//! stream.seek(-4, Whence::End)?;
//! let tail = stream.get_contents()?;
//!
//! if let Some(size) = stream.get_size() {
//!     println!("{} bytes, head {:?}, tail {:?}", size, head, tail);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Bodies built in memory go through a temp stream:
//!
//! ```rust
//! let mut body = dhara::from_content(b"{\"ok\":true}");
//! assert_eq!(body.get_contents().unwrap(), b"{\"ok\":true}");
//! ```
//!
//! ## Modes
//!
//! Open modes are the usual `fopen` tokens: `r`, `w`, `a`, `x`, `c`, each optionally with `b`
//! and `+`. The binary flag makes no difference here; `+` adds the missing half of read/write.
//! Anything else is rejected with [`StreamError::InvalidMode`]. See [`mode`] for the
//! capability sets.
//!
//! ## Lifecycle
//!
//! A stream owns its channel until you call [`Stream::detach`] (you get the channel back,
//! still open) or [`Stream::close`] (the channel is released). After either, the stream
//! answers status queries with safe defaults and refuses I/O. Dropping a stream closes it.
//!
//! ## Tuning the behavior
//!
//! ```rust
//! use dhara::StreamFactory;
//!
//! let factory = StreamFactory::builder()
//!     .temp_memory_limit(64 * 1024) // move temp bodies to disk past 64KB
//!     .temp_dir(std::env::temp_dir())
//!     .build();
//!
//! let body = factory.from_content(b"hello");
//! ```
//!
//! ## Using with standard I/O libraries
//!
//! Wrap a stream in [`StreamAdapter`] to get `std::io::Read`, `Write` and `Seek`.
//!
//! ## Errors
//!
//! - Not found: the file was missing when you tried to open it
//! - Invalid mode: the mode string isn't one of the known tokens
//! - IO errors: the stream can't do what you asked (not readable, detached...) or the OS said no
//!
//! Status queries (`eof`, `is_readable`, `get_metadata`, ...) never fail.
//!
//! ## Thread safety
//!
//! Streams can be sent to other threads but aren't meant to be shared between them.
//!
//! ## Feature flags
//!
//! - `capi`: build the C API

pub mod channel;
pub mod core;
pub mod factory;
pub mod mode;
pub mod stream;

pub use channel::*;
pub use self::core::*;
pub use factory::*;
pub use mode::{AccessMode, ModeKind, ModeSet, normalize};
pub use stream::*;

#[cfg(feature = "capi")]
pub mod ffi;

use std::io::{self, Read, Seek, SeekFrom, Write};

pub struct StreamAdapter {
    inner: Stream,
}

impl StreamAdapter {
    pub fn new(stream: Stream) -> Self {
        Self { inner: stream }
    }

    pub fn into_inner(self) -> Stream {
        self.inner
    }
}

impl From<Stream> for StreamAdapter {
    fn from(stream: Stream) -> Self {
        Self::new(stream)
    }
}

impl Read for StreamAdapter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.inner.read(buf.len()).map_err(io::Error::other)?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl Write for StreamAdapter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for StreamAdapter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(offset) => {
                let offset = i64::try_from(offset).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset out of range")
                })?;
                (offset, Whence::Set)
            }
            SeekFrom::Current(offset) => (offset, Whence::Current),
            SeekFrom::End(offset) => (offset, Whence::End),
        };

        self.inner.seek(offset, whence).map_err(io::Error::other)?;
        self.inner.tell().map_err(io::Error::other)
    }
}

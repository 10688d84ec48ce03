use std::fmt;
use std::io::{self, SeekFrom};
use std::path::PathBuf;

use thiserror::Error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Raised by the mode classifier for a token outside the 20-token vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("mode {mode} is unknown")]
pub struct UnknownModeError {
    mode: String,
}

impl UnknownModeError {
    pub fn new(mode: impl Into<String>) -> Self {
        Self { mode: mode.into() }
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Readable,
    Writable,
    Seekable,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::Readable => "readable",
            Capability::Writable => "writable",
            Capability::Seekable => "seekable",
        })
    }
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("mode {mode} is invalid")]
    InvalidMode {
        mode: String,
        #[source]
        source: UnknownModeError,
    },

    #[error("file {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("stream is not {0}")]
    NotCapable(Capability),

    #[error("stream is detached")]
    Detached,

    #[error("length parameter cannot be negative: {0}")]
    NegativeLength(i64),

    #[error("unknown seek whence: {0}")]
    InvalidWhence(i32),
}

impl StreamError {
    /// Whether this error belongs to the I/O family (capability, lifecycle or native failures)
    /// as opposed to the argument/lookup errors raised while opening.
    pub fn is_io(&self) -> bool {
        !matches!(
            self,
            StreamError::InvalidMode { .. } | StreamError::NotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;

/// Reference point for [`Stream::seek`](crate::Stream::seek).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Whence {
    #[default]
    Set,
    Current,
    End,
}

impl Whence {
    pub fn to_seek_from(self, offset: i64) -> io::Result<SeekFrom> {
        match self {
            Whence::Set => u64::try_from(offset).map(SeekFrom::Start).map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "invalid seek to a negative position",
                )
            }),
            Whence::Current => Ok(SeekFrom::Current(offset)),
            Whence::End => Ok(SeekFrom::End(offset)),
        }
    }
}

/// Uses the C `SEEK_SET`/`SEEK_CUR`/`SEEK_END` numbering.
impl TryFrom<i32> for Whence {
    type Error = StreamError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Whence::Set),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            other => Err(StreamError::InvalidWhence(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stat {
    pub size: u64,
}

/// A single metadata field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetaValue {
    Bool(bool),
    Int(u64),
    Text(String),
}

impl MetaValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            MetaValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Live channel metadata, keyed the same way as a PHP `stream_get_meta_data` record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub timed_out: bool,
    pub blocked: bool,
    pub eof: bool,
    pub unread_bytes: u64,
    pub stream_type: String,
    pub wrapper_type: String,
    pub wrapper_data: String,
    pub mode: String,
    pub seekable: bool,
    pub uri: String,
}

impl Metadata {
    pub const KEYS: [&'static str; 10] = [
        "timed_out",
        "blocked",
        "eof",
        "unread_bytes",
        "stream_type",
        "wrapper_type",
        "wrapper_data",
        "mode",
        "seekable",
        "uri",
    ];

    /// The record reported once no channel is attached. Every derived query
    /// (readable, writable, seekable, eof) reads as unusable from it.
    pub fn detached() -> Self {
        Self {
            timed_out: true,
            blocked: true,
            eof: true,
            unread_bytes: 0,
            stream_type: String::new(),
            wrapper_type: String::new(),
            wrapper_data: String::new(),
            mode: String::new(),
            seekable: false,
            uri: String::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<MetaValue> {
        let value = match key {
            "timed_out" => MetaValue::Bool(self.timed_out),
            "blocked" => MetaValue::Bool(self.blocked),
            "eof" => MetaValue::Bool(self.eof),
            "unread_bytes" => MetaValue::Int(self.unread_bytes),
            "stream_type" => MetaValue::Text(self.stream_type.clone()),
            "wrapper_type" => MetaValue::Text(self.wrapper_type.clone()),
            "wrapper_data" => MetaValue::Text(self.wrapper_data.clone()),
            "mode" => MetaValue::Text(self.mode.clone()),
            "seekable" => MetaValue::Bool(self.seekable),
            "uri" => MetaValue::Text(self.uri.clone()),
            _ => return None,
        };
        Some(value)
    }
}

/// The native byte channel a [`Stream`](crate::Stream) wraps.
///
/// Failure modes are whatever the operating system (or backing store) reports;
/// the stream layer passes them through as [`StreamError::Io`].
pub trait Channel: Send {
    /// Read up to buf.len() bytes into buf.
    /// Returns number of bytes read (0 = end of data).
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write data at the cursor, returning the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Move the cursor, returning the new absolute offset.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Current cursor offset.
    fn tell(&mut self) -> io::Result<u64>;

    fn stat(&self) -> io::Result<Stat>;

    fn metadata(&self) -> Metadata;

    /// Release the underlying handle. Further calls on the channel fail.
    fn close(&mut self) {}
}

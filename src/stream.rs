use tracing::{debug, trace};

use crate::core::{Capability, Channel, MetaValue, Metadata, Result, StreamError, Whence};
use crate::mode::{ModeSet, normalize};

const CONTENTS_CHUNK: usize = 8 * 1024;

/// A byte stream over one channel.
///
/// A stream starts out holding its channel. [`detach`](Stream::detach) hands the channel
/// back to the caller without closing it; [`close`](Stream::close) releases it. Either way
/// the stream holds nothing afterwards and reports itself unreadable, unwritable and
/// unseekable. Dropping a stream closes whatever it still holds.
pub struct Stream {
    channel: Option<Box<dyn Channel>>,
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

impl Stream {
    pub fn new(channel: Box<dyn Channel>) -> Self {
        Self {
            channel: Some(channel),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.channel.is_some()
    }

    /// Detach and release the channel. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(mut channel) = self.detach() {
            channel.close();
            debug!("stream closed");
        }
    }

    /// Give up the channel without closing it. Returns `None` once nothing is attached.
    pub fn detach(&mut self) -> Option<Box<dyn Channel>> {
        let channel = self.channel.take();
        if channel.is_some() {
            debug!("stream detached");
        }
        channel
    }

    /// Byte length of the channel, when the channel can report one.
    pub fn get_size(&self) -> Option<u64> {
        let channel = self.channel.as_ref()?;
        channel.stat().ok().map(|stat| stat.size)
    }

    pub fn tell(&mut self) -> Result<u64> {
        let channel = self.channel.as_mut().ok_or(StreamError::Detached)?;
        Ok(channel.tell()?)
    }

    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        let channel = self.capable(Capability::Seekable)?;
        let pos = whence.to_seek_from(offset)?;
        let new_offset = channel.seek(pos)?;
        trace!(offset, ?whence, new_offset, "stream seek");
        Ok(())
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.seek(0, Whence::Set)
    }

    /// Read up to `length` bytes. Fewer come back at the end of data, and a
    /// single call returns at most one chunk.
    ///
    /// Readability is checked before anything else, so `read(0)` on a
    /// non-readable or detached stream fails; on a readable one it returns an
    /// empty buffer without touching the channel.
    pub fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        let channel = self.capable(Capability::Readable)?;
        if length == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; length.min(CONTENTS_CHUNK)];
        let n = channel.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Write `data` at the cursor, returning the number of bytes written.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let channel = self.capable(Capability::Writable)?;
        Ok(channel.write(data)?)
    }

    /// Everything from the cursor to the end of data. Does not rewind first.
    pub fn get_contents(&mut self) -> Result<Vec<u8>> {
        let channel = self.capable(Capability::Readable)?;
        let mut contents = Vec::new();
        let mut chunk = [0u8; CONTENTS_CHUNK];
        loop {
            let n = channel.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            contents.extend_from_slice(&chunk[..n]);
        }
        Ok(contents)
    }

    /// The full metadata record, or `None` once nothing is attached.
    pub fn get_metadata(&self) -> Option<Metadata> {
        self.channel.as_ref().map(|channel| channel.metadata())
    }

    /// One metadata field. A detached stream answers from [`Metadata::detached`];
    /// an unknown key yields `None`.
    pub fn get_metadata_key(&self, key: &str) -> Option<MetaValue> {
        match &self.channel {
            Some(channel) => channel.metadata().get(key),
            None => Metadata::detached().get(key),
        }
    }

    pub fn eof(&self) -> bool {
        self.flag("eof")
    }

    pub fn is_seekable(&self) -> bool {
        self.flag("seekable")
    }

    pub fn is_readable(&self) -> bool {
        self.mode_in(ModeSet::Readable)
    }

    pub fn is_writable(&self) -> bool {
        self.mode_in(ModeSet::Writable)
    }

    /// The whole content from offset 0, or empty when the stream can't be
    /// rewound or read.
    pub fn to_bytes(&mut self) -> Vec<u8> {
        let contents = self.rewind().and_then(|()| self.get_contents());
        match contents {
            Ok(bytes) => bytes,
            Err(e) => {
                trace!(error = %e, "stream conversion yielded nothing");
                Vec::new()
            }
        }
    }

    pub fn to_string_lossy(&mut self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }

    fn flag(&self, key: &str) -> bool {
        self.get_metadata_key(key)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    fn mode_in(&self, set: ModeSet) -> bool {
        let mode = self.get_metadata_key("mode");
        let raw = mode.as_ref().and_then(MetaValue::as_str).unwrap_or_default();
        normalize(raw).is_ok_and(|mode| set.contains(mode))
    }

    fn capable(&mut self, capability: Capability) -> Result<&mut Box<dyn Channel>> {
        let capable = match capability {
            Capability::Readable => self.is_readable(),
            Capability::Writable => self.is_writable(),
            Capability::Seekable => self.is_seekable(),
        };
        match self.channel.as_mut() {
            Some(channel) if capable => Ok(channel),
            _ => Err(StreamError::NotCapable(capability)),
        }
    }
}

impl From<Box<dyn Channel>> for Stream {
    fn from(channel: Box<dyn Channel>) -> Self {
        Self::new(channel)
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.close();
    }
}

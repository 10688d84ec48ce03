#![allow(dead_code)]
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dhara::{Channel, Metadata, Stat};

/// Shared counters, so a test can inspect a channel after handing it to a stream.
#[derive(Clone, Default)]
pub struct Calls {
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Calls {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// In-memory channel with switchable failures.
pub struct ScriptedChannel {
    data: Cursor<Vec<u8>>,
    mode: String,
    seekable: bool,
    fail_reads: bool,
    fail_writes: bool,
    fail_stat: bool,
    fail_tell: bool,
    eof: bool,
    calls: Calls,
}

impl ScriptedChannel {
    pub fn new(mode: &str) -> Self {
        Self {
            data: Cursor::new(Vec::new()),
            mode: mode.to_owned(),
            seekable: true,
            fail_reads: false,
            fail_writes: false,
            fail_stat: false,
            fail_tell: false,
            eof: false,
            calls: Calls::default(),
        }
    }

    pub fn with_content(mut self, content: &[u8]) -> Self {
        self.data = Cursor::new(content.to_vec());
        self
    }

    pub fn not_seekable(mut self) -> Self {
        self.seekable = false;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn failing_stat(mut self) -> Self {
        self.fail_stat = true;
        self
    }

    pub fn failing_tell(mut self) -> Self {
        self.fail_tell = true;
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.clone()
    }

    pub fn boxed(self) -> Box<dyn Channel> {
        Box::new(self)
    }
}

fn injected() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "Simulated I/O error")
}

impl Channel for ScriptedChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.calls.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(injected());
        }
        let n = self.data.read(buf)?;
        if n < buf.len() {
            self.eof = true;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(injected());
        }
        self.data.write(data)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if !self.seekable {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "illegal seek"));
        }
        self.eof = false;
        self.data.seek(pos)
    }

    fn tell(&mut self) -> io::Result<u64> {
        if self.fail_tell {
            return Err(injected());
        }
        Ok(self.data.position())
    }

    fn stat(&self) -> io::Result<Stat> {
        if self.fail_stat {
            return Err(injected());
        }
        Ok(Stat {
            size: self.data.get_ref().len() as u64,
        })
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            timed_out: false,
            blocked: true,
            eof: self.eof,
            unread_bytes: 0,
            stream_type: "SCRIPTED".into(),
            wrapper_type: "test".into(),
            wrapper_data: String::new(),
            mode: self.mode.clone(),
            seekable: self.seekable,
            uri: "scripted://".into(),
        }
    }

    fn close(&mut self) {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
    }
}

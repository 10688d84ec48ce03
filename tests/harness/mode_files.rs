#![allow(dead_code)]
use std::path::Path;

use dhara::{AccessMode, ModeSet, Stream, StreamFactory};
use tempfile::NamedTempFile;

pub const TEXT: &[u8] = b"The quick brown fox jumps over the lazy dog.\n";

/// A stream opened on its own temp file. The stream is dropped before the file.
pub struct ModeFile {
    pub mode: AccessMode,
    pub stream: Stream,
    file: NamedTempFile,
}

impl ModeFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// One fresh temp file per mode of `set`, skipping the modes that refuse an existing file.
pub fn open_all(set: ModeSet) -> Vec<ModeFile> {
    let factory = StreamFactory::new();
    let mut modes: Vec<AccessMode> = set.suitable().into_iter().collect();
    modes.sort();

    modes
        .into_iter()
        .map(|mode| {
            let file = NamedTempFile::new().expect("create temp file");
            let stream = factory
                .from_file(file.path(), mode.as_str())
                .unwrap_or_else(|e| panic!("open temp file with {mode}: {e}"));
            ModeFile { mode, stream, file }
        })
        .collect()
}

/// Read byte by byte until the stream reports end of data or refuses to read.
pub fn reach_end(stream: &mut Stream) {
    while !stream.eof() {
        match stream.read(1) {
            Ok(byte) if !byte.is_empty() => {}
            _ => break,
        }
    }
}

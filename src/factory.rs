use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::channel::{FileChannel, TempChannel};
use crate::core::{Channel, Result, StreamError};
use crate::mode::{AccessMode, ModeKind, normalize};
use crate::stream::Stream;

#[derive(Clone, Debug)]
pub struct FactoryConfig {
    pub temp_memory_limit: usize,
    pub temp_dir: Option<PathBuf>,
    pub default_mode: AccessMode,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            temp_memory_limit: 2 * 1024 * 1024,
            temp_dir: None,
            default_mode: AccessMode::new(ModeKind::Read, false, false),
        }
    }
}

/// Builds streams over temp buffers, files on disk and caller-owned channels.
pub struct StreamFactory {
    config: FactoryConfig,
}

pub struct StreamFactoryBuilder {
    config: FactoryConfig,
}

impl Default for StreamFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamFactoryBuilder {
    pub fn new() -> Self {
        Self {
            config: FactoryConfig::default(),
        }
    }

    pub fn temp_memory_limit(mut self, limit: usize) -> Self {
        self.config.temp_memory_limit = limit;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn default_mode(mut self, mode: AccessMode) -> Self {
        self.config.default_mode = mode;
        self
    }

    pub fn build(self) -> StreamFactory {
        StreamFactory {
            config: self.config,
        }
    }
}

impl StreamFactory {
    pub fn new() -> Self {
        StreamFactoryBuilder::new().build()
    }

    pub fn builder() -> StreamFactoryBuilder {
        StreamFactoryBuilder::new()
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// A fresh read+write temp stream holding `content`, positioned at 0.
    ///
    /// Best effort: if writing or rewinding fails the stream is still returned,
    /// possibly with partial content.
    pub fn from_content(&self, content: &[u8]) -> Stream {
        let channel = TempChannel::new(
            self.config.temp_memory_limit,
            self.config.temp_dir.clone(),
        );
        let mut stream = self.from_channel(Box::new(channel));

        if !content.is_empty() {
            let filled = stream.write(content).and_then(|_| stream.rewind());
            if let Err(e) = filled {
                warn!(error = %e, len = content.len(), "could not fill temp stream");
            }
        }

        stream
    }

    /// Open `path` with `mode`.
    ///
    /// The existence check runs before the open and is advisory only.
    pub fn from_file(&self, path: impl AsRef<Path>, mode: &str) -> Result<Stream> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StreamError::NotFound(path.to_path_buf()));
        }

        let mode = normalize(mode).map_err(|source| StreamError::InvalidMode {
            mode: mode.to_owned(),
            source,
        })?;

        let channel = FileChannel::open(path, mode)?;
        Ok(self.from_channel(Box::new(channel)))
    }

    /// Open `path` with the configured default mode.
    pub fn from_file_default(&self, path: impl AsRef<Path>) -> Result<Stream> {
        self.from_file(path, self.config.default_mode.as_str())
    }

    /// Wrap a caller-owned channel, rewinding it when possible.
    pub fn from_channel(&self, channel: Box<dyn Channel>) -> Stream {
        let mut stream = Stream::new(channel);
        if let Err(e) = stream.rewind() {
            debug!(error = %e, "wrapped channel left at its current position");
        }
        stream
    }

    /// Wrap an already open file, classifying it from its descriptor flags.
    #[cfg(unix)]
    pub fn from_std_file(&self, file: fs::File) -> Result<Stream> {
        let channel = FileChannel::from_file(file)?;
        Ok(self.from_channel(Box::new(channel)))
    }

    /// Wrap an already open file that was opened with `mode`.
    pub fn from_std_file_with_mode(&self, file: fs::File, mode: AccessMode) -> Stream {
        self.from_channel(Box::new(FileChannel::new(file, mode, String::new())))
    }
}

impl Default for StreamFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Open a file stream with the default factory.
pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Stream> {
    StreamFactory::new().from_file(path, mode)
}

/// A temp stream holding `content`, from the default factory.
pub fn from_content(content: &[u8]) -> Stream {
    StreamFactory::new().from_content(content)
}

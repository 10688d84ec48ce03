use dhara::*;

mod harness {
    pub mod mode_files;
    pub mod scripted_channel;
}
use harness::mode_files::{TEXT, open_all, reach_end};
use harness::scripted_channel::ScriptedChannel;

#[test]
fn fifty_bytes_round_trip() {
    let mut stream = from_content(b"");
    for _ in 0..5 {
        assert_eq!(stream.write(b"data-data\n").unwrap(), 10);
    }
    stream.rewind().unwrap();

    let contents = stream.get_contents().unwrap();
    assert_eq!(contents, b"data-data\n".repeat(5));
    assert_eq!(stream.tell().unwrap(), 50);
}

#[test]
fn write_rewind_get_contents_on_every_read_write_mode() {
    for mut f in open_all(ModeSet::ReadableAndWritable) {
        assert_eq!(f.stream.write(TEXT).unwrap(), TEXT.len(), "{}", f.mode);
        f.stream.rewind().unwrap();
        assert_eq!(f.stream.get_contents().unwrap(), TEXT, "{}", f.mode);
    }
}

#[test]
fn get_contents_does_not_rewind() {
    let mut stream = from_content(TEXT);
    stream.seek(4, Whence::Set).unwrap();
    assert_eq!(stream.get_contents().unwrap(), &TEXT[4..]);
    assert!(stream.get_contents().unwrap().is_empty());
}

#[test]
fn read_returns_requested_prefix_then_less_at_end() {
    for mut f in open_all(ModeSet::ReadableAndWritable) {
        f.stream.write(TEXT).unwrap();
        f.stream.rewind().unwrap();

        let half = TEXT.len() / 2;
        assert_eq!(f.stream.read(half).unwrap(), &TEXT[..half], "{}", f.mode);
        assert_eq!(f.stream.read(TEXT.len()).unwrap(), &TEXT[half..], "{}", f.mode);
        assert!(f.stream.read(TEXT.len()).unwrap().is_empty(), "{}", f.mode);
    }
}

#[test]
fn read_accepts_any_length() {
    let mut stream = from_content(b"abc");
    assert_eq!(stream.read(usize::MAX).unwrap(), b"abc");
    assert!(stream.read(1 << 40).unwrap().is_empty());
}

#[test]
fn large_read_returns_at_most_one_chunk() {
    let content = vec![7u8; 20 * 1024];
    let mut stream = from_content(&content);

    let first = stream.read(content.len()).unwrap();
    assert!(!first.is_empty() && first.len() < content.len());
    assert!(first.iter().all(|&b| b == 7));

    let mut rest = stream.get_contents().unwrap();
    rest.splice(0..0, first);
    assert_eq!(rest, content);
}

#[test]
fn read_zero_on_readable_stream_is_empty() {
    for mut f in open_all(ModeSet::Readable) {
        assert!(f.stream.read(0).unwrap().is_empty(), "{}", f.mode);
    }
}

#[test]
fn read_zero_skips_the_channel() {
    let channel = ScriptedChannel::new("r+").with_content(TEXT);
    let calls = channel.calls();
    let mut stream = Stream::new(channel.boxed());

    assert!(stream.read(0).unwrap().is_empty());
    assert_eq!(calls.reads(), 0);
}

#[test]
fn read_zero_still_requires_readability() {
    let channel = ScriptedChannel::new("w");
    let calls = channel.calls();
    let mut stream = Stream::new(channel.boxed());

    assert!(matches!(
        stream.read(0),
        Err(StreamError::NotCapable(Capability::Readable))
    ));
    assert_eq!(calls.reads(), 0);
}

#[test]
fn write_only_streams_refuse_reads() {
    for mut f in open_all(ModeSet::WritableOnly) {
        let err = f.stream.read(1).unwrap_err();
        assert!(
            matches!(err, StreamError::NotCapable(Capability::Readable)),
            "{}",
            f.mode
        );
        assert!(err.is_io());
        assert!(f.stream.get_contents().is_err(), "{}", f.mode);
    }
}

#[test]
fn read_only_streams_refuse_writes() {
    for mut f in open_all(ModeSet::ReadableOnly) {
        assert!(
            matches!(
                f.stream.write(TEXT),
                Err(StreamError::NotCapable(Capability::Writable))
            ),
            "{}",
            f.mode
        );
    }
}

#[test]
fn writes_advance_the_cursor() {
    for mut f in open_all(ModeSet::Writable) {
        f.stream.write(TEXT).unwrap();
        assert_eq!(f.stream.tell().unwrap(), TEXT.len() as u64, "{}", f.mode);
        assert_eq!(f.stream.get_size(), Some(TEXT.len() as u64), "{}", f.mode);
    }
}

#[test]
fn seek_variants() {
    for mut f in open_all(ModeSet::All) {
        f.stream.seek(1, Whence::Set).unwrap();
        assert_eq!(f.stream.tell().unwrap(), 1, "{}", f.mode);
    }

    let len = TEXT.len() as u64;
    for mut f in open_all(ModeSet::Writable) {
        f.stream.write(TEXT).unwrap();

        f.stream.seek((len / 2) as i64, Whence::Set).unwrap();
        f.stream.seek((len / 4) as i64, Whence::Current).unwrap();
        assert_eq!(f.stream.tell().unwrap(), len / 2 + len / 4, "{}", f.mode);

        f.stream.seek(-1, Whence::End).unwrap();
        assert_eq!(f.stream.tell().unwrap(), len - 1, "{}", f.mode);

        f.stream.seek(1, Whence::End).unwrap();
        assert_eq!(f.stream.tell().unwrap(), len + 1, "{}", f.mode);
    }
}

#[test]
fn seek_to_negative_offset_fails() {
    for mut f in open_all(ModeSet::All) {
        let err = f.stream.seek(-1, Whence::Set).unwrap_err();
        assert!(matches!(err, StreamError::Io(_)), "{}", f.mode);

        let err = f.stream.seek(-1, Whence::Current).unwrap_err();
        assert!(err.is_io(), "{}", f.mode);
    }
}

#[test]
fn whence_from_c_numbering() {
    assert_eq!(Whence::try_from(0i32).unwrap(), Whence::Set);
    assert_eq!(Whence::try_from(1i32).unwrap(), Whence::Current);
    assert_eq!(Whence::try_from(2i32).unwrap(), Whence::End);
    assert!(matches!(
        Whence::try_from(-1i32),
        Err(StreamError::InvalidWhence(-1))
    ));
    assert!(matches!(Whence::try_from(3i32), Err(StreamError::InvalidWhence(3))));
}

#[test]
fn eof_tracks_reads_past_the_end() {
    for f in open_all(ModeSet::All) {
        assert!(!f.stream.eof(), "{}", f.mode);
    }
    for mut f in open_all(ModeSet::Writable) {
        f.stream.write(TEXT).unwrap();
        assert!(!f.stream.eof(), "{}", f.mode);
    }
    for mut f in open_all(ModeSet::WritableOnly) {
        f.stream.write(TEXT).unwrap();
        reach_end(&mut f.stream);
        assert!(!f.stream.eof(), "{}", f.mode);
    }
    for mut f in open_all(ModeSet::ReadableAndWritable) {
        f.stream.write(TEXT).unwrap();
        reach_end(&mut f.stream);
        assert!(f.stream.eof(), "{}", f.mode);

        f.stream.rewind().unwrap();
        assert!(!f.stream.eof(), "{}", f.mode);
    }
}

#[test]
fn capability_queries_follow_the_mode() {
    for f in open_all(ModeSet::All) {
        assert_eq!(f.stream.is_readable(), f.mode.is_readable(), "{}", f.mode);
        assert_eq!(f.stream.is_writable(), f.mode.is_writable(), "{}", f.mode);
        assert!(f.stream.is_seekable(), "{}", f.mode);
    }
}

#[test]
fn unrecognized_live_mode_is_neither_readable_nor_writable() {
    let stream = Stream::new(ScriptedChannel::new("rt").boxed());
    assert!(!stream.is_readable());
    assert!(!stream.is_writable());
}

#[test]
fn file_metadata() {
    let f = open_all(ModeSet::ReadableOnly).remove(0);
    let meta = f.stream.get_metadata().unwrap();

    assert_eq!(meta.mode, normalize(f.mode.as_str()).unwrap().as_str());
    assert_eq!(meta.uri, f.path().display().to_string());
    assert_eq!(meta.wrapper_type, "plainfile");
    assert!(meta.seekable);
    assert!(!meta.eof);

    assert_eq!(
        f.stream.get_metadata_key("seekable"),
        Some(MetaValue::Bool(true))
    );
    assert_eq!(
        f.stream.get_metadata_key("unread_bytes"),
        Some(MetaValue::Int(0))
    );
    assert_eq!(f.stream.get_metadata_key("no_such_key"), None);
}

#[test]
fn to_bytes_rewinds_first() {
    let mut stream = from_content(TEXT);
    stream.read(5).unwrap();
    assert_eq!(stream.to_bytes(), TEXT);
    assert_eq!(
        stream.to_string_lossy(),
        String::from_utf8_lossy(TEXT).into_owned()
    );
}

#[test]
fn to_bytes_is_empty_when_unreadable_or_unseekable() {
    for mut f in open_all(ModeSet::WritableOnly) {
        f.stream.write(TEXT).unwrap();
        assert!(f.stream.to_bytes().is_empty(), "{}", f.mode);
    }

    let mut stream = Stream::new(ScriptedChannel::new("r").with_content(TEXT).not_seekable().boxed());
    assert!(stream.is_readable());
    assert!(stream.to_bytes().is_empty());
}

#[test]
fn channel_failures_surface_as_io_errors() {
    let mut stream = Stream::new(ScriptedChannel::new("r+").with_content(TEXT).failing_reads().boxed());
    assert!(matches!(stream.read(4), Err(StreamError::Io(_))));
    assert!(matches!(stream.get_contents(), Err(StreamError::Io(_))));
    assert!(stream.to_bytes().is_empty());

    let mut stream = Stream::new(ScriptedChannel::new("w").failing_writes().boxed());
    let err = stream.write(TEXT).unwrap_err();
    match err {
        StreamError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
        other => panic!("wrong error type: {other:?}"),
    }

    let mut stream = Stream::new(ScriptedChannel::new("r").failing_tell().boxed());
    assert!(matches!(stream.tell(), Err(StreamError::Io(_))));
}

#[test]
fn size_is_none_when_stat_fails() {
    let stream = Stream::new(ScriptedChannel::new("r").with_content(TEXT).failing_stat().boxed());
    assert_eq!(stream.get_size(), None);

    let stream = Stream::new(ScriptedChannel::new("r").with_content(TEXT).boxed());
    assert_eq!(stream.get_size(), Some(TEXT.len() as u64));
}

#[test]
fn unseekable_stream_refuses_seek_and_rewind() {
    let mut stream = Stream::new(ScriptedChannel::new("r").not_seekable().boxed());
    assert!(!stream.is_seekable());
    assert!(matches!(
        stream.seek(0, Whence::Set),
        Err(StreamError::NotCapable(Capability::Seekable))
    ));
    assert!(stream.rewind().is_err());
}

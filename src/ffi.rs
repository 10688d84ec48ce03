use libc::size_t;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;
use std::slice;

use crate::{Stream, StreamError, StreamFactory, Whence};

#[repr(C)]
#[allow(non_camel_case_types)]
pub enum DharaErrorCode {
    DHARA_SUCCESS = 0,
    DHARA_IO = 1,
    DHARA_NOT_FOUND = 2,
    DHARA_INVALID_MODE = 3,
    DHARA_NOT_CAPABLE = 4,
    DHARA_DETACHED = 5,
    DHARA_INVALID_ARGUMENT = 6,
    DHARA_UNKNOWN = 99,
}

impl From<&StreamError> for DharaErrorCode {
    fn from(err: &StreamError) -> Self {
        match err {
            StreamError::Io(_) => DharaErrorCode::DHARA_IO,
            StreamError::NotFound(_) => DharaErrorCode::DHARA_NOT_FOUND,
            StreamError::InvalidMode { .. } => DharaErrorCode::DHARA_INVALID_MODE,
            StreamError::NotCapable(_) => DharaErrorCode::DHARA_NOT_CAPABLE,
            StreamError::Detached => DharaErrorCode::DHARA_DETACHED,
            StreamError::NegativeLength(_) | StreamError::InvalidWhence(_) => {
                DharaErrorCode::DHARA_INVALID_ARGUMENT
            }
        }
    }
}

thread_local! {
    static LAST_ERROR: std::cell::RefCell<Option<CString>> = const { std::cell::RefCell::new(None) };
}

fn set_last_error(err: &StreamError) {
    let error_msg = CString::new(err.to_string()).unwrap_or_default();
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some(error_msg);
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

fn invalid_argument(msg: &'static str) -> StreamError {
    StreamError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, msg))
}

/// # Safety
/// >> s must be NULL or a valid null-terminated C string
unsafe fn c_str<'a>(s: *const c_char, what: &'static str) -> Result<&'a str, StreamError> {
    if s.is_null() {
        return Err(invalid_argument(what));
    }
    unsafe { CStr::from_ptr(s) }
        .to_str()
        .map_err(|_| invalid_argument(what))
}

/// Opaque stream handle
pub struct DharaStream {
    inner: Stream,
}

/// Get the last error message for this thread
/// Returns NULL if no error
/// The returned string is valid until the next dhara call on this thread
#[unsafe(no_mangle)]
pub extern "C" fn dhara_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Open a file as a stream
/// Returns NULL on error
///
/// # Safety
/// >> path must be a valid null-terminated C string
/// >> mode must be a valid null-terminated C string
/// >> Caller must free the returned pointer with dhara_stream_close()
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dhara_stream_from_file(
    path: *const c_char,
    mode: *const c_char,
) -> *mut DharaStream {
    clear_last_error();

    let opened = unsafe { c_str(path, "Invalid path") }.and_then(|path| {
        let mode = unsafe { c_str(mode, "Invalid mode") }?;
        StreamFactory::new().from_file(path, mode)
    });

    match opened {
        Ok(stream) => Box::into_raw(Box::new(DharaStream { inner: stream })),
        Err(e) => {
            set_last_error(&e);
            ptr::null_mut()
        }
    }
}

/// Create a read+write temp stream holding a copy of data
/// Returns NULL on error
///
/// # Safety
/// >> data must be valid for reads of len bytes (may be NULL when len is 0)
/// >> Caller must free the returned pointer with dhara_stream_close()
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dhara_stream_from_content(
    data: *const c_void,
    len: size_t,
) -> *mut DharaStream {
    clear_last_error();

    if data.is_null() && len > 0 {
        set_last_error(&invalid_argument("Null data pointer"));
        return ptr::null_mut();
    }

    let content: &[u8] = if len == 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(data as *const u8, len) }
    };

    let stream = StreamFactory::new().from_content(content);
    Box::into_raw(Box::new(DharaStream { inner: stream }))
}

/// Read up to length bytes from the stream into buffer
/// Returns number of bytes read, or -1 on error
/// A negative length is an error
///
/// # Safety
/// >> stream must be a valid stream handle
/// >> buffer must be valid for writes of at least length bytes
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dhara_read(
    stream: *mut DharaStream,
    buffer: *mut c_void,
    length: isize,
) -> isize {
    clear_last_error();

    if stream.is_null() || buffer.is_null() {
        set_last_error(&invalid_argument("Null pointer argument"));
        return -1;
    }

    let Ok(length) = usize::try_from(length) else {
        set_last_error(&StreamError::NegativeLength(length as i64));
        return -1;
    };

    let stream_ref = unsafe { &mut *stream };

    match stream_ref.inner.read(length) {
        Ok(data) => {
            let out = unsafe { slice::from_raw_parts_mut(buffer as *mut u8, length) };
            out[..data.len()].copy_from_slice(&data);
            data.len() as isize
        }
        Err(e) => {
            set_last_error(&e);
            -1
        }
    }
}

/// Write len bytes from data at the stream cursor
/// Returns number of bytes written, or -1 on error
///
/// # Safety
/// >> stream must be a valid stream handle
/// >> data must be valid for reads of len bytes
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dhara_write(
    stream: *mut DharaStream,
    data: *const c_void,
    len: size_t,
) -> isize {
    clear_last_error();

    if stream.is_null() || (data.is_null() && len > 0) {
        set_last_error(&invalid_argument("Null pointer argument"));
        return -1;
    }

    let stream_ref = unsafe { &mut *stream };
    let content: &[u8] = if len == 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(data as *const u8, len) }
    };

    match stream_ref.inner.write(content) {
        Ok(n) => n as isize,
        Err(e) => {
            set_last_error(&e);
            -1
        }
    }
}

/// Move the stream cursor
/// whence is SEEK_SET (0), SEEK_CUR (1) or SEEK_END (2)
/// Returns 0 on success, error code on failure
///
/// # Safety
/// >> stream must be a valid stream handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dhara_seek(stream: *mut DharaStream, offset: i64, whence: c_int) -> c_int {
    clear_last_error();

    if stream.is_null() {
        set_last_error(&invalid_argument("Null stream pointer"));
        return DharaErrorCode::DHARA_INVALID_ARGUMENT as c_int;
    }

    let stream_ref = unsafe { &mut *stream };

    let result = Whence::try_from(whence).and_then(|whence| stream_ref.inner.seek(offset, whence));
    match result {
        Ok(()) => DharaErrorCode::DHARA_SUCCESS as c_int,
        Err(e) => {
            let code = DharaErrorCode::from(&e);
            set_last_error(&e);
            code as c_int
        }
    }
}

/// Get current position in the stream
/// Returns current position, or -1 on error
///
/// # Safety
/// >> stream must be a valid stream handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dhara_tell(stream: *mut DharaStream) -> i64 {
    clear_last_error();

    if stream.is_null() {
        set_last_error(&invalid_argument("Null stream pointer"));
        return -1;
    }

    let stream_ref = unsafe { &mut *stream };

    match stream_ref.inner.tell() {
        Ok(pos) => i64::try_from(pos).unwrap_or(i64::MAX),
        Err(e) => {
            set_last_error(&e);
            -1
        }
    }
}

/// Get stream size if available
/// Returns size, or 0 if not available
/// Sets has_size to 1 if size is available, 0 otherwise
///
/// # Safety
/// >> stream must be a valid stream handle
/// >> has_size must be valid for writes
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dhara_size(stream: *const DharaStream, has_size: *mut c_int) -> u64 {
    clear_last_error();

    if stream.is_null() || has_size.is_null() {
        if !has_size.is_null() {
            unsafe { *has_size = 0 };
        }
        set_last_error(&invalid_argument("Null pointer argument"));
        return 0;
    }

    let stream_ref = unsafe { &*stream };

    match stream_ref.inner.get_size() {
        Some(size) => {
            unsafe { *has_size = 1 };
            size
        }
        None => {
            unsafe { *has_size = 0 };
            0
        }
    }
}

/// # Safety
/// >> stream must be a valid stream handle or NULL
unsafe fn flag(stream: *const DharaStream, query: impl FnOnce(&Stream) -> bool) -> c_int {
    clear_last_error();

    if stream.is_null() {
        return 0;
    }

    let stream_ref = unsafe { &*stream };
    if query(&stream_ref.inner) { 1 } else { 0 }
}

/// Returns 1 if the stream is at end of data, 0 otherwise
///
/// # Safety
/// >> stream must be a valid stream handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dhara_eof(stream: *const DharaStream) -> c_int {
    unsafe { flag(stream, Stream::eof) }
}

/// Returns 1 if the stream can be read, 0 otherwise
///
/// # Safety
/// >> stream must be a valid stream handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dhara_is_readable(stream: *const DharaStream) -> c_int {
    unsafe { flag(stream, Stream::is_readable) }
}

/// Returns 1 if the stream can be written, 0 otherwise
///
/// # Safety
/// >> stream must be a valid stream handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dhara_is_writable(stream: *const DharaStream) -> c_int {
    unsafe { flag(stream, Stream::is_writable) }
}

/// Returns 1 if the stream can seek, 0 otherwise
///
/// # Safety
/// >> stream must be a valid stream handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dhara_is_seekable(stream: *const DharaStream) -> c_int {
    unsafe { flag(stream, Stream::is_seekable) }
}

/// Close a stream and free its resources
///
/// # Safety
/// >> stream must be a valid stream handle or NULL
/// >> stream must not be used after this call
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dhara_stream_close(stream: *mut DharaStream) {
    if !stream.is_null() {
        let mut stream_box = unsafe { Box::from_raw(stream) };
        stream_box.inner.close();
    }
}

/// Get library version string
/// Returns pointer to static version string
#[unsafe(no_mangle)]
pub extern "C" fn dhara_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

//! src/session/native.rs
//! Binding to the vendor's C SDK (`libWeWorkFinanceSdk_C.so`) through `libloading`
//!
//! One [`NativeSession`] owns one SDK handle: `NewSdk` + `Init` on construction,
//! `DestroySdk` exactly once on drop. Slices and media buffers are freed by their own
//! `Drop` impls.
//!
//! The SDK is not documented as thread-safe, so none of these types are `Send` or `Sync`.

use crate::aliases::RecoveredKey;
use crate::builders::Transport;
use crate::error::ArchiveError;
use crate::session::{ArchiveSession, ChunkBuffer, MediaCursor, SliceBuffer};
use crate::status::StatusCode;
use libloading::Library;
use std::ffi::{c_char, c_int, c_uint, c_ulonglong, c_void, CString, OsStr};
use std::rc::Rc;
use tracing::debug;

type NewFn = unsafe extern "C" fn() -> *mut c_void;
type FreeFn = unsafe extern "C" fn(*mut c_void);
type InitFn = unsafe extern "C" fn(*mut c_void, *const c_char, *const c_char) -> c_int;
type GetChatDataFn = unsafe extern "C" fn(
    *mut c_void,
    c_ulonglong,
    c_uint,
    *const c_char,
    *const c_char,
    c_int,
    *mut c_void,
) -> c_int;
type DecryptDataFn = unsafe extern "C" fn(*const c_char, *const c_char, *mut c_void) -> c_int;
type GetMediaDataFn = unsafe extern "C" fn(
    *mut c_void,
    *const c_char,
    *const c_char,
    *const c_char,
    *const c_char,
    c_int,
    *mut c_void,
) -> c_int;
type BytesFn = unsafe extern "C" fn(*mut c_void) -> *const c_char;
type LenFn = unsafe extern "C" fn(*mut c_void) -> c_int;

/// Resolved SDK entry points. `_library` is declared last so it is dropped after every
/// function pointer copied out of it has gone.
struct SdkApi {
    new_sdk: NewFn,
    init: InitFn,
    destroy_sdk: FreeFn,
    get_chat_data: GetChatDataFn,
    decrypt_data: DecryptDataFn,
    get_media_data: GetMediaDataFn,
    new_slice: NewFn,
    free_slice: FreeFn,
    get_content_from_slice: BytesFn,
    get_slice_len: LenFn,
    new_media_data: NewFn,
    free_media_data: FreeFn,
    get_out_index_buf: BytesFn,
    get_data: BytesFn,
    get_index_len: LenFn,
    get_data_len: LenFn,
    is_media_data_finish: LenFn,
    _library: Library,
}

macro_rules! symbol {
    ($library:expr, $name:literal, $ty:ty) => {
        // SAFETY: the signature matches the vendor header for this symbol.
        unsafe { *$library.get::<$ty>(concat!($name, "\0").as_bytes())? }
    };
}

impl SdkApi {
    fn load(path: &OsStr) -> Result<Self, ArchiveError> {
        // SAFETY: loading runs the library's initializers; the vendor SDK has none with
        // preconditions beyond being loaded once per path.
        let library = unsafe { Library::new(path)? };
        Ok(Self {
            new_sdk: symbol!(library, "NewSdk", NewFn),
            init: symbol!(library, "Init", InitFn),
            destroy_sdk: symbol!(library, "DestroySdk", FreeFn),
            get_chat_data: symbol!(library, "GetChatData", GetChatDataFn),
            decrypt_data: symbol!(library, "DecryptData", DecryptDataFn),
            get_media_data: symbol!(library, "GetMediaData", GetMediaDataFn),
            new_slice: symbol!(library, "NewSlice", NewFn),
            free_slice: symbol!(library, "FreeSlice", FreeFn),
            get_content_from_slice: symbol!(library, "GetContentFromSlice", BytesFn),
            get_slice_len: symbol!(library, "GetSliceLen", LenFn),
            new_media_data: symbol!(library, "NewMediaData", NewFn),
            free_media_data: symbol!(library, "FreeMediaData", FreeFn),
            get_out_index_buf: symbol!(library, "GetOutIndexBuf", BytesFn),
            get_data: symbol!(library, "GetData", BytesFn),
            get_index_len: symbol!(library, "GetIndexLen", LenFn),
            get_data_len: symbol!(library, "GetDataLen", LenFn),
            is_media_data_finish: symbol!(library, "IsMediaDataFinish", LenFn),
            _library: library,
        })
    }
}

fn c_string(what: &str, bytes: impl Into<Vec<u8>>) -> Result<CString, ArchiveError> {
    CString::new(bytes).map_err(|_| ArchiveError::InvalidArgument(format!("{what} contains a NUL byte")))
}

/// Copy-free view of `len` bytes at `ptr`; empty for a null pointer or non-positive length.
///
/// # Safety
/// `ptr` must be valid for `len` bytes for the lifetime `'a`.
unsafe fn bytes_at<'a>(ptr: *const c_char, len: c_int) -> &'a [u8] {
    if ptr.is_null() || len <= 0 {
        return &[];
    }
    std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize)
}

fn check(code: c_int) -> Result<(), ArchiveError> {
    if code == 0 {
        Ok(())
    } else {
        Err(ArchiveError::Status(StatusCode::from_raw(code)))
    }
}

/// A session backed by the vendor shared library.
pub struct NativeSession {
    api: Rc<SdkApi>,
    sdk: *mut c_void,
}

impl NativeSession {
    /// Load the SDK from `library_path`, create a handle and initialize it.
    ///
    /// A non-zero `Init` status is fatal and returned as [`ArchiveError::Status`]; the
    /// half-created handle is destroyed before returning.
    pub fn open(
        library_path: impl AsRef<OsStr>,
        corp_id: &str,
        secret: &str,
    ) -> Result<Self, ArchiveError> {
        let api = Rc::new(SdkApi::load(library_path.as_ref())?);
        let corp_id = c_string("corp id", corp_id)?;
        let secret = c_string("secret", secret)?;

        // SAFETY: NewSdk has no preconditions.
        let sdk = unsafe { (api.new_sdk)() };
        if sdk.is_null() {
            return Err(ArchiveError::InvalidArgument("NewSdk returned a null handle".into()));
        }
        let session = Self { api, sdk };

        // SAFETY: `sdk` is a live handle; both strings are NUL-terminated and outlive the call.
        let code = unsafe { (session.api.init)(session.sdk, corp_id.as_ptr(), secret.as_ptr()) };
        check(code)?;
        debug!("archive SDK initialized");
        Ok(session)
    }

    fn new_slice(&self) -> Result<NativeSlice, ArchiveError> {
        // SAFETY: NewSlice has no preconditions.
        let ptr = unsafe { (self.api.new_slice)() };
        if ptr.is_null() {
            return Err(ArchiveError::InvalidArgument("NewSlice returned null".into()));
        }
        Ok(NativeSlice {
            api: Rc::clone(&self.api),
            ptr,
        })
    }

    fn new_media_data(&self) -> Result<NativeChunk, ArchiveError> {
        // SAFETY: NewMediaData has no preconditions.
        let ptr = unsafe { (self.api.new_media_data)() };
        if ptr.is_null() {
            return Err(ArchiveError::InvalidArgument("NewMediaData returned null".into()));
        }
        Ok(NativeChunk {
            api: Rc::clone(&self.api),
            ptr,
        })
    }
}

impl Drop for NativeSession {
    fn drop(&mut self) {
        // SAFETY: `sdk` came from NewSdk and is destroyed only here.
        unsafe { (self.api.destroy_sdk)(self.sdk) };
    }
}

impl ArchiveSession for NativeSession {
    type Slice = NativeSlice;
    type Chunk = NativeChunk;

    fn fetch_chat_batch(
        &self,
        cursor: u64,
        limit: u32,
        transport: &Transport,
    ) -> Result<NativeSlice, ArchiveError> {
        let proxy = c_string("proxy", transport.proxy())?;
        let passwd = c_string("passwd", transport.passwd().expose_secret().as_str())?;
        let slice = self.new_slice()?;

        // SAFETY: all pointers are live for the duration of the call.
        let code = unsafe {
            (self.api.get_chat_data)(
                self.sdk,
                cursor,
                limit,
                proxy.as_ptr(),
                passwd.as_ptr(),
                transport.timeout_secs(),
                slice.ptr,
            )
        };
        check(code)?;
        Ok(slice)
    }

    fn fetch_media_chunk(
        &self,
        cursor: &MediaCursor,
        file_id: &str,
        transport: &Transport,
    ) -> Result<NativeChunk, ArchiveError> {
        let index = c_string("media cursor", cursor.as_bytes())?;
        let file_id = c_string("file id", file_id)?;
        let proxy = c_string("proxy", transport.proxy())?;
        let passwd = c_string("passwd", transport.passwd().expose_secret().as_str())?;
        let chunk = self.new_media_data()?;

        // SAFETY: all pointers are live for the duration of the call.
        let code = unsafe {
            (self.api.get_media_data)(
                self.sdk,
                index.as_ptr(),
                file_id.as_ptr(),
                proxy.as_ptr(),
                passwd.as_ptr(),
                transport.timeout_secs(),
                chunk.ptr,
            )
        };
        check(code)?;
        Ok(chunk)
    }

    fn decrypt_payload(
        &self,
        key: &RecoveredKey,
        encrypted: &str,
    ) -> Result<NativeSlice, ArchiveError> {
        let key = c_string("symmetric key", key.expose_secret().as_slice())?;
        let encrypted = c_string("payload", encrypted)?;
        let slice = self.new_slice()?;

        // SAFETY: both strings are NUL-terminated; `slice.ptr` is a live slice.
        let code = unsafe { (self.api.decrypt_data)(key.as_ptr(), encrypted.as_ptr(), slice.ptr) };
        check(code)?;
        Ok(slice)
    }
}

/// An SDK `Slice_t`, freed on drop.
pub struct NativeSlice {
    api: Rc<SdkApi>,
    ptr: *mut c_void,
}

impl SliceBuffer for NativeSlice {
    fn content(&self) -> &[u8] {
        // SAFETY: the slice owns `len` bytes at the content pointer until FreeSlice.
        unsafe {
            let len = (self.api.get_slice_len)(self.ptr);
            bytes_at((self.api.get_content_from_slice)(self.ptr), len)
        }
    }
}

impl Drop for NativeSlice {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from NewSlice and is freed only here.
        unsafe { (self.api.free_slice)(self.ptr) };
    }
}

/// An SDK `MediaData_t`, freed on drop.
pub struct NativeChunk {
    api: Rc<SdkApi>,
    ptr: *mut c_void,
}

impl ChunkBuffer for NativeChunk {
    fn data(&self) -> &[u8] {
        // SAFETY: the media buffer owns `GetDataLen` bytes at `GetData` until FreeMediaData.
        unsafe {
            let len = (self.api.get_data_len)(self.ptr);
            bytes_at((self.api.get_data)(self.ptr), len)
        }
    }

    fn continuation_token(&self) -> &[u8] {
        // SAFETY: as above, for the out-index buffer.
        unsafe {
            let len = (self.api.get_index_len)(self.ptr);
            bytes_at((self.api.get_out_index_buf)(self.ptr), len)
        }
    }

    fn is_final(&self) -> bool {
        // SAFETY: `ptr` is live until drop.
        unsafe { (self.api.is_media_data_finish)(self.ptr) != 0 }
    }
}

impl Drop for NativeChunk {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from NewMediaData and is freed only here.
        unsafe { (self.api.free_media_data)(self.ptr) };
    }
}

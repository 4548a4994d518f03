// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

use std::{ffi, fmt, num::NonZeroUsize};

use crate::{error::Error, Result};

/// Which platform family a backend speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
	/// `LoadLibraryExW` / `GetProcAddress` / `FreeLibrary`.
	Windows,
	/// `dlopen` / `dlsym` / `dlclose`.
	Unix,
}

impl BackendKind {
	/// Maps an OS family name, as reported by [`std::env::consts::FAMILY`], to a backend.
	///
	/// Anything that is not `"windows"` is served by the unix backend.
	#[inline]
	pub fn for_family(family: &str) -> Self {
		if family.eq_ignore_ascii_case("windows") {
			Self::Windows
		} else {
			Self::Unix
		}
	}

	#[inline]
	pub fn host() -> Self {
		Self::for_family(std::env::consts::FAMILY)
	}

	/// Whether `code` means success under this platform's unload convention.
	///
	/// `FreeLibrary` returns non-zero on success, `dlclose` returns zero.
	#[inline]
	pub const fn is_success_code(self, code: i32) -> bool {
		match self {
			Self::Windows => code != 0,
			Self::Unix => code == 0,
		}
	}
}

impl fmt::Display for BackendKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Windows => "windows",
			Self::Unix => "unix",
		})
	}
}

/// An opaque handle to a loaded native library.
///
/// The handle is never zero. It is valid until passed to
/// [`free_library`](crate::free_library); the loader does not track its
/// lifetime beyond that, so keeping raw copies alive past the free is the
/// caller's responsibility.
#[derive(Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Handle(NonZeroUsize);

impl Handle {
	#[inline]
	pub(crate) fn from_ptr(ptr: *mut ffi::c_void) -> Option<Self> {
		NonZeroUsize::new(ptr as usize).map(Self)
	}

	#[inline]
	pub(crate) fn as_ptr(&self) -> *mut ffi::c_void {
		self.0.get() as *mut ffi::c_void
	}

	/// Returns the raw platform value (`HMODULE` or the `dlopen` result).
	#[inline]
	pub fn as_raw(&self) -> usize {
		self.0.get()
	}

	/// Consumes the handle without releasing the library.
	#[inline]
	pub fn into_raw(self) -> usize {
		self.0.get()
	}

	/// Rebuilds a handle from a raw platform value. Returns `None` for zero.
	///
	/// # Safety
	/// `raw` must have come from a successful load and must not have been freed.
	#[inline]
	pub unsafe fn from_raw(raw: usize) -> Option<Self> {
		NonZeroUsize::new(raw).map(Self)
	}
}

impl fmt::Display for Handle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.0)
	}
}

/// The address of an exported symbol.
///
/// Valid for at least as long as the library it was resolved from stays loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Address(NonZeroUsize);

impl Address {
	#[inline]
	pub(crate) fn from_ptr(ptr: *const ffi::c_void) -> Option<Self> {
		NonZeroUsize::new(ptr as usize).map(Self)
	}

	/// Wraps a raw address. Returns `None` for zero.
	#[inline]
	pub fn from_raw(raw: usize) -> Option<Self> {
		NonZeroUsize::new(raw).map(Self)
	}

	#[inline]
	pub fn as_raw(self) -> usize {
		self.0.get()
	}

	/// Casts the address to a pointer. Transmuting it into a function pointer
	/// of the right signature is up to the caller.
	#[inline]
	pub fn as_ptr<T>(self) -> *const T {
		self.0.get() as *const T
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.0)
	}
}

/// Outcome of releasing a library, in the platform's own convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
	code: i32,
	kind: BackendKind,
	handle: usize,
	reason: Option<String>,
}

impl Status {
	pub fn new(kind: BackendKind, handle: usize, code: i32, reason: Option<String>) -> Self {
		Self {
			code,
			kind,
			handle,
			reason,
		}
	}

	/// The raw value returned by `FreeLibrary` or `dlclose`.
	#[inline]
	pub const fn code(&self) -> i32 {
		self.code
	}

	#[inline]
	pub const fn backend(&self) -> BackendKind {
		self.kind
	}

	#[inline]
	pub const fn is_success(&self) -> bool {
		self.kind.is_success_code(self.code)
	}

	/// The platform's error string, if the unload failed and one was available.
	#[inline]
	pub fn reason(&self) -> Option<&str> {
		self.reason.as_deref()
	}

	/// Turns a failed status into [`Error::Unload`].
	pub fn into_result(self) -> Result<()> {
		if self.is_success() {
			Ok(())
		} else {
			Err(Error::Unload {
				handle: self.handle,
				code: self.code,
				reason: self
					.reason
					.unwrap_or_else(|| "unknown unload error".to_owned()),
			})
		}
	}
}

/// The capability set every platform backend provides.
///
/// # Safety
/// Implementors must return handles and addresses produced by the platform
/// loader, and must never return a zero handle from a successful load.
pub unsafe trait Backend: Send + Sync {
	fn kind(&self) -> BackendKind;

	/// Opens the library `name`, resolving all of its undefined symbols up front
	/// where the platform allows it.
	///
	/// # Safety
	/// Loading runs the library's initialization routines.
	unsafe fn load(&self, name: &str) -> Result<Handle>;

	/// Obtains a handle to the running executable image.
	///
	/// # Safety
	/// See [`Backend::load`].
	unsafe fn load_self(&self) -> Result<Handle>;

	/// Looks up `symbol` in `handle`. `Ok(None)` means the export does not exist;
	/// `Err` is reserved for names that cannot be marshaled.
	///
	/// # Safety
	/// `handle` must still be loaded.
	unsafe fn resolve(&self, handle: &Handle, symbol: &str) -> Result<Option<Address>>;

	/// Releases `handle`, reporting the native status code unchanged.
	///
	/// # Safety
	/// `handle` must still be loaded and no symbol from it may be used afterwards.
	unsafe fn unload(&self, handle: Handle) -> Status;
}

// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
//! The `dlopen` backend.
//!
//! The dlfcn entry points are not called directly. They are taken from one of
//! two shim libraries, since some systems only ship the unversioned development
//! alias and others only the versioned shared object.

use std::{ffi, sync};

use crate::error::{self, Error};
use crate::loader::{Address, Backend, BackendKind, Handle, Status};
use crate::Result;

mod c;

/// The candidate shim library the backend committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShimVariant {
	/// The unversioned alias (`libdl.so`, `libdl.dylib`), probed first.
	Unversioned,
	/// The versioned object (`libdl.so.2`, `libSystem.B.dylib`).
	Versioned,
}

impl ShimVariant {
	#[cfg(not(target_vendor = "apple"))]
	const fn file_name_with_nul(self) -> &'static str {
		match self {
			Self::Unversioned => "libdl.so\0",
			Self::Versioned => "libdl.so.2\0",
		}
	}

	#[cfg(target_vendor = "apple")]
	const fn file_name_with_nul(self) -> &'static str {
		match self {
			Self::Unversioned => "libdl.dylib\0",
			Self::Versioned => "libSystem.B.dylib\0",
		}
	}

	#[inline]
	fn file_name(self) -> &'static [u8] {
		self.file_name_with_nul().as_bytes()
	}

	/// File name of the shim library this variant binds to.
	pub fn library_name(self) -> &'static str {
		self.file_name_with_nul().trim_end_matches('\0')
	}
}

#[derive(Debug)]
struct Shim {
	variant: ShimVariant,
	api: c::DlApi,
}

fn shim() -> &'static Shim {
	static SHIM: sync::OnceLock<Shim> = sync::OnceLock::new();
	SHIM.get_or_init(|| unsafe { probe() })
}

unsafe fn probe() -> Shim {
	probe_from(
		ShimVariant::Unversioned.file_name(),
		ShimVariant::Versioned.file_name(),
	)
}

/// Commits to `unversioned` if it binds and answers its error query,
/// otherwise to `versioned`. Both names are nul terminated.
unsafe fn probe_from(unversioned: &[u8], versioned: &[u8]) -> Shim {
	if let Some(api) = c::DlApi::bind(unversioned) {
		// the probe itself: the error query must be callable
		let _ = (api.dlerror)();
		diag!(info, "Using {} for dynamic loading", display_name(unversioned));
		return Shim {
			variant: ShimVariant::Unversioned,
			api,
		};
	}
	let api = match c::DlApi::bind(versioned) {
		Some(api) => api,
		None => {
			diag!(
				warn,
				"{} could not be bound either, using the loader linked into the process",
				display_name(versioned)
			);
			c::DlApi::linked()
		}
	};
	diag!(info, "Using {} for dynamic loading", display_name(versioned));
	Shim {
		variant: ShimVariant::Versioned,
		api,
	}
}

fn display_name(name: &[u8]) -> std::borrow::Cow<'_, str> {
	String::from_utf8_lossy(name.strip_suffix(&[0]).unwrap_or(name))
}

/// Returns the shim library chosen for this process, probing for it on first use.
///
/// The probe runs once; later calls return the cached choice.
pub fn shim_variant() -> ShimVariant {
	shim().variant
}

// glibc, musl and apple keep the dlerror state thread local
#[cfg(not(any(target_os = "linux", target_os = "android", target_vendor = "apple")))]
#[inline]
fn dylib_guard<'a>() -> sync::MutexGuard<'a, ()> {
	static LOCK: sync::Mutex<()> = sync::Mutex::new(());
	// the guarded state lives in the C library, a poisoned lock protects nothing
	LOCK.lock().unwrap_or_else(sync::PoisonError::into_inner)
}

#[cfg(any(target_os = "linux", target_os = "android", target_vendor = "apple"))]
#[inline(always)]
fn dylib_guard() {}

unsafe fn dylib_open(name: &str, path: *const ffi::c_char) -> Result<Handle> {
	let api = &shim().api;
	let _lock = dylib_guard();
	let _ = (api.dlerror)(); // clear existing errors
	match Handle::from_ptr((api.dlopen)(path, c::RTLD_NOW)) {
		Some(handle) => Ok(handle),
		None => {
			let reason = api
				.last_error()
				.unwrap_or_else(|| "unknown dynamic loader error".to_owned());
			diag!(warn, "Failed to load library: {}, Error: {}", name, reason);
			Err(Error::Load {
				name: name.to_owned(),
				reason,
				source: None,
			})
		}
	}
}

/// The unix backend. All calls go through the shim picked by [`shim_variant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixBackend;

unsafe impl Backend for UnixBackend {
	#[inline]
	fn kind(&self) -> BackendKind {
		BackendKind::Unix
	}

	unsafe fn load(&self, name: &str) -> Result<Handle> {
		let c_str = error::to_c_string(name)?;
		dylib_open(name, c_str.as_ptr())
	}

	unsafe fn load_self(&self) -> Result<Handle> {
		dylib_open("<self>", c::SELF_IMAGE)
	}

	unsafe fn resolve(&self, handle: &Handle, symbol: &str) -> Result<Option<Address>> {
		let c_str = error::to_c_string(symbol)?;
		let api = &shim().api;
		let _lock = dylib_guard();
		let _ = (api.dlerror)(); // clear existing errors
		let addr = Address::from_ptr((api.dlsym)(handle.as_ptr(), c_str.as_ptr()));
		if addr.is_none() {
			match api.last_error() {
				Some(reason) => diag!(debug, "Lookup of {} failed, Error: {}", symbol, reason),
				None => diag!(debug, "Lookup of {} returned null without an error", symbol),
			}
		}
		Ok(addr)
	}

	unsafe fn unload(&self, handle: Handle) -> Status {
		let raw = handle.into_raw();
		let api = &shim().api;
		let _lock = dylib_guard();
		let _ = (api.dlerror)(); // clear existing errors
		let code = (api.dlclose)(raw as *mut ffi::c_void);
		let reason = if code != 0 {
			let reason = api.last_error();
			diag!(
				warn,
				"Failed to free library: {:#x}, Error: {}",
				raw,
				reason.as_deref().unwrap_or("unknown")
			);
			reason
		} else {
			None
		};
		Status::new(BackendKind::Unix, raw, code, reason)
	}
}

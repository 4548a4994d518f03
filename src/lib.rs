// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
//! Run-time loading of native shared libraries through one interface.
//!
//! On first use the crate picks a backend for the host (`LoadLibraryExW` on
//! windows, `dlopen` everywhere else) and forwards every call to it. Results keep
//! the platform's conventions: a missing symbol is `Ok(None)`, and
//! [`free_library`] hands back the native status code.
//!
//! ```no_run
//! let lib = native_loader::load_library("libm.so.6")?;
//! let cos = unsafe { native_loader::get_symbol_address(&lib, "cos")? };
//! if let Some(addr) = cos {
//! 	let cos: extern "C" fn(f64) -> f64 = unsafe { std::mem::transmute(addr.as_ptr::<()>()) };
//! 	assert_eq!(cos(0.0), 1.0);
//! }
//! let status = unsafe { native_loader::free_library(lib) };
//! assert!(status.is_success());
//! # Ok::<(), native_loader::error::Error>(())
//! ```
//!
//! Handles are not reference counted. Freeing consumes the handle, so reusing
//! it afterwards does not compile without going through [`Handle::from_raw`]:
//!
//! ```compile_fail
//! let lib = native_loader::load_library("libm.so.6").unwrap();
//! unsafe { native_loader::free_library(lib) };
//! unsafe { native_loader::free_library(lib) };
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
mod diag;

pub mod error;
pub mod loader;
pub mod os;
pub mod sysinfo;

use std::sync::OnceLock;

pub use loader::{Address, Backend, BackendKind, Handle, Status};
pub use sysinfo::SystemInfo;

/// The result of a loader operation.
pub type Result<T> = std::result::Result<T, error::Error>;

/// Forwards loader operations to one backend, logging each of them.
///
/// Failures are returned exactly as the backend produced them.
#[derive(Clone, Copy)]
pub struct Dispatcher {
	backend: &'static dyn Backend,
}

impl std::fmt::Debug for Dispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dispatcher")
			.field("backend", &self.backend.kind())
			.finish()
	}
}

impl Dispatcher {
	#[inline]
	pub const fn new(backend: &'static dyn Backend) -> Self {
		Self { backend }
	}

	/// The dispatcher for this process. The backend is chosen on the first call
	/// and never changes afterwards.
	pub fn host() -> &'static Self {
		static HOST: OnceLock<Dispatcher> = OnceLock::new();
		HOST.get_or_init(|| {
			let kind = BackendKind::host();
			let backend = os::backend_for(kind).unwrap_or_else(os::native);
			print_system_info();
			diag!(info, "Selected {} backend", backend.kind());
			Self::new(backend)
		})
	}

	#[inline]
	pub fn kind(&self) -> BackendKind {
		self.backend.kind()
	}

	pub fn load_library(&self, name: &str) -> Result<Handle> {
		diag!(info, "Attempting to load library: {}", name);
		let result = unsafe { self.backend.load(name) };
		log_load(name, &result);
		result
	}

	pub fn load_current_process(&self) -> Result<Handle> {
		diag!(info, "Attempting to load the current process image");
		let result = unsafe { self.backend.load_self() };
		log_load("<self>", &result);
		result
	}

	/// # Safety
	/// `handle` must still be loaded.
	pub unsafe fn get_symbol_address(&self, handle: &Handle, name: &str) -> Result<Option<Address>> {
		diag!(debug, "Getting process address for: {} in module: {}", name, handle);
		let result = self.backend.resolve(handle, name);
		match &result {
			Ok(Some(addr)) => diag!(debug, "Successfully got process address for: {}, Address: {}", name, addr),
			Ok(None) => diag!(info, "Failed to get process address for: {}", name),
			Err(e) => diag!(warn, "Exception in GetProcessAddress: {}", e),
		}
		result
	}

	/// # Safety
	/// `handle` must still be loaded, and nothing resolved from it may be used
	/// after this returns.
	pub unsafe fn free_library(&self, handle: Handle) -> Status {
		let raw = handle.as_raw();
		diag!(info, "Freeing library: {:#x}", raw);
		let status = self.backend.unload(handle);
		if status.is_success() {
			diag!(info, "Successfully freed library: {:#x}", raw);
		} else {
			diag!(
				warn,
				"Failed to free library: {:#x}, status {}",
				raw,
				status.code()
			);
		}
		status
	}
}

fn log_load(name: &str, result: &Result<Handle>) {
	match result {
		Ok(handle) => diag!(info, "Successfully loaded library: {}, Handle: {}", name, handle),
		Err(e) => diag!(warn, "Exception in LoadLibrary: {}", e),
	}
}

/// Loads the native library `name`, resolving its symbols immediately.
///
/// `name` is handed to the OS as-is: a bare file name uses the platform's search
/// rules, a path is opened directly.
///
/// On windows only an absolute path uses `LOAD_WITH_ALTERED_SEARCH_PATH`. Bare
/// names and relative paths search the application directory, `System32` and
/// directories added with `AddDllDirectory`; neither `PATH` nor the current
/// directory is searched.
///
/// # Errors
/// [`ErrorKind::LoadFailure`](error::ErrorKind::LoadFailure) with the platform's
/// message when the library cannot be found or linked.
#[inline]
pub fn load_library(name: &str) -> Result<Handle> {
	Dispatcher::host().load_library(name)
}

/// Opens a handle to the running executable. Release it with [`free_library`].
#[inline]
pub fn load_current_process() -> Result<Handle> {
	Dispatcher::host().load_current_process()
}

/// Resolves the export `name` in `handle`.
///
/// A missing export is `Ok(None)`, since probing for optional symbols is
/// expected. `Err` only happens when `name` cannot be passed to the OS.
///
/// # Safety
/// `handle` must not have been freed.
#[inline]
pub unsafe fn get_symbol_address(handle: &Handle, name: &str) -> Result<Option<Address>> {
	Dispatcher::host().get_symbol_address(handle, name)
}

/// Releases `handle` and returns the platform's status, unnormalized.
///
/// On windows non-zero means success, on unix zero does; use
/// [`Status::is_success`] rather than comparing the code.
///
/// # Safety
/// Freeing a handle twice, or using a symbol from it afterwards, is undefined
/// behavior, exactly as with the native API. The loader keeps no reference count.
#[inline]
pub unsafe fn free_library(handle: Handle) -> Status {
	Dispatcher::host().free_library(handle)
}

/// The backend this process dispatches to.
#[inline]
pub fn backend_kind() -> BackendKind {
	Dispatcher::host().kind()
}

/// Logs the OS description, OS architecture, runtime and process architecture.
///
/// The lines go through the `log` facade, so nothing is written unless the host
/// program has installed a logger.
pub fn print_system_info() {
	for line in SystemInfo::current().lines() {
		diag!(info, "{}", line);
	}
}

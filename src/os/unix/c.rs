// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
#![allow(non_camel_case_types)]

use std::{ffi, mem, ptr};

pub use libc::RTLD_NOW;

pub type PFN_dlopen = unsafe extern "C" fn(*const ffi::c_char, ffi::c_int) -> *mut ffi::c_void;
pub type PFN_dlsym = unsafe extern "C" fn(*mut ffi::c_void, *const ffi::c_char) -> *mut ffi::c_void;
pub type PFN_dlclose = unsafe extern "C" fn(*mut ffi::c_void) -> ffi::c_int;
pub type PFN_dlerror = unsafe extern "C" fn() -> *mut ffi::c_char;

/// The dlfcn entry points of one shim library.
#[derive(Debug, Clone, Copy)]
pub struct DlApi {
	pub dlopen: PFN_dlopen,
	pub dlsym: PFN_dlsym,
	pub dlclose: PFN_dlclose,
	pub dlerror: PFN_dlerror,
}

impl DlApi {
	/// The entry points already linked into this process.
	pub fn linked() -> Self {
		Self {
			dlopen: libc::dlopen,
			dlsym: libc::dlsym,
			dlclose: libc::dlclose,
			dlerror: libc::dlerror,
		}
	}

	/// Opens the shim library `name` (nul terminated) and binds its entry points.
	///
	/// The shim stays open for the rest of the process.
	pub unsafe fn bind(name: &[u8]) -> Option<Self> {
		debug_assert_eq!(name.last(), Some(&0));
		let shim = libc::dlopen(name.as_ptr().cast(), libc::RTLD_NOW | libc::RTLD_LOCAL);
		if shim.is_null() {
			// don't leave the failed open behind for the next caller of dlerror
			let _ = libc::dlerror();
			return None;
		}
		let dlopen = lookup(shim, b"dlopen\0")?;
		let dlsym = lookup(shim, b"dlsym\0")?;
		let dlclose = lookup(shim, b"dlclose\0")?;
		let dlerror = lookup(shim, b"dlerror\0")?;
		Some(Self {
			dlopen: mem::transmute::<*mut ffi::c_void, PFN_dlopen>(dlopen),
			dlsym: mem::transmute::<*mut ffi::c_void, PFN_dlsym>(dlsym),
			dlclose: mem::transmute::<*mut ffi::c_void, PFN_dlclose>(dlclose),
			dlerror: mem::transmute::<*mut ffi::c_void, PFN_dlerror>(dlerror),
		})
	}

	/// Takes and copies the pending error string, if there is one.
	pub unsafe fn last_error(&self) -> Option<String> {
		let msg = (self.dlerror)();
		if msg.is_null() {
			None
		} else {
			Some(ffi::CStr::from_ptr(msg).to_string_lossy().into_owned())
		}
	}
}

unsafe fn lookup(shim: *mut ffi::c_void, symbol: &[u8]) -> Option<*mut ffi::c_void> {
	let addr = libc::dlsym(shim, symbol.as_ptr().cast());
	if addr.is_null() {
		let _ = libc::dlerror();
		None
	} else {
		Some(addr)
	}
}

/// `dlopen(NULL, ..)` opens the main program.
pub const SELF_IMAGE: *const ffi::c_char = ptr::null();

// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
//! The `LoadLibraryExW` backend.

use std::os::windows::ffi::OsStrExt;
use std::{ffi, io, mem, path, ptr};

use crate::error::{self, Error};
use crate::loader::{Address, Backend, BackendKind, Handle, Status};
use crate::Result;

pub(crate) mod c;

fn to_wide(path: &ffi::OsStr) -> Result<Vec<u16>> {
	let wide: Vec<u16> = path.encode_wide().chain(std::iter::once(0u16)).collect();
	if wide[..wide.len() - 1].contains(&0) {
		// reuse the CString check so the error carries the same source type
		error::to_c_string(&path.to_string_lossy())?;
	}
	Ok(wide)
}

/// Search flags for `LoadLibraryExW`.
///
/// `LOAD_WITH_ALTERED_SEARCH_PATH` is only defined for absolute paths, where it
/// makes dependencies resolve from the library's own directory. Bare names and
/// relative paths search the default safe directories, never `PATH` or the
/// current directory.
pub(crate) fn search_flags(name: &path::Path) -> c::DWORD {
	if name.is_absolute() {
		c::LOAD_WITH_ALTERED_SEARCH_PATH
	} else {
		c::LOAD_LIBRARY_SEARCH_DEFAULT_DIRS | c::LOAD_LIBRARY_SAFE_CURRENT_DIRS
	}
}

fn load_error(name: &str) -> Error {
	// windows dumps *all* error info into this call.
	let source = io::Error::last_os_error();
	diag!(warn, "Failed to load library: {}, Error: {}", name, source);
	Error::Load {
		name: name.to_owned(),
		reason: source.to_string(),
		source: Some(source),
	}
}

/// The windows backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsBackend;

unsafe impl Backend for WindowsBackend {
	#[inline]
	fn kind(&self) -> BackendKind {
		BackendKind::Windows
	}

	unsafe fn load(&self, name: &str) -> Result<Handle> {
		let os_name = ffi::OsStr::new(name);
		let wide_str = to_wide(os_name)?;
		let flags = search_flags(path::Path::new(os_name));
		let handle = c::LoadLibraryExW(wide_str.as_ptr(), ptr::null_mut(), flags);
		Handle::from_ptr(handle).ok_or_else(|| load_error(name))
	}

	unsafe fn load_self(&self) -> Result<Handle> {
		let mut handle: c::HMODULE = ptr::null_mut();
		// without flags the reference count is incremented, so FreeLibrary stays balanced
		if c::GetModuleHandleExW(0, ptr::null(), &mut handle) == 0 {
			return Err(load_error("<self>"));
		}
		Handle::from_ptr(handle).ok_or_else(|| load_error("<self>"))
	}

	unsafe fn resolve(&self, handle: &Handle, symbol: &str) -> Result<Option<Address>> {
		let c_str = error::to_c_string(symbol)?;
		let addr = Address::from_ptr(c::GetProcAddress(handle.as_ptr(), c_str.as_ptr()));
		if addr.is_none() {
			diag!(debug, "Lookup of {} failed, Error: {}", symbol, io::Error::last_os_error());
		}
		Ok(addr)
	}

	unsafe fn unload(&self, handle: Handle) -> Status {
		let raw = handle.into_raw();
		let code = c::FreeLibrary(raw as c::HMODULE);
		let reason = if code == 0 {
			let err = io::Error::last_os_error();
			diag!(warn, "Failed to free library: {:#x}, Error: {}", raw, err);
			Some(err.to_string())
		} else {
			None
		};
		Status::new(BackendKind::Windows, raw, code, reason)
	}
}

/// `Microsoft Windows <major>.<minor>.<build>`, straight from the kernel.
pub(crate) fn os_description() -> String {
	let mut info: c::OSVERSIONINFOW = unsafe { mem::zeroed() };
	info.dwOSVersionInfoSize = mem::size_of::<c::OSVERSIONINFOW>() as c::DWORD;
	if unsafe { c::RtlGetVersion(&mut info) } == 0 {
		format!(
			"Microsoft Windows {}.{}.{}",
			info.dwMajorVersion, info.dwMinorVersion, info.dwBuildNumber
		)
	} else {
		"Microsoft Windows".to_owned()
	}
}

/// Architecture of the machine, which differs from the process under emulation.
pub(crate) fn os_architecture() -> String {
	let mut info: c::SYSTEM_INFO = unsafe { mem::zeroed() };
	unsafe { c::GetNativeSystemInfo(&mut info) };
	match info.wProcessorArchitecture {
		c::PROCESSOR_ARCHITECTURE_AMD64 => "x86_64".to_owned(),
		c::PROCESSOR_ARCHITECTURE_INTEL => "x86".to_owned(),
		c::PROCESSOR_ARCHITECTURE_ARM64 => "aarch64".to_owned(),
		c::PROCESSOR_ARCHITECTURE_ARM => "arm".to_owned(),
		c::PROCESSOR_ARCHITECTURE_IA64 => "ia64".to_owned(),
		other => format!("unknown ({other})"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn altered_search_path_only_for_absolute_paths() {
		assert_eq!(
			search_flags(path::Path::new(r"C:\Windows\System32\kernel32.dll")),
			c::LOAD_WITH_ALTERED_SEARCH_PATH
		);
		assert_eq!(
			search_flags(path::Path::new("kernel32.dll")),
			c::LOAD_LIBRARY_SEARCH_DEFAULT_DIRS | c::LOAD_LIBRARY_SAFE_CURRENT_DIRS
		);
		assert_eq!(
			search_flags(path::Path::new(r"plugins\foo.dll")),
			c::LOAD_LIBRARY_SEARCH_DEFAULT_DIRS | c::LOAD_LIBRARY_SAFE_CURRENT_DIRS
		);
	}

	#[test]
	fn interior_nul_is_rejected() {
		let err = to_wide(ffi::OsStr::new("kernel\u{0}32.dll")).unwrap_err();
		assert_eq!(err.kind(), crate::error::ErrorKind::Native);
	}
}

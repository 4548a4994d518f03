#![cfg(windows)]

use native_loader::os::windows::WindowsBackend;
use native_loader::*;

#[test]
fn test_kernel32_last_error() {
	let lib = load_library("Kernel32.dll").unwrap();
	let set = unsafe { get_symbol_address(&lib, "SetLastError") }.unwrap().unwrap();
	let get = unsafe { get_symbol_address(&lib, "GetLastError") }.unwrap().unwrap();
	let set_last_error: extern "system" fn(u32) = unsafe { std::mem::transmute(set.as_ptr::<()>()) };
	let get_last_error: extern "system" fn() -> u32 = unsafe { std::mem::transmute(get.as_ptr::<()>()) };
	set_last_error(53);
	assert_eq!(get_last_error(), 53);

	let status = unsafe { free_library(lib) };
	// FreeLibrary reports success as non-zero
	assert_ne!(status.code(), 0);
	assert!(status.is_success());
}

#[test]
fn test_missing_library_reports_last_error() {
	let err = unsafe { WindowsBackend.load("definitely_missing_lib_xyz") }.unwrap_err();
	let source = std::error::Error::source(&err)
		.and_then(|e| e.downcast_ref::<std::io::Error>())
		.unwrap();
	// ERROR_MOD_NOT_FOUND
	assert_eq!(source.raw_os_error(), Some(126));
}

#[test]
fn test_absolute_path() {
	let system_root = std::env::var("SystemRoot").unwrap_or_else(|_| r"C:\Windows".to_owned());
	let path = format!(r"{system_root}\System32\kernel32.dll");
	let lib = load_library(&path).unwrap();
	assert!(unsafe { free_library(lib) }.is_success());
}

#[test]
fn test_fn_not_found() {
	let lib = load_library("Kernel32.dll").unwrap();
	let missing = unsafe { get_symbol_address(&lib, "foo") }.unwrap();
	assert!(missing.is_none());
	assert!(unsafe { free_library(lib) }.is_success());
}

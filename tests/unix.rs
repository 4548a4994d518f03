#![cfg(unix)]

use native_loader::os::unix::{shim_variant, ShimVariant, UnixBackend};
use native_loader::*;

#[test]
fn test_shim_probe_is_idempotent() {
	let first = shim_variant();
	let second = shim_variant();
	assert_eq!(first, second);
	assert!(matches!(first, ShimVariant::Unversioned | ShimVariant::Versioned));
	println!("shim: {:?} ({})", first, first.library_name());
}

#[test]
fn test_shim_probe_across_threads() {
	let here = shim_variant();
	let there = std::thread::spawn(shim_variant).join().unwrap();
	assert_eq!(here, there);
}

#[cfg(target_os = "linux")]
#[test]
fn test_shim_names_linux() {
	assert_eq!(ShimVariant::Unversioned.library_name(), "libdl.so");
	assert_eq!(ShimVariant::Versioned.library_name(), "libdl.so.2");
}

#[test]
fn test_failed_load_carries_dlerror() {
	let err = unsafe { UnixBackend.load("definitely_missing_lib_xyz") }.unwrap_err();
	let reason = err.reason().unwrap();
	// dlerror names the file it failed on
	assert!(reason.contains("definitely_missing_lib_xyz"), "{reason}");
}

#[test]
fn test_atoi_from_self() {
	use std::ffi::{c_char, c_int};

	let this = unsafe { UnixBackend.load_self() }.unwrap();
	let addr = unsafe { UnixBackend.resolve(&this, "atoi") }.unwrap().unwrap();
	let atoi: unsafe extern "C" fn(*const c_char) -> c_int = unsafe { std::mem::transmute(addr.as_ptr::<()>()) };
	let five = unsafe { atoi(b"5\0".as_ptr().cast()) };
	assert_eq!(five, 5);

	let status = unsafe { UnixBackend.unload(this) };
	assert_eq!(status.code(), 0);
	assert!(status.reason().is_none());
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[test]
fn test_libm_cos() {
	let lib = load_library("libm.so.6").unwrap();
	let addr = unsafe { get_symbol_address(&lib, "cos") }.unwrap().unwrap();
	let cos: extern "C" fn(f64) -> f64 = unsafe { std::mem::transmute(addr.as_ptr::<()>()) };
	assert_eq!(cos(0.0), 1.0);
	let status = unsafe { free_library(lib) };
	assert_eq!(status.code(), 0);
}

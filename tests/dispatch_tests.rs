use std::sync::atomic::{AtomicUsize, Ordering};

use native_loader::error::{Error, ErrorKind};
use native_loader::*;

// Pretends to be a windows loader so the inverted status convention is visible.
struct MockBackend {
	unloads: AtomicUsize,
}

static MOCK: MockBackend = MockBackend {
	unloads: AtomicUsize::new(0),
};

const GOOD_HANDLE: usize = 0x1000;
const BUSY_HANDLE: usize = 0x2000;
const SYMBOL_ADDR: usize = 0x1040;

unsafe impl Backend for MockBackend {
	fn kind(&self) -> BackendKind {
		BackendKind::Windows
	}

	unsafe fn load(&self, name: &str) -> native_loader::Result<Handle> {
		match name {
			"present.dll" => Ok(Handle::from_raw(GOOD_HANDLE).unwrap()),
			"busy.dll" => Ok(Handle::from_raw(BUSY_HANDLE).unwrap()),
			_ => Err(Error::Load {
				name: name.to_owned(),
				reason: "The specified module could not be found.".to_owned(),
				source: None,
			}),
		}
	}

	unsafe fn load_self(&self) -> native_loader::Result<Handle> {
		Ok(Handle::from_raw(GOOD_HANDLE).unwrap())
	}

	unsafe fn resolve(&self, _handle: &Handle, symbol: &str) -> native_loader::Result<Option<Address>> {
		Ok(match symbol {
			"present" => Address::from_raw(SYMBOL_ADDR),
			_ => None,
		})
	}

	unsafe fn unload(&self, handle: Handle) -> Status {
		self.unloads.fetch_add(1, Ordering::SeqCst);
		let raw = handle.into_raw();
		if raw == BUSY_HANDLE {
			Status::new(BackendKind::Windows, raw, 0, Some("Access is denied.".to_owned()))
		} else {
			Status::new(BackendKind::Windows, raw, 1, None)
		}
	}
}

fn dispatcher() -> Dispatcher {
	Dispatcher::new(&MOCK)
}

#[test]
fn test_load_failure_is_returned_unchanged() {
	let err = dispatcher().load_library("absent.dll").unwrap_err();
	assert_eq!(err.kind(), ErrorKind::LoadFailure);
	match err {
		Error::Load { name, reason, source } => {
			assert_eq!(name, "absent.dll");
			assert_eq!(reason, "The specified module could not be found.");
			assert!(source.is_none());
		}
		other => panic!("unexpected error: {other}"),
	}
}

#[test]
fn test_load_success_passes_handle_through() {
	let d = dispatcher();
	assert_eq!(d.kind(), BackendKind::Windows);
	let lib = d.load_library("present.dll").unwrap();
	assert_eq!(lib.as_raw(), GOOD_HANDLE);
	assert!(unsafe { d.free_library(lib) }.is_success());
}

#[test]
fn test_missing_symbol_is_none() {
	let d = dispatcher();
	let lib = d.load_current_process().unwrap();
	assert!(unsafe { d.get_symbol_address(&lib, "absent") }.unwrap().is_none());
	let addr = unsafe { d.get_symbol_address(&lib, "present") }.unwrap().unwrap();
	assert_eq!(addr.as_raw(), SYMBOL_ADDR);
	let _ = unsafe { d.free_library(lib) };
}

#[test]
fn test_status_convention_is_preserved() {
	let d = dispatcher();
	let before = MOCK.unloads.load(Ordering::SeqCst);

	let busy = d.load_library("busy.dll").unwrap();
	let status = unsafe { d.free_library(busy) };
	// the windows convention: zero is a failure
	assert_eq!(status.code(), 0);
	assert!(!status.is_success());
	assert_eq!(status.reason(), Some("Access is denied."));
	let err = status.into_result().unwrap_err();
	assert_eq!(err.kind(), ErrorKind::UnloadFailure);
	assert!(err.to_string().contains("0x2000"));

	assert!(MOCK.unloads.load(Ordering::SeqCst) > before);
}

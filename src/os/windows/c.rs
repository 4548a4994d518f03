// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
#![allow(clippy::upper_case_acronyms)]
#![allow(non_snake_case)]
#![allow(non_camel_case_types)]

use std::ffi;
pub use std::os::windows::raw::HANDLE;

pub type HMODULE = HANDLE;
pub type PCWSTR = *const u16;
pub type PCSTR = *const ffi::c_char;
pub type BOOL = i32;
pub type DWORD = u32;
pub type WORD = u16;
pub type NTSTATUS = i32;

pub const LOAD_WITH_ALTERED_SEARCH_PATH: DWORD = 0x00000008u32;
pub const LOAD_LIBRARY_SEARCH_DEFAULT_DIRS: DWORD = 0x00001000u32;
pub const LOAD_LIBRARY_SAFE_CURRENT_DIRS: DWORD = 0x00002000u32;

pub const PROCESSOR_ARCHITECTURE_INTEL: WORD = 0;
pub const PROCESSOR_ARCHITECTURE_ARM: WORD = 5;
pub const PROCESSOR_ARCHITECTURE_IA64: WORD = 6;
pub const PROCESSOR_ARCHITECTURE_AMD64: WORD = 9;
pub const PROCESSOR_ARCHITECTURE_ARM64: WORD = 12;

#[repr(C)]
pub struct OSVERSIONINFOW {
	pub dwOSVersionInfoSize: DWORD,
	pub dwMajorVersion: DWORD,
	pub dwMinorVersion: DWORD,
	pub dwBuildNumber: DWORD,
	pub dwPlatformId: DWORD,
	pub szCSDVersion: [u16; 128],
}

#[repr(C)]
pub struct SYSTEM_INFO {
	pub wProcessorArchitecture: WORD,
	pub wReserved: WORD,
	pub dwPageSize: DWORD,
	pub lpMinimumApplicationAddress: *mut ffi::c_void,
	pub lpMaximumApplicationAddress: *mut ffi::c_void,
	pub dwActiveProcessorMask: usize,
	pub dwNumberOfProcessors: DWORD,
	pub dwProcessorType: DWORD,
	pub dwAllocationGranularity: DWORD,
	pub wProcessorLevel: WORD,
	pub wProcessorRevision: WORD,
}

#[link(name = "kernel32")]
extern "system" {
	pub fn LoadLibraryExW(lplibfilename: PCWSTR, hfile: HANDLE, dwflags: DWORD) -> HMODULE;
	pub fn GetModuleHandleExW(dwflags: DWORD, lpmodulename: PCWSTR, phmodule: *mut HMODULE) -> BOOL;
	pub fn GetProcAddress(handle: HMODULE, symbol: PCSTR) -> *const ffi::c_void;
	pub fn FreeLibrary(hlibmodule: HMODULE) -> BOOL;
	pub fn GetNativeSystemInfo(lpsysteminfo: *mut SYSTEM_INFO);
}

#[link(name = "ntdll")]
extern "system" {
	// unlike GetVersionExW this is not subject to manifest based version lies
	pub fn RtlGetVersion(lpversioninformation: *mut OSVERSIONINFOW) -> NTSTATUS;
}

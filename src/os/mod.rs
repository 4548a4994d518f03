// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
#[cfg_attr(docsrs, doc(cfg(unix)))]
#[cfg(unix)]
pub mod unix;
#[cfg_attr(docsrs, doc(cfg(windows)))]
#[cfg(windows)]
pub mod windows;

#[cfg(not(any(unix, windows)))]
compile_error!("native_loader only supports unix and windows targets");

use crate::loader::{Backend, BackendKind};

/// Returns the backend compiled for `kind`, if this target provides one.
pub(crate) fn backend_for(kind: BackendKind) -> Option<&'static dyn Backend> {
	match kind {
		#[cfg(windows)]
		BackendKind::Windows => Some(&windows::WindowsBackend),
		#[cfg(unix)]
		BackendKind::Unix => Some(&unix::UnixBackend),
		#[allow(unreachable_patterns)]
		_ => None,
	}
}

/// The backend compiled for this target.
#[inline]
pub(crate) fn native() -> &'static dyn Backend {
	#[cfg(windows)]
	{
		&windows::WindowsBackend
	}
	#[cfg(unix)]
	{
		&unix::UnixBackend
	}
}

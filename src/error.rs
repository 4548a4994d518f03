// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

use std::{backtrace::Backtrace, ffi, io};

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// The library could not be found, opened, or linked.
	LoadFailure,
	/// Releasing a handle failed per the platform's status convention.
	UnloadFailure,
	/// A value could not be marshaled to the native layer.
	Native,
}

/// Errors surfaced by the loader.
///
/// A missing symbol is not an error; see [`get_symbol_address`](crate::get_symbol_address).
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("failed to load library `{name}`: {reason}")]
	Load {
		name: String,
		reason: String,
		#[source]
		source: Option<io::Error>,
	},
	#[error("failed to free library {handle:#x} (status {code}): {reason}")]
	Unload {
		handle: usize,
		code: i32,
		reason: String,
	},
	#[error("`{name}` cannot be passed to the native loader")]
	InvalidName {
		name: String,
		#[source]
		source: ffi::NulError,
	},
}

impl Error {
	#[inline]
	pub const fn kind(&self) -> ErrorKind {
		match self {
			Self::Load { .. } => ErrorKind::LoadFailure,
			Self::Unload { .. } => ErrorKind::UnloadFailure,
			Self::InvalidName { .. } => ErrorKind::Native,
		}
	}

	/// The platform's own explanation, when one was reported.
	pub fn reason(&self) -> Option<&str> {
		match self {
			Self::Load { reason, .. } | Self::Unload { reason, .. } => Some(reason),
			Self::InvalidName { .. } => None,
		}
	}
}

/// Converts `name` into a C string, logging the failure with its call stack.
pub(crate) fn to_c_string(name: &str) -> crate::Result<ffi::CString> {
	ffi::CString::new(name).map_err(|source| {
		let err = Error::InvalidName {
			name: name.to_owned(),
			source,
		};
		diag!(error, "Exception while marshaling `{}`: {}", name.escape_debug(), err);
		diag!(debug, "Stack trace: {}", Backtrace::force_capture());
		err
	})
}

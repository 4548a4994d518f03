// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

/// Target every diagnostic record of this crate is emitted under.
pub(crate) const TARGET: &str = "native_loader";

// Emits `[Native Loader] <message>` through the `log` facade.
macro_rules! diag {
	($lvl:ident, $($arg:tt)+) => {
		::log::$lvl!(
			target: $crate::diag::TARGET,
			"[Native Loader] {}",
			::std::format_args!($($arg)+)
		)
	};
}

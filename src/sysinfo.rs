// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

use std::{env, fmt};

/// Facts about the host, gathered for startup diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
	pub os_description: String,
	pub os_architecture: String,
	pub runtime_description: String,
	pub process_architecture: &'static str,
}

impl SystemInfo {
	pub fn current() -> Self {
		Self {
			os_description: os_description(),
			os_architecture: os_architecture(),
			runtime_description: runtime_description(),
			process_architecture: env::consts::ARCH,
		}
	}

	/// The four lines written by [`print_system_info`](crate::print_system_info).
	pub fn lines(&self) -> [String; 4] {
		[
			format!("OS Description: {}", self.os_description),
			format!("OS Architecture: {}", self.os_architecture),
			format!("Runtime Description: {}", self.runtime_description),
			format!("Process Architecture: {}", self.process_architecture),
		]
	}
}

impl fmt::Display for SystemInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for line in self.lines() {
			writeln!(f, "{line}")?;
		}
		Ok(())
	}
}

fn runtime_description() -> String {
	format!(
		"{} {} ({}, {} build)",
		env!("CARGO_PKG_NAME"),
		env!("CARGO_PKG_VERSION"),
		env::consts::OS,
		if cfg!(debug_assertions) { "debug" } else { "release" }
	)
}

#[cfg(unix)]
fn uname() -> Option<libc::utsname> {
	let mut buf: libc::utsname = unsafe { std::mem::zeroed() };
	if unsafe { libc::uname(&mut buf) } == 0 {
		Some(buf)
	} else {
		None
	}
}

#[cfg(unix)]
fn field(raw: &[libc::c_char]) -> String {
	// uname fields are nul terminated inside fixed size arrays
	let bytes: Vec<u8> = raw.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
	String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(unix)]
fn os_description() -> String {
	match uname() {
		Some(uts) => format!(
			"{} {} {}",
			field(&uts.sysname),
			field(&uts.release),
			field(&uts.version)
		),
		None => env::consts::OS.to_owned(),
	}
}

#[cfg(unix)]
fn os_architecture() -> String {
	match uname() {
		Some(uts) => field(&uts.machine),
		None => env::consts::ARCH.to_owned(),
	}
}

#[cfg(windows)]
fn os_description() -> String {
	crate::os::windows::os_description()
}

#[cfg(windows)]
fn os_architecture() -> String {
	crate::os::windows::os_architecture()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lines_are_labelled() {
		let info = SystemInfo::current();
		let lines = info.lines();
		assert!(lines[0].starts_with("OS Description: "));
		assert!(lines[1].starts_with("OS Architecture: "));
		assert!(lines[2].starts_with("Runtime Description: "));
		assert_eq!(lines[3], format!("Process Architecture: {}", env::consts::ARCH));
		assert!(!info.os_description.is_empty());
		assert!(!info.os_architecture.is_empty());
	}
}

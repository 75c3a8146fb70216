//! Pure POSIX path algebra
//!
//! [`PosixPath`] never touches a filesystem. It is the backend-independent
//! half of every bound path: splitting, joining, naming and comparison all
//! happen here, and the backends only add I/O on top.

use std::fmt;
use std::ops::Div;
use std::str::FromStr;

use crate::error::{PathError, PathResult};
use crate::glob;

/// A normalized POSIX path: an optional root and a list of non-empty segments
///
/// Repeated slashes collapse and `.` segments are dropped. `..` is kept as a
/// literal segment, since resolving it would require knowing about symlinks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PosixPath {
	absolute: bool,
	segments: Vec<String>,
}

impl PosixPath {
	/// Parse a path string
	pub fn new(path: &str) -> Self {
		let absolute = path.starts_with('/');
		let segments = split_segments(path).map(str::to_string).collect();
		Self { absolute, segments }
	}

	/// The filesystem root, `/`
	pub fn root() -> Self {
		Self { absolute: true, segments: Vec::new() }
	}

	/// Build a path from a root flag and already-split segments
	///
	/// Segments are re-split so a segment containing `/` cannot break the
	/// no-empty-segment invariant.
	pub fn from_segments<I, S>(absolute: bool, segments: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut path = Self { absolute, segments: Vec::new() };
		for segment in segments {
			path.segments.extend(split_segments(segment.as_ref()).map(str::to_string));
		}
		path
	}

	pub fn is_absolute(&self) -> bool {
		self.absolute
	}

	/// True for `/`
	pub fn is_root(&self) -> bool {
		self.absolute && self.segments.is_empty()
	}

	/// The normalized segments, without the root marker
	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	/// Path components, with `/` as the first component of an absolute path
	pub fn parts(&self) -> Vec<&str> {
		let mut parts = Vec::with_capacity(self.segments.len() + 1);
		if self.absolute {
			parts.push("/");
		}
		parts.extend(self.segments.iter().map(String::as_str));
		parts
	}

	/// Join another path onto this one
	///
	/// An absolute `other` replaces the current path entirely.
	pub fn join(&self, other: &str) -> Self {
		if other.starts_with('/') {
			return Self::new(other);
		}
		let mut joined = self.clone();
		joined.segments.extend(split_segments(other).map(str::to_string));
		joined
	}

	/// Join several paths in turn, as repeated [`join`](Self::join)
	pub fn joinpath<I, S>(&self, others: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		others.into_iter().fold(self.clone(), |acc, other| acc.join(other.as_ref()))
	}

	/// The logical parent; the root and the empty relative path are their own parents
	pub fn parent(&self) -> Self {
		let mut parent = self.clone();
		parent.segments.pop();
		parent
	}

	/// All logical ancestors, nearest first
	pub fn parents(&self) -> Vec<Self> {
		let mut parents = Vec::with_capacity(self.segments.len());
		let mut current = self.clone();
		while !current.segments.is_empty() {
			current = current.parent();
			parents.push(current.clone());
		}
		parents
	}

	/// The final segment, or an empty string for the root
	pub fn name(&self) -> &str {
		self.segments.last().map(String::as_str).unwrap_or("")
	}

	/// The final segment's last suffix including the leading `.`, or an empty string
	pub fn suffix(&self) -> &str {
		let name = self.name();
		match suffix_start(name) {
			Some(i) => &name[i..],
			None => "",
		}
	}

	/// All suffixes of the final segment
	pub fn suffixes(&self) -> Vec<String> {
		let name = self.name();
		if name.ends_with('.') {
			return Vec::new();
		}
		name.trim_start_matches('.').split('.').skip(1).map(|s| format!(".{}", s)).collect()
	}

	/// The final segment without its last suffix
	pub fn stem(&self) -> &str {
		let name = self.name();
		match suffix_start(name) {
			Some(i) => &name[..i],
			None => name,
		}
	}

	/// Replace the final segment
	pub fn with_name(&self, name: &str) -> PathResult<Self> {
		if self.segments.is_empty() {
			return Err(PathError::invalid_argument("with_name", self.to_string(), "path has an empty name"));
		}
		if name.is_empty() || name == "." || name.contains('/') {
			return Err(PathError::invalid_argument(
				"with_name",
				self.to_string(),
				format!("invalid name {:?}", name),
			));
		}
		let mut renamed = self.clone();
		if let Some(last) = renamed.segments.last_mut() {
			*last = name.to_string();
		}
		Ok(renamed)
	}

	/// Replace (or remove, with an empty string) the last suffix
	pub fn with_suffix(&self, suffix: &str) -> PathResult<Self> {
		if !suffix.is_empty() && (!suffix.starts_with('.') || suffix == "." || suffix.contains('/')) {
			return Err(PathError::invalid_argument(
				"with_suffix",
				self.to_string(),
				format!("invalid suffix {:?}", suffix),
			));
		}
		let name = format!("{}{}", self.stem(), suffix);
		self.with_name(&name)
	}

	/// The path relative to `base`
	///
	/// Fails with `InvalidArgument` when this path does not start with `base`.
	pub fn relative_to(&self, base: &PosixPath) -> PathResult<Self> {
		if !self.is_relative_to(base) {
			return Err(PathError::invalid_argument(
				"relative_to",
				self.to_string(),
				format!("{} is not relative to {}", self, base),
			));
		}
		Ok(Self { absolute: false, segments: self.segments[base.segments.len()..].to_vec() })
	}

	pub fn is_relative_to(&self, base: &PosixPath) -> bool {
		self.absolute == base.absolute && self.segments.starts_with(&base.segments)
	}

	/// Match against a glob-style pattern
	///
	/// A relative pattern matches from the right; an absolute one must match
	/// the whole path. `**` behaves like `*` here.
	pub fn match_pattern(&self, pattern: &str) -> PathResult<bool> {
		if pattern.is_empty() {
			return Err(PathError::invalid_argument("match", self.to_string(), "empty pattern"));
		}
		let pattern_path = PosixPath::new(pattern);
		if pattern_path.segments.is_empty() {
			return Err(PathError::invalid_argument(
				"match",
				self.to_string(),
				format!("invalid pattern {:?}", pattern),
			));
		}
		if pattern_path.absolute {
			if !self.absolute || pattern_path.segments.len() != self.segments.len() {
				return Ok(false);
			}
		} else if pattern_path.segments.len() > self.segments.len() {
			return Ok(false);
		}
		for (segment, pat) in self.segments.iter().rev().zip(pattern_path.segments.iter().rev()) {
			let matcher = glob::SegmentMatcher::compile(pat)
				.map_err(|e| PathError::invalid_argument("match", self.to_string(), e))?;
			if !matcher.is_match(segment) {
				return Ok(false);
			}
		}
		Ok(true)
	}

	/// The string form, identical to `Display`
	pub fn as_posix(&self) -> String {
		self.to_string()
	}
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
	path.split('/').filter(|s| !s.is_empty() && *s != ".")
}

// Index of the last '.' when it starts a real suffix: not a leading dot, not a trailing dot
fn suffix_start(name: &str) -> Option<usize> {
	match name.rfind('.') {
		Some(i) if i > 0 && i < name.len() - 1 => Some(i),
		_ => None,
	}
}

impl fmt::Display for PosixPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.absolute {
			write!(f, "/{}", self.segments.join("/"))
		} else if self.segments.is_empty() {
			f.write_str(".")
		} else {
			f.write_str(&self.segments.join("/"))
		}
	}
}

impl FromStr for PosixPath {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(PosixPath::new(s))
	}
}

impl From<&str> for PosixPath {
	fn from(s: &str) -> Self {
		PosixPath::new(s)
	}
}

impl<S: AsRef<str>> Div<S> for &PosixPath {
	type Output = PosixPath;

	fn div(self, rhs: S) -> PosixPath {
		self.join(rhs.as_ref())
	}
}

impl<S: AsRef<str>> Div<S> for PosixPath {
	type Output = PosixPath;

	fn div(self, rhs: S) -> PosixPath {
		self.join(rhs.as_ref())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorKind;

	#[test]
	fn test_parse_normalizes() {
		let p = PosixPath::new("//etc/./ssh//sshd_config/");
		assert!(p.is_absolute());
		assert_eq!(p.segments(), &["etc", "ssh", "sshd_config"]);
		assert_eq!(p.to_string(), "/etc/ssh/sshd_config");
		assert_eq!(PosixPath::new("").to_string(), ".");
		assert_eq!(PosixPath::new("/").to_string(), "/");
		assert_eq!(PosixPath::new("a/../b").segments(), &["a", "..", "b"]);
	}

	#[test]
	fn test_join_and_div() {
		let base = PosixPath::new("/srv");
		assert_eq!((&base / "app/config.yaml").to_string(), "/srv/app/config.yaml");
		assert_eq!(base.join("/etc").to_string(), "/etc");
		assert_eq!(base.joinpath(["a", "b", "/x", "y"]).to_string(), "/x/y");
	}

	#[test]
	fn test_parent_and_parents() {
		let p = PosixPath::new("/a/b/c");
		assert_eq!(p.parent().to_string(), "/a/b");
		assert_eq!(PosixPath::root().parent(), PosixPath::root());
		let parents: Vec<String> = p.parents().iter().map(|p| p.to_string()).collect();
		assert_eq!(parents, vec!["/a/b", "/a", "/"]);
		let rel: Vec<String> = PosixPath::new("x/y").parents().iter().map(|p| p.to_string()).collect();
		assert_eq!(rel, vec!["x", "."]);
	}

	#[test]
	fn test_name_suffix_stem() {
		let p = PosixPath::new("/tmp/archive.tar.gz");
		assert_eq!(p.name(), "archive.tar.gz");
		assert_eq!(p.suffix(), ".gz");
		assert_eq!(p.suffixes(), vec![".tar", ".gz"]);
		assert_eq!(p.stem(), "archive.tar");

		let hidden = PosixPath::new("/home/u/.bashrc");
		assert_eq!(hidden.suffix(), "");
		assert_eq!(hidden.stem(), ".bashrc");
		assert!(hidden.suffixes().is_empty());

		let trailing = PosixPath::new("/x/name.");
		assert_eq!(trailing.suffix(), "");
		assert!(trailing.suffixes().is_empty());
		assert_eq!(PosixPath::root().name(), "");
	}

	#[test]
	fn test_with_name_and_suffix() {
		let p = PosixPath::new("/etc/app.conf");
		assert_eq!(p.with_name("other.ini").unwrap().to_string(), "/etc/other.ini");
		assert_eq!(p.with_suffix(".yaml").unwrap().to_string(), "/etc/app.yaml");
		assert_eq!(p.with_suffix("").unwrap().to_string(), "/etc/app");
		assert_eq!(PosixPath::new("/etc/app").with_suffix(".d").unwrap().to_string(), "/etc/app.d");

		assert_eq!(p.with_suffix("yaml").unwrap_err().kind(), ErrorKind::InvalidArgument);
		assert_eq!(p.with_suffix(".").unwrap_err().kind(), ErrorKind::InvalidArgument);
		assert_eq!(p.with_name("").unwrap_err().kind(), ErrorKind::InvalidArgument);
		assert_eq!(p.with_name("a/b").unwrap_err().kind(), ErrorKind::InvalidArgument);
		assert_eq!(PosixPath::root().with_name("x").unwrap_err().kind(), ErrorKind::InvalidArgument);
	}

	#[test]
	fn test_relative_to() {
		let p = PosixPath::new("/var/lib/app/data");
		let rel = p.relative_to(&PosixPath::new("/var/lib")).unwrap();
		assert_eq!(rel.to_string(), "app/data");
		assert!(!rel.is_absolute());
		assert_eq!(p.relative_to(&p).unwrap().to_string(), ".");

		let err = p.relative_to(&PosixPath::new("/var/log")).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::InvalidArgument);
		assert!(p.relative_to(&PosixPath::new("var")).is_err());
	}

	#[test]
	fn test_ordering_is_by_segments() {
		let mut paths = vec![PosixPath::new("/b"), PosixPath::new("/a/z"), PosixPath::new("/a")];
		paths.sort();
		let sorted: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
		assert_eq!(sorted, vec!["/a", "/a/z", "/b"]);
		assert_eq!(PosixPath::new("/a//b"), PosixPath::new("/a/b/"));
	}

	#[test]
	fn test_match_pattern() {
		let p = PosixPath::new("/a/b/c.py");
		assert!(p.match_pattern("*.py").unwrap());
		assert!(p.match_pattern("b/*.py").unwrap());
		assert!(!p.match_pattern("a/*.py").unwrap());
		assert!(p.match_pattern("/a/*/*.py").unwrap());
		assert!(!p.match_pattern("/*.py").unwrap());
		assert!(!p.match_pattern("*.PY").unwrap());
		assert!(p.match_pattern("c.[pq]y").unwrap());
		assert_eq!(p.match_pattern("").unwrap_err().kind(), ErrorKind::InvalidArgument);
	}
}

// vim: ts=4

//! Glob pattern compilation and the recursive walk shared by all backends
//!
//! The walk only needs `scandir`, `is_dir` and `exists` from the backend, so
//! one engine serves both the local filesystem and the daemon. Recursion is
//! bounded by depth rather than by tracking visited inodes, since the remote
//! side cannot report inode identity cheaply.

use globset::{GlobBuilder, GlobMatcher};
use std::collections::{HashSet, VecDeque};

use crate::error::{ErrorKind, PathError, PathResult};
use crate::path::PathOps;
use crate::pure::PosixPath;

/// Default maximum directory depth for a glob walk
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Matcher for a single path segment (`*`, `?`, `[...]`)
#[derive(Debug, Clone)]
pub struct SegmentMatcher {
	matcher: GlobMatcher,
}

impl SegmentMatcher {
	pub fn compile(segment: &str) -> Result<Self, String> {
		let glob = GlobBuilder::new(&escape_braces(segment))
			.literal_separator(true)
			.backslash_escape(true)
			.build()
			.map_err(|e| format!("invalid pattern {:?}: {}", segment, e))?;
		Ok(Self { matcher: glob.compile_matcher() })
	}

	pub fn is_match(&self, name: &str) -> bool {
		self.matcher.is_match(name)
	}
}

// Braces are literal in shell-style patterns; globset would treat them as alternation
fn escape_braces(segment: &str) -> String {
	let mut out = String::with_capacity(segment.len());
	let mut in_class = false;
	for c in segment.chars() {
		match c {
			'[' if !in_class => {
				in_class = true;
				out.push(c);
			}
			']' if in_class => {
				in_class = false;
				out.push(c);
			}
			'{' | '}' if !in_class => {
				out.push('[');
				out.push(c);
				out.push(']');
			}
			_ => out.push(c),
		}
	}
	out
}

fn has_wildcard(segment: &str) -> bool {
	segment.contains(['*', '?', '['])
}

#[derive(Debug, Clone)]
enum Segment {
	Literal(String),
	Wildcard(SegmentMatcher),
	Recursive,
}

/// A compiled glob pattern: one matcher per path segment
#[derive(Debug, Clone)]
pub struct Pattern {
	segments: Vec<Segment>,
}

impl Pattern {
	/// Compile a relative glob pattern
	pub fn compile(pattern: &str) -> Result<Self, String> {
		if pattern.is_empty() {
			return Err("empty pattern".to_string());
		}
		if pattern.starts_with('/') {
			return Err(format!("non-relative pattern {:?} is unsupported", pattern));
		}
		let parsed = PosixPath::new(pattern);
		if parsed.segments().is_empty() {
			return Err(format!("unacceptable pattern {:?}", pattern));
		}

		let mut segments = Vec::with_capacity(parsed.segments().len());
		for segment in parsed.segments() {
			if segment == "**" {
				segments.push(Segment::Recursive);
			} else if segment.contains("**") {
				return Err("'**' can only be an entire path component".to_string());
			} else if has_wildcard(segment) {
				segments.push(Segment::Wildcard(SegmentMatcher::compile(segment)?));
			} else {
				segments.push(Segment::Literal(segment.clone()));
			}
		}
		Ok(Self { segments })
	}

	pub fn is_recursive(&self) -> bool {
		self.segments.iter().any(|s| matches!(s, Segment::Recursive))
	}
}

struct Frame<P> {
	dir: P,
	index: usize,
	depth: usize,
}

/// Lazy iterator over the paths matching a pattern below a directory
///
/// Results come out depth-first in the order the backend lists children.
/// After an error the iterator yields nothing more.
pub struct Glob<P: PathOps> {
	pattern: Pattern,
	stack: Vec<Frame<P>>,
	ready: VecDeque<P>,
	seen: HashSet<P>,
	pending_error: Option<PathError>,
	max_depth: usize,
	done: bool,
}

impl<P: PathOps> Glob<P> {
	/// Start a walk at `root`
	///
	/// A missing or non-directory root produces an empty iterator.
	pub fn new(root: &P, pattern: &str, max_depth: usize) -> PathResult<Self> {
		let pattern = Pattern::compile(pattern)
			.map_err(|e| PathError::invalid_argument("glob", root.to_string(), e))?;
		let mut glob = Self {
			pattern,
			stack: Vec::new(),
			ready: VecDeque::new(),
			seen: HashSet::new(),
			pending_error: None,
			max_depth,
			done: false,
		};
		if root.is_dir()? {
			glob.stack.push(Frame { dir: root.clone(), index: 0, depth: 0 });
		}
		Ok(glob)
	}

	fn emit(&mut self, path: P) {
		if self.seen.insert(path.clone()) {
			self.ready.push_back(path);
		}
	}

	fn push_frames(&mut self, frames: Vec<Frame<P>>) {
		// LIFO stack, so reverse to visit in listing order
		self.stack.extend(frames.into_iter().rev());
	}

	fn expand(&mut self, frame: Frame<P>) -> PathResult<()> {
		if frame.depth > self.max_depth {
			return Err(PathError::new(ErrorKind::GlobTooDeep, "glob", frame.dir.to_string())
				.with_message(format!("exceeded maximum depth {}", self.max_depth)));
		}
		let last = frame.index + 1 == self.pattern.segments.len();
		let mut next = Vec::new();

		match self.pattern.segments[frame.index].clone() {
			Segment::Literal(name) => {
				let child = frame.dir.join(&name);
				if last {
					if child.exists()? {
						self.emit(child);
					}
				} else if child.is_dir()? {
					next.push(Frame { dir: child, index: frame.index + 1, depth: frame.depth + 1 });
				}
			}
			Segment::Wildcard(matcher) => {
				for entry in frame.dir.scandir()? {
					let entry = entry?;
					if !matcher.is_match(entry.path.name()) {
						continue;
					}
					if last {
						self.emit(entry.path);
					} else if entry.is_dir()? {
						next.push(Frame { dir: entry.path, index: frame.index + 1, depth: frame.depth + 1 });
					}
				}
			}
			Segment::Recursive => {
				// '**' matching zero segments
				if last {
					self.emit(frame.dir.clone());
				} else {
					next.push(Frame { dir: frame.dir.clone(), index: frame.index + 1, depth: frame.depth });
				}
				for entry in frame.dir.scandir()? {
					let entry = entry?;
					if entry.is_dir()? {
						next.push(Frame { dir: entry.path, index: frame.index, depth: frame.depth + 1 });
					}
				}
			}
		}

		self.push_frames(next);
		Ok(())
	}
}

impl<P: PathOps> Iterator for Glob<P> {
	type Item = PathResult<P>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			if let Some(path) = self.ready.pop_front() {
				return Some(Ok(path));
			}
			if let Some(err) = self.pending_error.take() {
				self.done = true;
				return Some(Err(err));
			}
			if self.done {
				return None;
			}
			let frame = match self.stack.pop() {
				Some(frame) => frame,
				None => {
					self.done = true;
					return None;
				}
			};
			if let Err(err) = self.expand(frame) {
				self.stack.clear();
				self.pending_error = Some(err);
			}
		}
	}
}


// vim: ts=4

//! Glob tests on both backends

mod common;

use std::fs;

use common::{kind_of, TestDaemon, Tree};
use pathops::{ErrorKind, PathOps, PathResult};

fn build_tree(tree: &Tree) {
	fs::create_dir_all(tree.host("a/b")).unwrap();
	fs::write(tree.host("a/b/c.txt"), b"c").unwrap();
	fs::write(tree.host("a/d.txt"), b"d").unwrap();
	fs::write(tree.host("a/e.log"), b"e").unwrap();
	fs::write(tree.host("top.txt"), b"t").unwrap();
}

/// Matches as sorted paths relative to `root`
fn matches<P: PathOps>(root: &P, pattern: &str) -> PathResult<Vec<String>> {
	let mut found = Vec::new();
	for path in root.glob(pattern)? {
		found.push(path?.relative_to(root.posix())?.to_string());
	}
	found.sort();
	Ok(found)
}

fn check_patterns<P: PathOps>(root: &P) {
	assert_eq!(matches(root, "a/**/*.txt").unwrap(), vec!["a/b/c.txt", "a/d.txt"]);
	assert_eq!(matches(root, "a/*.txt").unwrap(), vec!["a/d.txt"]);
	assert_eq!(matches(root, "**/*.txt").unwrap(), vec!["a/b/c.txt", "a/d.txt", "top.txt"]);
	assert_eq!(matches(root, "*/*").unwrap(), vec!["a/b", "a/d.txt", "a/e.log"]);
	assert_eq!(matches(root, "a/**").unwrap(), vec!["a", "a/b"]);
	assert_eq!(matches(root, "a/b/c.txt").unwrap(), vec!["a/b/c.txt"]);
	assert_eq!(matches(root, "a/[de].*").unwrap(), vec!["a/d.txt", "a/e.log"]);
	assert_eq!(matches(root, "a/?.log").unwrap(), vec!["a/e.log"]);
	assert!(matches(root, "missing/*").unwrap().is_empty());
	assert!(matches(root, "a/nothing").unwrap().is_empty());

	for bad in ["", "/a/*", ".", "a**/b", "a/**b"] {
		assert_eq!(kind_of(root.glob(bad).map(|_| ())), ErrorKind::InvalidArgument, "{:?}", bad);
	}

	// Non-directory and missing roots yield nothing
	assert_eq!(root.join("top.txt").glob("*").unwrap().count(), 0);
	assert_eq!(root.join("nope").glob("**").unwrap().count(), 0);
}

fn check_loop<P: PathOps>(root: &P) {
	let results: Vec<PathResult<P>> = root.glob_with_depth("**/*.txt", 6).unwrap().collect();
	let last = results.last().unwrap();
	assert_eq!(last.as_ref().unwrap_err().kind(), ErrorKind::GlobTooDeep);
	assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
}

#[test]
fn test_local_glob() {
	let tree = Tree::new();
	build_tree(&tree);
	check_patterns(&tree.local);
}

#[test]
fn test_remote_glob() {
	let daemon = TestDaemon::start();
	let root = daemon.connect();
	let tree = Tree::new();
	build_tree(&tree);
	check_patterns(&tree.remote(&root));
}

#[test]
fn test_results_identical_across_backends() {
	let daemon = TestDaemon::start();
	let root = daemon.connect();
	let tree = Tree::new();
	build_tree(&tree);
	let remote = tree.remote(&root);
	for pattern in ["**", "**/*", "a/**/*.txt", "*"] {
		assert_eq!(matches(&tree.local, pattern).unwrap(), matches(&remote, pattern).unwrap(), "{}", pattern);
	}
}

#[test]
fn test_no_duplicates_from_repeated_recursion() {
	let tree = Tree::new();
	build_tree(&tree);
	let found = matches(&tree.local, "**/**/*.txt").unwrap();
	assert_eq!(found, vec!["a/b/c.txt", "a/d.txt", "top.txt"]);
}

#[test]
fn test_symlink_loop_is_bounded() {
	let daemon = TestDaemon::start();
	let root = daemon.connect();
	let tree = Tree::new();
	build_tree(&tree);
	std::os::unix::fs::symlink("..", tree.host("a/up")).unwrap();

	check_loop(&tree.local);
	check_loop(&tree.remote(&root));
}

#[test]
fn test_config_depth_bound_applies_to_remote() {
	let daemon = TestDaemon::start();
	let root = pathops::RemoteRoot::connect(daemon.config().with_max_glob_depth(1)).unwrap();
	let tree = Tree::new();
	build_tree(&tree);
	let remote = tree.remote(&root);

	assert_eq!(matches(&remote, "a/*.txt").unwrap(), vec!["a/d.txt"]);
	assert_eq!(kind_of(matches(&remote, "**/*.txt")), ErrorKind::GlobTooDeep);
}


#[test]
fn test_remote_walk_uses_listed_kinds() {
	let daemon = TestDaemon::start();
	let root = daemon.connect();
	let tree = Tree::new();
	fs::create_dir_all(tree.host("many/sub")).unwrap();
	for i in 0..8 {
		fs::write(tree.host(&format!("many/f{}.txt", i)), b"x").unwrap();
	}
	fs::write(tree.host("many/sub/x.txt"), b"x").unwrap();
	let remote = tree.remote(&root);

	daemon.clear_actions();
	assert_eq!(matches(&remote, "many/*/*.txt").unwrap(), vec!["many/sub/x.txt"]);
	// Listed files need no stat of their own
	assert_eq!(daemon.count("list"), 2);
	assert_eq!(daemon.count("stat"), 4);
}

// vim: ts=4

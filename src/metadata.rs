//! File metadata as reported by either backend

use chrono::{DateTime, Utc};
use nix::unistd::{Gid, Group, Uid, User};
use serde::{Deserialize, Serialize};
use std::fs;
use std::os::unix::fs::{FileTypeExt, MetadataExt};

/// Kind of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
	File,
	Directory,
	Symlink,
	Socket,
	NamedPipe,
	Device,
	#[serde(other)]
	Other,
}

impl FileKind {
	pub fn from_std(file_type: &fs::FileType) -> Self {
		if file_type.is_file() {
			FileKind::File
		} else if file_type.is_dir() {
			FileKind::Directory
		} else if file_type.is_symlink() {
			FileKind::Symlink
		} else if file_type.is_socket() {
			FileKind::Socket
		} else if file_type.is_fifo() {
			FileKind::NamedPipe
		} else if file_type.is_block_device() || file_type.is_char_device() {
			FileKind::Device
		} else {
			FileKind::Other
		}
	}
}

/// Metadata of one filesystem entry
///
/// Always produced by a fresh query; nothing here is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
	pub kind: FileKind,
	pub size: u64,
	pub modified: Option<DateTime<Utc>>,
	/// Permission bits, masked to `0o7777`
	pub permissions: u32,
	pub user_id: Option<u32>,
	pub user: Option<String>,
	pub group_id: Option<u32>,
	pub group: Option<String>,
}

impl FileMetadata {
	/// Build from local metadata, resolving owner and group names
	pub fn from_std(meta: &fs::Metadata) -> Self {
		Self {
			kind: FileKind::from_std(&meta.file_type()),
			size: meta.size(),
			modified: DateTime::from_timestamp(meta.mtime(), meta.mtime_nsec() as u32),
			permissions: meta.mode() & 0o7777,
			user_id: Some(meta.uid()),
			user: user_name(meta.uid()),
			group_id: Some(meta.gid()),
			group: group_name(meta.gid()),
		}
	}

	pub fn is_dir(&self) -> bool {
		self.kind == FileKind::Directory
	}

	pub fn is_file(&self) -> bool {
		self.kind == FileKind::File
	}

	pub fn is_symlink(&self) -> bool {
		self.kind == FileKind::Symlink
	}

	/// Owner name, or the numeric id when the id has no name
	pub fn owner_name(&self) -> String {
		name_or_id(&self.user, self.user_id)
	}

	/// Group name, or the numeric id when the id has no name
	pub fn group_name(&self) -> String {
		name_or_id(&self.group, self.group_id)
	}
}

fn name_or_id(name: &Option<String>, id: Option<u32>) -> String {
	match (name, id) {
		(Some(name), _) if !name.is_empty() => name.clone(),
		(_, Some(id)) => id.to_string(),
		_ => String::new(),
	}
}

/// Look up a user name by uid
pub fn user_name(uid: u32) -> Option<String> {
	User::from_uid(Uid::from_raw(uid)).ok().flatten().map(|u| u.name)
}

/// Look up a group name by gid
pub fn group_name(gid: u32) -> Option<String> {
	Group::from_gid(Gid::from_raw(gid)).ok().flatten().map(|g| g.name)
}

/// Resolve a user name to a uid
pub fn lookup_user(name: &str) -> Option<u32> {
	User::from_name(name).ok().flatten().map(|u| u.uid.as_raw())
}

/// Resolve a group name to a gid
pub fn lookup_group(name: &str) -> Option<u32> {
	Group::from_name(name).ok().flatten().map(|g| g.gid.as_raw())
}


// vim: ts=4

//! Wire types for the file-control daemon
//!
//! JSON field names are kebab-case; permissions travel as octal strings
//! (`"644"`) and modification times as RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metadata::{FileKind, FileMetadata};

/// Path of the file API on the daemon
pub const FILES_ENDPOINT: &str = "/v1/files";

/// One entry of a `stat` or `list` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileInfo {
	pub path: String,
	#[serde(default)]
	pub name: String,
	#[serde(rename = "type")]
	pub kind: FileKind,
	#[serde(default)]
	pub size: Option<u64>,
	pub permissions: String,
	#[serde(default)]
	pub last_modified: Option<DateTime<Utc>>,
	#[serde(default)]
	pub user_id: Option<u32>,
	#[serde(default)]
	pub user: Option<String>,
	#[serde(default)]
	pub group_id: Option<u32>,
	#[serde(default)]
	pub group: Option<String>,
}

impl FileInfo {
	/// Convert into backend-neutral metadata
	///
	/// Fails when the permission string is not octal.
	pub fn to_metadata(&self) -> Result<FileMetadata, String> {
		Ok(FileMetadata {
			kind: self.kind,
			size: self.size.unwrap_or(0),
			modified: self.last_modified,
			permissions: parse_permissions(&self.permissions)?,
			user_id: self.user_id,
			user: self.user.clone(),
			group_id: self.group_id,
			group: self.group.clone(),
		})
	}

	/// Describe `meta` as the daemon would for `path`
	pub fn from_metadata(path: &str, meta: &FileMetadata) -> Self {
		let name = match path.rsplit('/').next() {
			Some("") | None => "/".to_string(),
			Some(name) => name.to_string(),
		};
		Self {
			path: path.to_string(),
			name,
			kind: meta.kind,
			size: if meta.is_file() { Some(meta.size) } else { None },
			permissions: format_permissions(meta.permissions),
			last_modified: meta.modified,
			user_id: meta.user_id,
			user: meta.user.clone(),
			group_id: meta.group_id,
			group: meta.group.clone(),
		}
	}
}

/// Response envelope wrapping every JSON reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Envelope {
	#[serde(rename = "type")]
	pub kind: EnvelopeKind,
	pub status_code: u16,
	#[serde(default)]
	pub status: String,
	#[serde(default)]
	pub result: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvelopeKind {
	Sync,
	Error,
}

impl Envelope {
	pub fn sync(result: Value) -> Self {
		Self { kind: EnvelopeKind::Sync, status_code: 200, status: "OK".to_string(), result }
	}

	pub fn error(status_code: u16, kind: Option<&str>, message: impl Into<String>) -> Self {
		let result = ErrorResult { message: message.into(), kind: kind.map(str::to_string) };
		Self {
			kind: EnvelopeKind::Error,
			status_code,
			status: status_text(status_code).to_string(),
			result: serde_json::to_value(result).unwrap_or(Value::Null),
		}
	}
}

/// `result` of an error envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
	#[serde(default)]
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<String>,
}

/// JSON body of `POST /v1/files`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum FilesRequest {
	MakeDirs { dirs: Vec<MakeDirItem> },
	Remove { paths: Vec<RemoveItem> },
	SetPermissions { path: String, permissions: String },
	SetOwner {
		path: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		user: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		group: Option<String>,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MakeDirItem {
	pub path: String,
	#[serde(default)]
	pub make_parents: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub permissions: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveItem {
	pub path: String,
	#[serde(default)]
	pub recursive: bool,
}

/// `0o644` -> `"644"`
pub fn format_permissions(mode: u32) -> String {
	format!("{:03o}", mode & 0o7777)
}

/// `"644"` -> `0o644`
pub fn parse_permissions(s: &str) -> Result<u32, String> {
	let mode = u32::from_str_radix(s, 8).map_err(|_| format!("invalid permissions {:?}", s))?;
	if mode > 0o7777 {
		return Err(format!("permissions {:?} out of range", s));
	}
	Ok(mode)
}

pub fn status_text(status: u16) -> &'static str {
	match status {
		200 => "OK",
		400 => "Bad Request",
		401 => "Unauthorized",
		403 => "Forbidden",
		404 => "Not Found",
		405 => "Method Not Allowed",
		408 => "Request Timeout",
		413 => "Payload Too Large",
		500 => "Internal Server Error",
		504 => "Gateway Timeout",
		_ => "Unknown",
	}
}


// vim: ts=4

//! Multipart part assembly for file uploads.

// std
use std::path::PathBuf;
// self
use crate::_prelude::*;

/// Body of a single multipart part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartContents {
	/// File read from disk when the request is dispatched.
	File(PathBuf),
	/// Inline text value.
	Text(String),
}

/// Named multipart part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartPart {
	/// Form field name.
	pub name: String,
	/// Part body.
	pub contents: PartContents,
}
impl MultipartPart {
	/// Builds a file part.
	pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
		Self { name: name.into(), contents: PartContents::File(path.into()) }
	}

	/// Builds a text part.
	pub fn text(name: impl Into<String>, contents: impl Into<String>) -> Self {
		Self { name: name.into(), contents: PartContents::Text(contents.into()) }
	}
}

/// File entry passed to [`RequestPipeline::upload`](crate::http::RequestPipeline::upload).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadFile {
	/// One path, sent under the plain field name.
	Single(PathBuf),
	/// Several paths, each sent under `name[]`.
	Many(Vec<PathBuf>),
}
impl From<&str> for UploadFile {
	fn from(path: &str) -> Self {
		Self::Single(path.into())
	}
}
impl From<PathBuf> for UploadFile {
	fn from(path: PathBuf) -> Self {
		Self::Single(path)
	}
}
impl From<Vec<PathBuf>> for UploadFile {
	fn from(paths: Vec<PathBuf>) -> Self {
		Self::Many(paths)
	}
}
impl From<Vec<&str>> for UploadFile {
	fn from(paths: Vec<&str>) -> Self {
		Self::Many(paths.into_iter().map(PathBuf::from).collect())
	}
}

/// Assembles the multipart part list for an upload: file parts first, then form fields.
pub fn build_multipart(
	files: &BTreeMap<String, UploadFile>,
	form: &BTreeMap<String, String>,
) -> Vec<MultipartPart> {
	let mut parts = Vec::with_capacity(files.len() + form.len());

	for (name, file) in files {
		match file {
			UploadFile::Single(path) => parts.push(MultipartPart::file(name, path.clone())),
			UploadFile::Many(paths) => {
				let field = format!("{name}[]");

				parts.extend(paths.iter().map(|path| MultipartPart::file(&field, path.clone())));
			},
		}
	}

	parts.extend(form.iter().map(|(name, contents)| MultipartPart::text(name, contents)));

	parts
}

//! On-disk project document codec.
//! 專案文件的編碼與解碼。

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Project;

/// Current project document format version.
pub const PROJECT_FORMAT_VERSION: u32 = 1;

/// Conventional extension for project documents.
pub const PROJECT_EXTENSION: &str = "texproj";

/// Errors raised while converting between a [`Project`] and its document text.
/// 專案與文件文字互相轉換時的錯誤。
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unable to decode project document: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("unable to encode project document: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Serialize)]
struct DocumentOut<'a> {
    format_version: u32,
    #[serde(flatten)]
    project: &'a Project,
}

#[derive(Deserialize)]
struct DocumentIn {
    #[serde(default = "current_version")]
    format_version: u32,
    #[serde(flatten)]
    project: Project,
}

fn current_version() -> u32 {
    PROJECT_FORMAT_VERSION
}

/// Indented JSON encoding of a project.
///
/// Decoding is lenient in the forward direction: unknown fields are ignored and
/// missing fields take their defaults, so documents written by newer builds
/// still open.
pub struct ProjectDocument;

impl ProjectDocument {
    /// Encodes the project as human-readable, indented JSON.
    /// 將專案編碼為縮排的 JSON。
    pub fn encode(project: &Project) -> Result<String, DocumentError> {
        let document = DocumentOut {
            format_version: PROJECT_FORMAT_VERSION,
            project,
        };
        serde_json::to_string_pretty(&document).map_err(DocumentError::Encode)
    }

    /// Decodes document text produced by [`ProjectDocument::encode`].
    /// 解碼由 [`ProjectDocument::encode`] 產生的文件。
    pub fn decode(text: &str) -> Result<Project, DocumentError> {
        let document: DocumentIn = serde_json::from_str(text).map_err(DocumentError::Decode)?;
        if document.format_version > PROJECT_FORMAT_VERSION {
            warn!(
                "project document version {} is newer than supported version {}",
                document.format_version, PROJECT_FORMAT_VERSION
            );
        }
        Ok(document.project)
    }
}

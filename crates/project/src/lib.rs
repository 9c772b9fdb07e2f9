//! Project document model, codec and store.
//! 專案文件的資料模型、編解碼與存取。

mod serde_path;
mod util;

pub mod document;
pub mod model;
pub mod store;

pub use document::{DocumentError, ProjectDocument, PROJECT_EXTENSION, PROJECT_FORMAT_VERSION};
pub use model::{EngineInput, Model, ModelFormat, Output, OutputControl, Project};
pub use store::{
    project_title, EditorBridge, ExportFailure, ProjectExporter, ProjectStore, StoreError,
    StoreOutcome, UserPrompts, APP_TITLE, EXPORT_FAILURE_MESSAGE, LOAD_FAILURE_MESSAGE,
    SAVE_FAILURE_MESSAGE,
};
pub use util::write_atomic;

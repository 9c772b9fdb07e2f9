use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::serde_path;

/// The complete persisted editor state.
/// 完整持久化的編輯器狀態。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub engine_input: EngineInput,
    #[serde(default)]
    pub output_control: OutputControl,
}

impl Project {
    /// Returns `true` when nothing has been entered yet.
    /// 尚未輸入任何內容時回傳 `true`。
    pub fn is_empty(&self) -> bool {
        *self == Project::default()
    }
}

/// Everything the render engine consumes: definitions, includes, models and the template.
/// 渲染引擎的輸入：定義、引入路徑、模型與樣板。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineInput {
    #[serde(default)]
    pub definitions: BTreeMap<String, String>,
    #[serde(default, with = "serde_path::vec")]
    pub include_paths: Vec<PathBuf>,
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default, with = "serde_path")]
    pub template_path: PathBuf,
    #[serde(default)]
    pub template: String,
}

impl EngineInput {
    /// Definitions in the engine's `NAME=VALUE` form, ordered by name.
    pub fn definition_pairs(&self) -> Vec<String> {
        self.definitions
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect()
    }
}

/// A single input model as held by the editor.
/// 編輯器中的單一輸入模型。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default, with = "serde_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub format: ModelFormat,
}

impl Model {
    pub fn new(text: impl Into<String>, format: ModelFormat) -> Self {
        Self {
            path: PathBuf::new(),
            text: text.into(),
            format,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Whitespace-only models carry no data.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Declared data format of a model.
/// 模型宣告的資料格式。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    #[default]
    Json,
    Yaml,
    Csv,
    Line,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 4] = [
        ModelFormat::Json,
        ModelFormat::Yaml,
        ModelFormat::Csv,
        ModelFormat::Line,
    ];

    /// File extension used when the model is written to disk.
    /// 模型寫入磁碟時所用的副檔名。
    pub fn extension(self) -> &'static str {
        match self {
            ModelFormat::Json => "json",
            ModelFormat::Yaml => "yaml",
            ModelFormat::Csv => "csv",
            ModelFormat::Line => "line",
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ModelFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "json" => Ok(ModelFormat::Json),
            "yaml" | "yml" => Ok(ModelFormat::Yaml),
            "csv" => Ok(ModelFormat::Csv),
            "line" | "lines" => Ok(ModelFormat::Line),
            other => Err(format!("unknown model format '{other}'")),
        }
    }
}

/// Where rendered output should go.
/// 渲染結果的輸出目的地。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputControl {
    #[serde(default)]
    pub outputs: Vec<Output>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default, with = "serde_path")]
    pub path: PathBuf,
}

impl Output {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

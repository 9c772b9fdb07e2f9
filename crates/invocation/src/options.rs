use std::path::Path;

use serde::{Deserialize, Serialize};
use texproj_project::{EngineInput, OutputControl};

/// Engine-agnostic argument set shared by every invocation encoding.
/// 所有呼叫編碼共用、與引擎無關的參數集合。
///
/// Rebuilt on every export; never persisted with the project.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// `NAME=VALUE` pairs.
    #[serde(default)]
    pub definitions: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub output: Vec<String>,
}

impl RenderOptions {
    /// Projects editor state onto options that point at the editor's own files.
    /// 以編輯器中的檔案路徑建立參數。
    ///
    /// Nothing is written; every referenced file is assumed to exist already.
    pub fn from_editor(input: &EngineInput, output: &OutputControl) -> Self {
        Self {
            definitions: input.definition_pairs(),
            include: input.include_paths.iter().map(|p| path_arg(p)).collect(),
            models: input.models.iter().map(|m| path_arg(&m.path)).collect(),
            template: path_arg(&input.template_path),
            output: output.outputs.iter().map(|o| path_arg(&o.path)).collect(),
        }
    }
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use texproj_project::{Model, ModelFormat, Output};

    #[test]
    fn editor_options_reference_editor_paths() {
        let mut input = EngineInput::default();
        input.definitions.insert("mode".into(), "draft".into());
        input.include_paths.push(PathBuf::from("partials"));
        input.models.push(Model::new("", ModelFormat::Json).with_path("data/a.json"));
        input.models.push(Model::new("b", ModelFormat::Csv).with_path("data/b.csv"));
        input.template_path = PathBuf::from("page.sbn");
        let output = OutputControl {
            outputs: vec![Output::new("site/index.html")],
        };

        let options = RenderOptions::from_editor(&input, &output);

        assert_eq!(options.definitions, vec!["mode=draft"]);
        assert_eq!(options.include, vec!["partials"]);
        // Blank models are kept here; only exports filter them.
        assert_eq!(options.models, vec!["data/a.json", "data/b.csv"]);
        assert_eq!(options.template, "page.sbn");
        assert_eq!(options.output, vec!["site/index.html"]);
    }

    #[test]
    fn json_field_names_match_engine_arguments() {
        let options = RenderOptions {
            models: vec!["model0.yaml".into()],
            template: "template.sbn".into(),
            output: vec!["out.txt".into()],
            ..Default::default()
        };
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["models"][0], "model0.yaml");
        assert_eq!(value["template"], "template.sbn");
        assert_eq!(value["output"][0], "out.txt");
        assert!(value["definitions"].as_array().unwrap().is_empty());
        assert!(value["include"].as_array().unwrap().is_empty());
    }
}

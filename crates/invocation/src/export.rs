//! Materialises a project into a folder the render engine can run from.
//! 將專案輸出至資料夾，供渲染引擎直接執行。
//!
//! Export happens in two steps: [`ExportPlan::new`] derives every file name and
//! payload without touching the disk, then [`ExportPlan::write_to`] writes them
//! in order. The first failing write aborts; files already written stay behind,
//! which is harmless because an export can simply be re-run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use texproj_project::{ExportFailure, Model, Project, ProjectExporter};
use thiserror::Error;

use crate::command::{CommandLineBuilder, UnrepresentableArgument};
use crate::environment::RuntimeEnvironment;
use crate::options::RenderOptions;

pub const TEMPLATE_FILE: &str = "template.sbn";
pub const RENDER_SCRIPT: &str = "render.bat";
pub const JSON_ARGS_FILE: &str = "args.json";
pub const JSON_RENDER_SCRIPT: &str = "jsonrender.bat";
pub const YAML_ARGS_FILE: &str = "args.yaml";
pub const YAML_RENDER_SCRIPT: &str = "yamlrender.bat";

/// Failures while preparing or writing an export.
/// 準備或寫入匯出檔案時的錯誤。
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unable to locate the render engine: {0}")]
    Environment(#[source] io::Error),
    #[error("unable to encode JSON arguments: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unable to encode YAML arguments: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("cannot express option in a launcher script: {0}")]
    UnrepresentableArgument(#[from] UnrepresentableArgument),
    #[error("unable to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A file to be created in the export folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedFile {
    pub name: String,
    pub contents: String,
}

impl ExportedFile {
    fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Model files for every non-blank model, named after its position in `models`.
/// 為每個非空白模型產生檔案，檔名依其在原始清單中的位置命名。
///
/// Blank models are skipped without renumbering the rest, so `["", "a"]`
/// yields only `model1.<ext>`.
pub fn model_files(models: &[Model]) -> Vec<ExportedFile> {
    models
        .iter()
        .enumerate()
        .filter(|(_, model)| !model.is_blank())
        .map(|(index, model)| {
            ExportedFile::new(
                format!("model{index}.{}", model.format.extension()),
                model.text.clone(),
            )
        })
        .collect()
}

/// Everything an export will write, computed up front.
#[derive(Clone, Debug)]
pub struct ExportPlan {
    options: RenderOptions,
    files: Vec<ExportedFile>,
}

impl ExportPlan {
    /// Derives options, data files and the three invocations for `project`.
    /// 推導參數、資料檔與三種呼叫方式。
    pub fn new(project: &Project, engine: &Path) -> Result<Self, ExportError> {
        let input = &project.engine_input;
        let models = model_files(&input.models);

        let options = RenderOptions {
            models: models.iter().map(|file| file.name.clone()).collect(),
            template: TEMPLATE_FILE.to_string(),
            ..RenderOptions::from_editor(input, &project.output_control)
        };

        let builder = CommandLineBuilder::new(options.clone()).with_exe(engine);
        let render_script = builder.render_script()?;
        let json = builder.build_json()?;
        let json_script = builder.descriptor_script(JSON_ARGS_FILE)?;
        let yaml = builder.build_yaml()?;
        let yaml_script = builder.descriptor_script(YAML_ARGS_FILE)?;

        let mut files = models;
        files.push(ExportedFile::new(TEMPLATE_FILE, input.template.clone()));
        files.push(ExportedFile::new(RENDER_SCRIPT, render_script));
        files.push(ExportedFile::new(JSON_ARGS_FILE, json));
        files.push(ExportedFile::new(JSON_RENDER_SCRIPT, json_script));
        files.push(ExportedFile::new(YAML_ARGS_FILE, yaml));
        files.push(ExportedFile::new(YAML_RENDER_SCRIPT, yaml_script));

        Ok(Self { options, files })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn files(&self) -> &[ExportedFile] {
        &self.files
    }

    /// Writes every planned file into `folder`, creating it when missing.
    /// 將所有檔案寫入 `folder`；資料夾不存在時會先建立。
    pub fn write_to(&self, folder: &Path) -> Result<ExportReport, ExportError> {
        fs::create_dir_all(folder).map_err(|source| ExportError::Write {
            path: folder.to_path_buf(),
            source,
        })?;

        let mut written = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let path = folder.join(&file.name);
            fs::write(&path, &file.contents)
                .map_err(|source| ExportError::Write { path: path.clone(), source })?;
            debug!("wrote {}", path.display());
            written.push(path);
        }

        Ok(ExportReport {
            folder: folder.to_path_buf(),
            written,
            options: self.options.clone(),
        })
    }
}

/// What an export produced.
#[derive(Clone, Debug)]
pub struct ExportReport {
    pub folder: PathBuf,
    /// Paths in the order they were written.
    pub written: Vec<PathBuf>,
    pub options: RenderOptions,
}

/// Builds engine invocations for projects, resolving the engine through `R`.
/// 透過 `R` 找到引擎並為專案建立呼叫方式。
#[derive(Clone, Debug, Default)]
pub struct InvocationBuilder<R> {
    environment: R,
}

impl<R: RuntimeEnvironment> InvocationBuilder<R> {
    pub fn new(environment: R) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> &R {
        &self.environment
    }

    /// Options that reference the editor's own files; nothing is materialised.
    pub fn build_options(&self, project: &Project) -> RenderOptions {
        RenderOptions::from_editor(&project.engine_input, &project.output_control)
    }

    /// The direct `render` command line for the project as it sits in the editor.
    /// 以編輯器中的檔案路徑產生直接執行的命令列。
    pub fn build_command_line(&self, project: &Project) -> Result<String, ExportError> {
        let engine = self.engine()?;
        Ok(CommandLineBuilder::new(self.build_options(project))
            .with_exe(&engine)
            .build_render_invocation()?)
    }

    /// Plans without writing; useful for previews.
    pub fn plan(&self, project: &Project) -> Result<ExportPlan, ExportError> {
        ExportPlan::new(project, &self.engine()?)
    }

    /// Writes model, template, descriptor and launcher files into `folder`.
    /// 將模型、樣板、參數描述與啟動腳本寫入 `folder`。
    pub fn export_to_folder(
        &self,
        project: &Project,
        folder: &Path,
    ) -> Result<ExportReport, ExportError> {
        let report = self.plan(project)?.write_to(folder)?;
        info!(
            "exported {} files to {}",
            report.written.len(),
            folder.display()
        );
        Ok(report)
    }

    fn engine(&self) -> Result<PathBuf, ExportError> {
        self.environment
            .engine_executable()
            .map_err(ExportError::Environment)
    }
}

impl<R: RuntimeEnvironment> ProjectExporter for InvocationBuilder<R> {
    fn export(&self, project: &Project, folder: &Path) -> Result<(), ExportFailure> {
        self.export_to_folder(project, folder)?;
        Ok(())
    }
}

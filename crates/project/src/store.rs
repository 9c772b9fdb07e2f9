use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info};
use thiserror::Error;

use crate::document::{DocumentError, ProjectDocument};
use crate::model::Project;
use crate::util::write_atomic;

/// Name shown next to the project file in the window title.
pub const APP_TITLE: &str = "texproj";

pub const LOAD_FAILURE_MESSAGE: &str = "Error - unable to open project";
pub const SAVE_FAILURE_MESSAGE: &str = "Error - unable to save project";
pub const EXPORT_FAILURE_MESSAGE: &str = "Sorry - couldn't export invocation";

/// Boxed error returned by a [`ProjectExporter`].
pub type ExportFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Read/write access to the live editor state.
/// 讀寫目前編輯器狀態的介面。
pub trait EditorBridge {
    /// Snapshots the editor into a project.
    fn capture_project(&self) -> Project;
    /// Replaces the editor contents with `project`.
    fn apply_project(&mut self, project: &Project);
    /// Called whenever the current document location changes.
    fn set_title(&mut self, location: Option<&Path>);
}

/// Dialogs and notifications the store needs from its host.
/// 儲存器需要宿主提供的對話框與通知。
pub trait UserPrompts {
    fn choose_open_location(&mut self) -> Option<PathBuf>;
    fn choose_save_location(&mut self) -> Option<PathBuf>;
    fn choose_export_folder(&mut self) -> Option<PathBuf>;
    /// Shows a single, generic failure message.
    fn report_failure(&mut self, message: &str);
}

/// Materialises a project into a folder for out-of-process rendering.
/// 將專案匯出至資料夾，供外部渲染程式使用。
pub trait ProjectExporter {
    fn export(&self, project: &Project, folder: &Path) -> Result<(), ExportFailure>;
}

/// Whether an operation ran or the user backed out of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Completed,
    Cancelled,
}

/// Failures of [`ProjectStore`] operations, kept distinct for logging and tests.
/// [`ProjectStore`] 操作的錯誤類型。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read project {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode project {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },
    #[error("failed to encode project: {0}")]
    Encode(#[source] DocumentError),
    #[error("failed to write project {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to export project to {folder}: {source}")]
    Export {
        folder: PathBuf,
        #[source]
        source: ExportFailure,
    },
}

impl StoreError {
    /// The undifferentiated message a user sees for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::Read { .. } | StoreError::Decode { .. } => LOAD_FAILURE_MESSAGE,
            StoreError::Encode(_) | StoreError::Write { .. } => SAVE_FAILURE_MESSAGE,
            StoreError::Export { .. } => EXPORT_FAILURE_MESSAGE,
        }
    }
}

/// Title text for a document location.
/// 依文件位置產生視窗標題。
pub fn project_title(location: Option<&Path>) -> String {
    let name = location
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string());
    format!("{name} - {APP_TITLE}")
}

/// Loads, saves and exports projects on behalf of an editor.
/// 代表編輯器載入、儲存與匯出專案。
///
/// The store owns the "current location"; `None` means the project has never
/// been saved.
#[derive(Debug)]
pub struct ProjectStore<E, U> {
    editor: E,
    prompts: U,
    location: Option<PathBuf>,
}

impl<E: EditorBridge, U: UserPrompts> ProjectStore<E, U> {
    pub fn new(editor: E, prompts: U) -> Self {
        Self {
            editor,
            prompts,
            location: None,
        }
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn prompts(&self) -> &U {
        &self.prompts
    }

    pub fn prompts_mut(&mut self) -> &mut U {
        &mut self.prompts
    }

    pub fn into_parts(self) -> (E, U) {
        (self.editor, self.prompts)
    }

    /// Forgets the current location and pushes an empty project to the editor.
    /// 清除目前位置並載入空白專案。
    pub fn new_project(&mut self) {
        self.location = None;
        self.push_to_editor(&Project::default());
    }

    /// Asks for a project file and loads it.
    pub fn open(&mut self) -> Result<StoreOutcome, StoreError> {
        match self.prompts.choose_open_location() {
            Some(path) => self.load(path).map(|()| StoreOutcome::Completed),
            None => Ok(StoreOutcome::Cancelled),
        }
    }

    /// Loads the project at `path`.
    /// 載入指定路徑的專案。
    ///
    /// On failure the editor and the current location are left untouched.
    pub fn load(&mut self, path: impl Into<PathBuf>) -> Result<(), StoreError> {
        let path = path.into();
        let result = read_project(&path);
        match result {
            Ok(project) => {
                info!("loaded project {}", path.display());
                self.location = Some(path);
                self.push_to_editor(&project);
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Saves to the current location, or asks for one when unsaved.
    /// 儲存至目前位置；若尚未儲存過則詢問位置。
    pub fn save(&mut self) -> Result<StoreOutcome, StoreError> {
        let Some(path) = self.location.clone() else {
            return self.save_as();
        };
        let project = self.editor.capture_project();
        match write_project(&path, &project) {
            Ok(()) => {
                info!("saved project {}", path.display());
                Ok(StoreOutcome::Completed)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Asks for a new location, adopts it, then saves.
    pub fn save_as(&mut self) -> Result<StoreOutcome, StoreError> {
        let Some(path) = self.prompts.choose_save_location() else {
            return Ok(StoreOutcome::Cancelled);
        };
        self.location = Some(path);
        self.editor.set_title(self.location.as_deref());
        self.save()
    }

    /// Asks for a folder and hands the captured project to `exporter`.
    /// 詢問匯出資料夾並交由匯出器處理。
    pub fn export_project(
        &mut self,
        exporter: &dyn ProjectExporter,
    ) -> Result<StoreOutcome, StoreError> {
        let Some(folder) = self.prompts.choose_export_folder() else {
            return Ok(StoreOutcome::Cancelled);
        };
        let project = self.editor.capture_project();
        match exporter.export(&project, &folder) {
            Ok(()) => {
                info!("exported project to {}", folder.display());
                Ok(StoreOutcome::Completed)
            }
            Err(source) => Err(self.fail(StoreError::Export { folder, source })),
        }
    }

    fn push_to_editor(&mut self, project: &Project) {
        self.editor.apply_project(project);
        self.editor.set_title(self.location.as_deref());
    }

    fn fail(&mut self, err: StoreError) -> StoreError {
        error!("{err}");
        self.prompts.report_failure(err.user_message());
        err
    }
}

fn read_project(path: &Path) -> Result<Project, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ProjectDocument::decode(&text).map_err(|source| StoreError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn write_project(path: &Path, project: &Project) -> Result<(), StoreError> {
    let text = ProjectDocument::encode(project).map_err(StoreError::Encode)?;
    write_atomic(path, text.as_bytes()).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Model, ModelFormat, Output};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeEditor {
        project: Project,
        title: Option<PathBuf>,
        applied: usize,
    }

    impl EditorBridge for FakeEditor {
        fn capture_project(&self) -> Project {
            self.project.clone()
        }

        fn apply_project(&mut self, project: &Project) {
            self.project = project.clone();
            self.applied += 1;
        }

        fn set_title(&mut self, location: Option<&Path>) {
            self.title = location.map(Path::to_path_buf);
        }
    }

    #[derive(Default)]
    struct ScriptedPrompts {
        open: VecDeque<Option<PathBuf>>,
        save: VecDeque<Option<PathBuf>>,
        export: VecDeque<Option<PathBuf>>,
        failures: Vec<String>,
    }

    impl UserPrompts for ScriptedPrompts {
        fn choose_open_location(&mut self) -> Option<PathBuf> {
            self.open.pop_front().flatten()
        }

        fn choose_save_location(&mut self) -> Option<PathBuf> {
            self.save.pop_front().flatten()
        }

        fn choose_export_folder(&mut self) -> Option<PathBuf> {
            self.export.pop_front().flatten()
        }

        fn report_failure(&mut self, message: &str) {
            self.failures.push(message.to_string());
        }
    }

    #[derive(Default)]
    struct RecordingExporter {
        calls: RefCell<Vec<(Project, PathBuf)>>,
        fail: bool,
    }

    impl ProjectExporter for RecordingExporter {
        fn export(&self, project: &Project, folder: &Path) -> Result<(), ExportFailure> {
            if self.fail {
                return Err("disk full".into());
            }
            self.calls
                .borrow_mut()
                .push((project.clone(), folder.to_path_buf()));
            Ok(())
        }
    }

    fn store() -> ProjectStore<FakeEditor, ScriptedPrompts> {
        ProjectStore::new(FakeEditor::default(), ScriptedPrompts::default())
    }

    fn populated() -> Project {
        let mut project = Project::default();
        project.engine_input.template = "{{x}}".into();
        project
            .engine_input
            .models
            .push(Model::new("x: 1", ModelFormat::Yaml));
        project.output_control.outputs.push(Output::new("out.txt"));
        project
    }

    #[test]
    fn save_then_load_restores_editor_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.texproj");

        let mut first = store();
        first.editor_mut().project = populated();
        first.prompts_mut().save.push_back(Some(path.clone()));
        assert_eq!(first.save().unwrap(), StoreOutcome::Completed);
        assert_eq!(first.location(), Some(path.as_path()));
        assert_eq!(first.editor().title.as_deref(), Some(path.as_path()));

        let mut second = store();
        second.load(&path).unwrap();
        assert_eq!(second.editor().project, populated());
        assert_eq!(second.location(), Some(path.as_path()));
        assert_eq!(second.editor().title.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn save_without_location_and_cancelled_prompt_does_nothing() {
        let mut store = store();
        assert_eq!(store.save().unwrap(), StoreOutcome::Cancelled);
        assert!(store.location().is_none());
        assert!(store.prompts().failures.is_empty());
    }

    #[test]
    fn malformed_document_leaves_editor_untouched() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.texproj");
        let bad = dir.path().join("bad.texproj");
        fs::write(&bad, "{ \"engine_input\": [").unwrap();

        let mut store = store();
        store.editor_mut().project = populated();
        store.prompts_mut().save.push_back(Some(good.clone()));
        store.save().unwrap();
        let applied_before = store.editor().applied;

        let err = store.load(&bad).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
        assert_eq!(store.editor().project, populated());
        assert_eq!(store.editor().applied, applied_before);
        assert_eq!(store.location(), Some(good.as_path()));
        assert_eq!(store.prompts().failures, vec![LOAD_FAILURE_MESSAGE]);
    }

    #[test]
    fn missing_document_is_a_read_error() {
        let dir = tempdir().unwrap();
        let mut store = store();
        let err = store.load(dir.path().join("absent.texproj")).unwrap_err();
        assert!(matches!(err, StoreError::Read { .. }));
        assert_eq!(store.prompts().failures, vec![LOAD_FAILURE_MESSAGE]);
    }

    #[test]
    fn write_failure_reports_and_keeps_previous_file() {
        let dir = tempdir().unwrap();
        let blocked = dir.path().join("blocked.texproj");
        fs::create_dir(&blocked).unwrap();

        let mut store = store();
        store.editor_mut().project = populated();
        store.prompts_mut().save.push_back(Some(blocked.clone()));
        let err = store.save().unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert!(blocked.is_dir());
        assert_eq!(store.prompts().failures, vec![SAVE_FAILURE_MESSAGE]);
    }

    #[test]
    fn blocked_temp_file_keeps_previous_document_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.texproj");

        let mut store = store();
        store.editor_mut().project = populated();
        store.prompts_mut().save.push_back(Some(path.clone()));
        store.save().unwrap();
        let before = fs::read(&path).unwrap();

        fs::create_dir(dir.path().join(".x.texproj.tmp")).unwrap();
        store.editor_mut().project.engine_input.template = "changed".into();
        let err = store.save().unwrap_err();

        assert!(matches!(err, StoreError::Write { .. }));
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(store.location(), Some(path.as_path()));
        assert_eq!(store.prompts().failures, vec![SAVE_FAILURE_MESSAGE]);
    }

    #[test]
    fn new_project_clears_location_and_editor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.texproj");
        let mut store = store();
        store.editor_mut().project = populated();
        store.prompts_mut().save.push_back(Some(path));
        store.save().unwrap();

        store.new_project();
        assert!(store.location().is_none());
        assert!(store.editor().project.is_empty());
        assert!(store.editor().title.is_none());
    }

    #[test]
    fn open_prompts_then_loads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.texproj");
        fs::write(&path, ProjectDocument::encode(&populated()).unwrap()).unwrap();

        let mut store = store();
        store.prompts_mut().open.push_back(None);
        store.prompts_mut().open.push_back(Some(path.clone()));
        assert_eq!(store.open().unwrap(), StoreOutcome::Cancelled);
        assert!(store.editor().project.is_empty());
        assert_eq!(store.open().unwrap(), StoreOutcome::Completed);
        assert_eq!(store.editor().project, populated());
    }

    #[test]
    fn export_hands_captured_project_to_exporter() {
        let dir = tempdir().unwrap();
        let exporter = RecordingExporter::default();
        let mut store = store();
        store.editor_mut().project = populated();
        store.prompts_mut().export.push_back(Some(dir.path().to_path_buf()));

        assert_eq!(
            store.export_project(&exporter).unwrap(),
            StoreOutcome::Completed
        );
        let calls = exporter.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, populated());
        assert_eq!(calls[0].1, dir.path());
    }

    #[test]
    fn cancelled_export_is_silent() {
        let exporter = RecordingExporter::default();
        let mut store = store();
        assert_eq!(
            store.export_project(&exporter).unwrap(),
            StoreOutcome::Cancelled
        );
        assert!(exporter.calls.borrow().is_empty());
        assert!(store.prompts().failures.is_empty());
    }

    #[test]
    fn failed_export_reports_one_message() {
        let exporter = RecordingExporter {
            fail: true,
            ..Default::default()
        };
        let mut store = store();
        store.prompts_mut().export.push_back(Some(PathBuf::from("out")));
        let err = store.export_project(&exporter).unwrap_err();
        assert!(matches!(err, StoreError::Export { .. }));
        assert_eq!(store.prompts().failures, vec![EXPORT_FAILURE_MESSAGE]);
    }

    #[test]
    fn titles_follow_location() {
        assert_eq!(project_title(None), "untitled - texproj");
        assert_eq!(
            project_title(Some(Path::new("/work/site.texproj"))),
            "site.texproj - texproj"
        );
    }
}

//! Turns editor state into render-engine invocations.
//! （將編輯器狀態轉換為渲染引擎的呼叫方式。）
//!
//! The same [`RenderOptions`] value is encoded three ways: a direct command
//! line, a JSON argument file and a YAML argument file, each with a batch
//! launcher. [`InvocationBuilder::export_to_folder`] writes all of them next to
//! the model and template files they reference.
//! 同一組 [`RenderOptions`] 會輸出為命令列、JSON 與 YAML 三種形式，並各自附帶啟動腳本。

pub mod command;
pub mod environment;
pub mod export;
pub mod options;

pub use command::{
    parse_render_args, split_command_line, ArgsError, CommandLineBuilder, Invocation,
    UnrepresentableArgument,
};
pub use environment::{
    FixedEnvironment, InstalledEnvironment, RuntimeEnvironment, ENGINE_DIR_ENV, ENGINE_EXE_NAME,
};
pub use export::{
    model_files, ExportError, ExportPlan, ExportReport, ExportedFile, InvocationBuilder,
    JSON_ARGS_FILE, JSON_RENDER_SCRIPT, RENDER_SCRIPT, TEMPLATE_FILE, YAML_ARGS_FILE,
    YAML_RENDER_SCRIPT,
};
pub use options::RenderOptions;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{debug, warn};
use texproj_invocation::{
    FixedEnvironment, InstalledEnvironment, InvocationBuilder, RuntimeEnvironment,
};
use texproj_project::{
    project_title, EditorBridge, Model, ModelFormat, Output, Project, ProjectStore, StoreOutcome,
    UserPrompts,
};

#[derive(Parser)]
#[command(
    name = "texproj",
    about = "Create, edit and export template render projects",
    author,
    version
)]
struct Cli {
    /// 渲染引擎所在資料夾；預設為本程式所在資料夾。 / Folder holding the render engine (defaults to this program's folder).
    #[arg(long, global = true, value_name = "DIR")]
    engine_dir: Option<PathBuf>,
    /// 提高日誌詳細程度（可重複）。 / Increase log verbosity (repeatable).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 建立空白專案檔。 / Create an empty project document.
    New(NewArgs),
    /// 顯示專案摘要。 / Print a project summary.
    Show(ProjectArg),
    /// 設定樣板內容或路徑。 / Set the template text and/or path.
    SetTemplate(SetTemplateArgs),
    /// 新增輸入模型。 / Append an input model.
    AddModel(AddModelArgs),
    /// 新增輸出路徑。 / Append an output destination.
    AddOutput(AddOutputArgs),
    /// 設定 NAME=VALUE 定義。 / Set NAME=VALUE definitions.
    Define(DefineArgs),
    /// 新增引入資料夾。 / Append include paths.
    Include(IncludeArgs),
    /// 輸出直接執行的命令列。 / Print the direct engine command line.
    CommandLine(ProjectArg),
    /// 匯出模型、樣板與啟動腳本。 / Export models, template and launcher scripts.
    Export(ExportArgs),
}

#[derive(Args)]
struct ProjectArg {
    /// 專案檔路徑。 / Project document path.
    #[arg(value_name = "PROJECT")]
    project: PathBuf,
}

#[derive(Args)]
struct NewArgs {
    #[arg(value_name = "PROJECT")]
    project: PathBuf,
    /// 覆寫既有檔案。 / Overwrite an existing file.
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct TextSource {
    /// 直接提供的文字內容。 / Inline text.
    #[arg(long, value_name = "TEXT", conflicts_with = "text_file")]
    text: Option<String>,
    /// 從檔案讀取文字內容。 / Read the text from a file.
    #[arg(long, value_name = "FILE")]
    text_file: Option<PathBuf>,
}

impl TextSource {
    fn resolve(&self) -> Result<Option<String>> {
        match (&self.text, &self.text_file) {
            (Some(text), _) => Ok(Some(text.clone())),
            (None, Some(path)) => fs::read_to_string(path)
                .map(Some)
                .with_context(|| format!("failed to read {}", path.display())),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Args)]
struct SetTemplateArgs {
    #[arg(value_name = "PROJECT")]
    project: PathBuf,
    /// 樣板在編輯器中的路徑。 / Template path as known to the editor.
    #[arg(long, value_name = "PATH")]
    path: Option<PathBuf>,
    #[command(flatten)]
    source: TextSource,
}

#[derive(Args)]
struct AddModelArgs {
    #[arg(value_name = "PROJECT")]
    project: PathBuf,
    /// 模型在編輯器中的路徑。 / Model path as known to the editor.
    #[arg(long, value_name = "PATH")]
    path: Option<PathBuf>,
    /// 模型格式（json、yaml、csv、line）。 / Model format (json, yaml, csv, line).
    #[arg(long, default_value = "json", value_parser = parse_format)]
    format: ModelFormat,
    #[command(flatten)]
    source: TextSource,
}

#[derive(Args)]
struct AddOutputArgs {
    #[arg(value_name = "PROJECT")]
    project: PathBuf,
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,
}

#[derive(Args)]
struct DefineArgs {
    #[arg(value_name = "PROJECT")]
    project: PathBuf,
    /// NAME=VALUE 配對。 / NAME=VALUE pairs.
    #[arg(value_name = "NAME=VALUE", required = true, value_parser = parse_definition)]
    definitions: Vec<(String, String)>,
}

#[derive(Args)]
struct IncludeArgs {
    #[arg(value_name = "PROJECT")]
    project: PathBuf,
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(value_name = "PROJECT")]
    project: PathBuf,
    /// 匯出目標資料夾。 / Destination folder.
    #[arg(value_name = "DIR")]
    folder: PathBuf,
}

fn parse_format(value: &str) -> Result<ModelFormat, String> {
    value.parse()
}

fn parse_definition(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((name, val)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), val.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{value}'")),
    }
}

/// Stands in for the editor window: holds the project and the title.
#[derive(Default)]
struct HeadlessEditor {
    project: Project,
    title: String,
}

impl EditorBridge for HeadlessEditor {
    fn capture_project(&self) -> Project {
        self.project.clone()
    }

    fn apply_project(&mut self, project: &Project) {
        self.project = project.clone();
    }

    fn set_title(&mut self, location: Option<&Path>) {
        self.title = project_title(location);
        debug!("title: {}", self.title);
    }
}

/// Answers every prompt from command-line arguments.
#[derive(Default)]
struct ArgumentPrompts {
    save_location: Option<PathBuf>,
    export_folder: Option<PathBuf>,
}

impl UserPrompts for ArgumentPrompts {
    fn choose_open_location(&mut self) -> Option<PathBuf> {
        None
    }

    fn choose_save_location(&mut self) -> Option<PathBuf> {
        self.save_location.take()
    }

    fn choose_export_folder(&mut self) -> Option<PathBuf> {
        self.export_folder.take()
    }

    fn report_failure(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

type Store = ProjectStore<HeadlessEditor, ArgumentPrompts>;

enum EngineLocation {
    Installed(InstalledEnvironment),
    Fixed(FixedEnvironment),
}

impl RuntimeEnvironment for EngineLocation {
    fn application_folder(&self) -> io::Result<PathBuf> {
        match self {
            EngineLocation::Installed(env) => env.application_folder(),
            EngineLocation::Fixed(env) => env.application_folder(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        engine_dir,
        command,
        ..
    } = cli;
    let engine = match engine_dir {
        Some(dir) => EngineLocation::Fixed(FixedEnvironment::new(dir)),
        None => EngineLocation::Installed(InstalledEnvironment),
    };

    match command {
        Commands::New(args) => execute_new(args),
        Commands::Show(args) => execute_show(&args.project),
        Commands::SetTemplate(args) => {
            let text = args.source.resolve()?;
            edit(&args.project, |project| {
                let input = &mut project.engine_input;
                if let Some(path) = args.path {
                    input.template_path = path;
                }
                if let Some(text) = text {
                    input.template = text;
                }
            })
        }
        Commands::AddModel(args) => {
            let text = args
                .source
                .resolve()?
                .ok_or_else(|| anyhow!("add-model requires --text or --text-file"))?;
            edit(&args.project, |project| {
                let mut model = Model::new(text, args.format);
                if let Some(path) = args.path {
                    model = model.with_path(path);
                }
                project.engine_input.models.push(model);
            })
        }
        Commands::AddOutput(args) => edit(&args.project, |project| {
            project
                .output_control
                .outputs
                .push(Output::new(args.output));
        }),
        Commands::Define(args) => edit(&args.project, |project| {
            project.engine_input.definitions.extend(args.definitions);
        }),
        Commands::Include(args) => edit(&args.project, |project| {
            project.engine_input.include_paths.extend(args.paths);
        }),
        Commands::CommandLine(args) => {
            let store = open_store(&args.project)?;
            let line = InvocationBuilder::new(engine)
                .build_command_line(&store.editor().project)
                .context("failed to build command line")?;
            println!("{line}");
            Ok(())
        }
        Commands::Export(args) => execute_export(args, engine),
    }
}

fn execute_new(args: NewArgs) -> Result<()> {
    if args.project.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite",
            args.project.display()
        );
    }
    let mut store = Store::new(HeadlessEditor::default(), ArgumentPrompts::default());
    store.new_project();
    store.prompts_mut().save_location = Some(args.project.clone());
    store
        .save_as()
        .with_context(|| format!("failed to create {}", args.project.display()))?;
    println!("Created {}", args.project.display());
    Ok(())
}

fn open_store(path: &Path) -> Result<Store> {
    let mut store = Store::new(HeadlessEditor::default(), ArgumentPrompts::default());
    store
        .load(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    Ok(store)
}

/// Loads the project, applies `change` to the editor copy, then saves it back.
fn edit(path: &Path, change: impl FnOnce(&mut Project)) -> Result<()> {
    let mut store = open_store(path)?;
    change(&mut store.editor_mut().project);
    match store
        .save()
        .with_context(|| format!("failed to save {}", path.display()))?
    {
        StoreOutcome::Completed => Ok(()),
        StoreOutcome::Cancelled => Err(anyhow!("save of {} was cancelled", path.display())),
    }
}

fn execute_show(path: &Path) -> Result<()> {
    let store = open_store(path)?;
    let editor = store.editor();
    let input = &editor.project.engine_input;

    println!("{}", editor.title);
    println!("Definitions ({}):", input.definitions.len());
    for pair in input.definition_pairs() {
        println!("  {pair}");
    }
    println!("Includes ({}):", input.include_paths.len());
    for include in &input.include_paths {
        println!("  {}", include.display());
    }
    println!("Models ({}):", input.models.len());
    for (index, model) in input.models.iter().enumerate() {
        let state = if model.is_blank() { ", blank" } else { "" };
        println!(
            "  [{index}] {} {} ({} bytes{state})",
            model.format,
            display_or_dash(&model.path),
            model.text.len()
        );
    }
    println!(
        "Template: {} ({} bytes)",
        display_or_dash(&input.template_path),
        input.template.len()
    );
    let outputs = &editor.project.output_control.outputs;
    println!("Outputs ({}):", outputs.len());
    for output in outputs {
        println!("  {}", output.path.display());
    }
    Ok(())
}

fn display_or_dash(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        "-".to_string()
    } else {
        path.display().to_string()
    }
}

fn execute_export(args: ExportArgs, engine: EngineLocation) -> Result<()> {
    let mut store = open_store(&args.project)?;
    let builder = InvocationBuilder::new(engine);
    let skipped = store
        .editor()
        .project
        .engine_input
        .models
        .iter()
        .filter(|model| model.is_blank())
        .count();
    if skipped > 0 {
        warn!("skipping {skipped} blank model(s)");
    }

    store.prompts_mut().export_folder = Some(args.folder.clone());
    store
        .export_project(&builder)
        .with_context(|| format!("failed to export to {}", args.folder.display()))?;
    println!("Exported {} to {}", args.project.display(), args.folder.display());
    Ok(())
}

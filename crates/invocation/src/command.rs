//! Engine command lines and the launcher scripts that wrap them.
//! 渲染引擎的命令列與包裝它們的啟動腳本。

use std::mem;
use std::path::Path;

use thiserror::Error;

use crate::options::{path_arg, RenderOptions};

pub const RENDER_VERB: &str = "render";
pub const RENDER_FROM_FILE_VERB: &str = "renderFromFile";

pub const DEFINITIONS_FLAG: &str = "--definitions";
pub const INCLUDE_FLAG: &str = "--include";
pub const MODELS_FLAG: &str = "--models";
pub const TEMPLATE_FLAG: &str = "--template";
pub const OUTPUT_FLAG: &str = "--output";
pub const ARGUMENTS_FLAG: &str = "--arguments";

/// Errors raised when reading a command line back into arguments.
/// 將命令列解析回參數時的錯誤。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("unterminated quote in command line")]
    UnterminatedQuote,
    #[error("command line is empty")]
    Empty,
    #[error("expected '{RENDER_VERB}' verb, found {0:?}")]
    UnexpectedVerb(Option<String>),
    #[error("unknown flag '{0}'")]
    UnknownFlag(String),
    #[error("value '{0}' does not follow a flag")]
    StrayValue(String),
    #[error("{TEMPLATE_FLAG} expects one value, got {0}")]
    TemplateArity(usize),
}

/// Values a batch launcher cannot carry unchanged.
/// 批次啟動腳本無法原樣傳遞的參數值。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnrepresentableArgument {
    #[error("argument {0:?} contains a line break")]
    LineBreak(String),
    #[error("value {0:?} would be read as a flag")]
    FlagLike(String),
}

/// A program plus its arguments, renderable as a Windows command line.
/// 程式與其參數，可輸出為 Windows 命令列。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Creates an invocation of the given program.
    /// （以指定的程式建立呼叫。）
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    /// （加入一個參數。）
    pub fn push_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple arguments at once.
    /// （一次加入多個參數。）
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends `flag` followed by `values`; an empty list adds nothing.
    pub fn with_flag<S: AsRef<str>>(self, flag: &str, values: &[S]) -> Self {
        if values.is_empty() {
            return self;
        }
        self.push_arg(flag)
            .with_args(values.iter().map(|value| value.as_ref().to_string()))
    }

    /// Splits a command line produced by [`Invocation::to_command_line`].
    pub fn parse(line: &str) -> Result<Self, ArgsError> {
        let mut words = split_command_line(line)?.into_iter();
        let program = words.next().ok_or(ArgsError::Empty)?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    /// The program is always quoted; arguments only when they need it.
    /// （程式路徑一律加引號，參數僅在需要時加上。）
    pub fn to_command_line(&self) -> String {
        let mut line = quote(&self.program);
        for arg in &self.args {
            line.push(' ');
            if needs_quotes(arg) {
                line.push_str(&quote(arg));
            } else {
                line.push_str(arg);
            }
        }
        line
    }

    /// A batch file that runs this command.
    /// （執行此命令的批次檔內容。）
    ///
    /// `cmd.exe` ends a command at any line break, even inside quotes, so such
    /// arguments are refused.
    pub fn to_launcher_script(&self) -> Result<String, UnrepresentableArgument> {
        if let Some(word) = std::iter::once(&self.program)
            .chain(&self.args)
            .find(|word| word.contains(['\r', '\n']))
        {
            return Err(UnrepresentableArgument::LineBreak(word.clone()));
        }
        // `%` starts a variable reference inside batch files.
        let line = self.to_command_line().replace('%', "%%");
        Ok(format!("@echo off\r\n{line}\r\n"))
    }
}

fn needs_quotes(arg: &str) -> bool {
    arg.is_empty() || arg.chars().any(is_special)
}

fn is_special(c: char) -> bool {
    c.is_whitespace() || matches!(c, '"' | '&' | '|' | '<' | '>' | '^' | '(' | ')')
}

fn quote(arg: &str) -> String {
    format!("\"{}\"", arg.replace('"', "\"\""))
}

/// Splits a command line into words, honouring `"..."` and doubled `""` quotes.
/// 依引號規則將命令列拆成單字。
pub fn split_command_line(line: &str) -> Result<Vec<String>, ArgsError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' => {
                quoted = true;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quoted {
        return Err(ArgsError::UnterminatedQuote);
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Reads `render ...` arguments back into options.
/// 將 `render ...` 參數解析回渲染參數。
pub fn parse_render_args(args: &[String]) -> Result<RenderOptions, ArgsError> {
    let mut words = args.iter();
    match words.next() {
        Some(verb) if verb == RENDER_VERB => {}
        other => return Err(ArgsError::UnexpectedVerb(other.cloned())),
    }

    let mut options = RenderOptions::default();
    let mut templates: Option<Vec<String>> = None;
    let mut target: Option<&mut Vec<String>> = None;

    for word in words {
        if word.starts_with("--") {
            target = Some(match word.as_str() {
                DEFINITIONS_FLAG => &mut options.definitions,
                INCLUDE_FLAG => &mut options.include,
                MODELS_FLAG => &mut options.models,
                OUTPUT_FLAG => &mut options.output,
                TEMPLATE_FLAG => templates.get_or_insert_with(Vec::new),
                other => return Err(ArgsError::UnknownFlag(other.to_string())),
            });
            continue;
        }
        match target.as_deref_mut() {
            Some(values) => values.push(word.clone()),
            None => return Err(ArgsError::StrayValue(word.clone())),
        }
    }

    if let Some(mut values) = templates {
        if values.len() != 1 {
            return Err(ArgsError::TemplateArity(values.len()));
        }
        options.template = values.remove(0);
    }
    Ok(options)
}

/// Turns one [`RenderOptions`] value into the three equivalent invocations.
/// 將同一組參數轉為三種等價的呼叫方式。
#[derive(Clone, Debug)]
pub struct CommandLineBuilder {
    options: RenderOptions,
    exe: String,
}

impl CommandLineBuilder {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            exe: crate::environment::ENGINE_EXE_NAME.to_string(),
        }
    }

    pub fn with_exe(mut self, exe: &Path) -> Self {
        self.exe = path_arg(exe);
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// `<exe> render` with one flag per non-empty option field.
    ///
    /// A value starting with `--` would be read back as a flag, so it is refused.
    pub fn render_invocation(&self) -> Result<Invocation, UnrepresentableArgument> {
        let options = &self.options;
        if let Some(value) = options
            .definitions
            .iter()
            .chain(&options.include)
            .chain(&options.models)
            .chain(std::iter::once(&options.template))
            .chain(&options.output)
            .find(|value| value.starts_with("--"))
        {
            return Err(UnrepresentableArgument::FlagLike(value.clone()));
        }
        let template: &[String] = if options.template.is_empty() {
            &[]
        } else {
            std::slice::from_ref(&options.template)
        };
        Ok(Invocation::new(self.exe.clone())
            .push_arg(RENDER_VERB)
            .with_flag(DEFINITIONS_FLAG, &options.definitions)
            .with_flag(INCLUDE_FLAG, &options.include)
            .with_flag(MODELS_FLAG, &options.models)
            .with_flag(TEMPLATE_FLAG, template)
            .with_flag(OUTPUT_FLAG, &options.output))
    }

    /// `<exe> renderFromFile --arguments <args_file>`.
    pub fn descriptor_invocation(&self, args_file: &str) -> Invocation {
        Invocation::new(self.exe.clone())
            .push_arg(RENDER_FROM_FILE_VERB)
            .push_arg(ARGUMENTS_FLAG)
            .push_arg(args_file)
    }

    pub fn build_render_invocation(&self) -> Result<String, UnrepresentableArgument> {
        Ok(self.render_invocation()?.to_command_line())
    }

    /// The JSON argument descriptor.
    pub fn build_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.options)
    }

    /// The YAML argument descriptor.
    pub fn build_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.options)
    }

    /// Launcher script for [`CommandLineBuilder::render_invocation`].
    pub fn render_script(&self) -> Result<String, UnrepresentableArgument> {
        self.render_invocation()?.to_launcher_script()
    }

    /// Launcher script that points the engine at `args_file`.
    pub fn descriptor_script(&self, args_file: &str) -> Result<String, UnrepresentableArgument> {
        self.descriptor_invocation(args_file).to_launcher_script()
    }
}

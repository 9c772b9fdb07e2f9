use std::env;
use std::io;
use std::path::PathBuf;

/// File name of the render engine executable.
pub const ENGINE_EXE_NAME: &str = "textrude.exe";

/// Environment variable that overrides the folder the engine is looked up in.
pub const ENGINE_DIR_ENV: &str = "TEXPROJ_ENGINE_DIR";

/// Reports where the application (and the engine next to it) is installed.
/// 回報應用程式（以及同目錄下的引擎）的安裝位置。
pub trait RuntimeEnvironment {
    fn application_folder(&self) -> io::Result<PathBuf>;

    /// Full path of the engine executable.
    fn engine_executable(&self) -> io::Result<PathBuf> {
        Ok(self.application_folder()?.join(ENGINE_EXE_NAME))
    }
}

/// Uses `TEXPROJ_ENGINE_DIR` when set, else the running executable's folder.
/// 優先使用 `TEXPROJ_ENGINE_DIR`，否則使用執行檔所在資料夾。
#[derive(Clone, Copy, Debug, Default)]
pub struct InstalledEnvironment;

impl RuntimeEnvironment for InstalledEnvironment {
    fn application_folder(&self) -> io::Result<PathBuf> {
        if let Some(dir) = env::var_os(ENGINE_DIR_ENV).filter(|value| !value.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        let exe = env::current_exe()?;
        exe.parent().map(|dir| dir.to_path_buf()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} has no parent folder", exe.display()),
            )
        })
    }
}

/// A fixed application folder, for callers that already know it.
#[derive(Clone, Debug)]
pub struct FixedEnvironment(pub PathBuf);

impl FixedEnvironment {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self(folder.into())
    }
}

impl RuntimeEnvironment for FixedEnvironment {
    fn application_folder(&self) -> io::Result<PathBuf> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_sits_in_application_folder() {
        let env = FixedEnvironment::new("/opt/render");
        assert_eq!(
            env.engine_executable().unwrap(),
            PathBuf::from("/opt/render").join(ENGINE_EXE_NAME)
        );
    }
}

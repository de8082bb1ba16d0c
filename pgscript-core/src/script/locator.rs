//! Script locator resolution and loading.

use crate::error::PgScriptError;
use crate::Result;
use std::path::{Path, PathBuf};

/// A script reference ready to be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptRef {
    /// `http://` or `https://` URL, kept exactly as given
    Remote(String),
    /// Local filesystem path
    Local(PathBuf),
}

/// How a script is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// SQL batch sent over the database session
    Sql,
    /// Anything else, run through the shell
    Shell,
}

impl ScriptRef {
    /// Resolves a locator against `working_dir`.
    ///
    /// - `http://` / `https://` are used verbatim
    /// - `/...` is used verbatim as an absolute path
    /// - `file:///...` is converted to a local path
    /// - anything else is joined onto `working_dir`
    ///
    /// # Errors
    /// Returns `RequiredScriptMissing` for a blank locator and a
    /// configuration error for a `file://` URL that is not a local path
    ///
    /// # Example
    /// ```rust
    /// use pgscript_core::script::ScriptRef;
    /// use std::path::{Path, PathBuf};
    ///
    /// let script = ScriptRef::resolve("file:///srv/jobs/nightly.sql", Path::new("/tmp"))?;
    /// assert_eq!(script, ScriptRef::Local(PathBuf::from("/srv/jobs/nightly.sql")));
    /// # Ok::<(), pgscript_core::PgScriptError>(())
    /// ```
    pub fn resolve(locator: &str, working_dir: &Path) -> Result<Self> {
        if locator.trim().is_empty() {
            return Err(PgScriptError::RequiredScriptMissing);
        }

        if locator.starts_with("http://") || locator.starts_with("https://") {
            return Ok(Self::Remote(locator.to_string()));
        }

        if locator.starts_with('/') {
            return Ok(Self::Local(PathBuf::from(locator)));
        }

        if locator.starts_with("file:///") {
            let path = url::Url::parse(locator)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| {
                    PgScriptError::configuration(format!(
                        "Script URL '{}' is not a valid local file URL",
                        locator
                    ))
                })?;
            return Ok(Self::Local(path));
        }

        Ok(Self::Local(working_dir.join(locator)))
    }

    /// Picks the runner by extension: `.sql` scripts go to the database,
    /// everything else to the shell.
    pub fn kind(&self) -> ScriptKind {
        let path = match self {
            Self::Local(path) => path.to_string_lossy().into_owned(),
            Self::Remote(url) => url::Url::parse(url)
                .map(|parsed| parsed.path().to_string())
                .unwrap_or_else(|_| url.clone()),
        };

        if path.to_ascii_lowercase().ends_with(".sql") {
            ScriptKind::Sql
        } else {
            ScriptKind::Shell
        }
    }

    /// Short name used as `$0` for shell scripts and in log lines.
    pub fn name(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote(url) => url.clone(),
        }
    }

    /// Reads the script source.
    ///
    /// # Errors
    /// Returns an I/O error for unreadable local files and a fetch error for
    /// remote scripts that fail or answer with a non-success status
    pub async fn load(&self) -> Result<String> {
        match self {
            Self::Local(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| PgScriptError::io(format!("Failed to read {}", path.display()), e)),
            Self::Remote(url) => fetch(url).await,
        }
    }
}

impl std::fmt::Display for ScriptRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

async fn fetch(url: &str) -> Result<String> {
    tracing::info!("Fetching script from {}", url);

    let response = reqwest::get(url)
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| PgScriptError::ScriptFetch {
            context: url.to_string(),
            source: e,
        })?;

    response.text().await.map_err(|e| PgScriptError::ScriptFetch {
        context: url.to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CWD: &str = "/home/ops/jobs";

    #[test]
    fn test_absolute_path_is_verbatim() {
        let script = ScriptRef::resolve("/abs/path.mjs", Path::new(CWD)).unwrap();
        assert_eq!(script, ScriptRef::Local(PathBuf::from("/abs/path.mjs")));
    }

    #[test]
    fn test_file_url_becomes_path() {
        let script = ScriptRef::resolve("file:///abs/path.mjs", Path::new(CWD)).unwrap();
        assert_eq!(script, ScriptRef::Local(PathBuf::from("/abs/path.mjs")));
    }

    #[test]
    fn test_file_url_is_percent_decoded() {
        let script = ScriptRef::resolve("file:///abs/my%20job.sql", Path::new(CWD)).unwrap();
        assert_eq!(script, ScriptRef::Local(PathBuf::from("/abs/my job.sql")));
    }

    #[test]
    fn test_relative_path_joins_working_dir() {
        let script = ScriptRef::resolve("relative.mjs", Path::new(CWD)).unwrap();
        assert_eq!(
            script,
            ScriptRef::Local(PathBuf::from("/home/ops/jobs/relative.mjs"))
        );
    }

    #[test]
    fn test_remote_urls_are_verbatim() {
        for locator in ["https://example.com/s.mjs", "http://example.com/x?y=1"] {
            let script = ScriptRef::resolve(locator, Path::new(CWD)).unwrap();
            assert_eq!(script, ScriptRef::Remote(locator.to_string()));
        }
    }

    #[test]
    fn test_blank_locator_is_missing_script() {
        let result = ScriptRef::resolve("", Path::new(CWD));
        assert!(matches!(result, Err(PgScriptError::RequiredScriptMissing)));
    }

    #[test]
    fn test_kind_by_extension() {
        let cwd = Path::new(CWD);
        assert_eq!(
            ScriptRef::resolve("migrate.SQL", cwd).unwrap().kind(),
            ScriptKind::Sql
        );
        assert_eq!(
            ScriptRef::resolve("https://example.com/seed.sql?rev=2", cwd)
                .unwrap()
                .kind(),
            ScriptKind::Sql
        );
        assert_eq!(
            ScriptRef::resolve("backup.sh", cwd).unwrap().kind(),
            ScriptKind::Shell
        );
    }

    #[tokio::test]
    async fn test_load_local_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.sql");
        std::fs::write(&path, "SELECT 1;").unwrap();

        let script = ScriptRef::Local(path);
        assert_eq!(script.load().await.unwrap(), "SELECT 1;");
    }

    #[tokio::test]
    async fn test_load_missing_local_script_is_io_error() {
        let script = ScriptRef::Local(PathBuf::from("/definitely/not/here.sql"));
        let result = script.load().await;
        assert!(matches!(result, Err(PgScriptError::Io { .. })));
    }
}

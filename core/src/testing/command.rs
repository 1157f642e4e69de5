use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::serdable::GlobPattern;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InterpError {
    #[error("Undefined variable '{0}' at {1}")]
    UndefinedVar(String, usize),

    #[error("Unclosed brace (found open brace at {0})")]
    UnclosedBrace(usize),
}

/// Expands `#{name}` references. `##` stands for a literal `#`.
/// Positions in errors are one-based character offsets.
pub fn interp(fmt: &str, vars: &HashMap<&str, String>) -> Result<String, InterpError> {
    let mut res = String::with_capacity(fmt.len() * 2);
    let mut chars = fmt.chars().enumerate().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '#' {
            res.push(c);
            continue;
        }
        match chars.peek() {
            Some((_, '#')) => {
                chars.next();
                res.push('#');
            }
            Some((_, '{')) => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(InterpError::UnclosedBrace(i + 2));
                }
                let value = vars
                    .get(name.as_str())
                    .ok_or(InterpError::UndefinedVar(name, i + 1))?;
                res.push_str(value);
            }
            _ => res.push('#'),
        }
    }
    Ok(res)
}

/// How to launch files whose name matches `pattern`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct RunCommandEntry {
    pub pattern: GlobPattern,
    pub command: String,
}

/// Maps file names to command lines. Files matching no entry are executed directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTable {
    entries: Vec<RunCommandEntry>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CommandTable {
    pub fn new(entries: Vec<RunCommandEntry>) -> Self {
        Self { entries }
    }

    /// `*.py` runs under `python3`.
    pub fn builtin() -> Self {
        Self::new(vec![RunCommandEntry {
            pattern: GlobPattern::parse("*.py").unwrap(),
            command: "python3 #{filePath}".to_owned(),
        }])
    }

    /// Entries are tried in order, before the ones already present.
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = RunCommandEntry>) -> Self {
        let mut v: Vec<_> = entries.into_iter().collect();
        v.append(&mut self.entries);
        self.entries = v;
        self
    }

    pub fn find(&self, filename: &str) -> Option<&RunCommandEntry> {
        self.entries.iter().find(|e| e.pattern.matches(filename))
    }

    /// The entry launching `file`, by its file name. `None` means `file` runs directly.
    pub fn find_for(&self, file: &Path) -> Option<&RunCommandEntry> {
        let filename = file
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.find(&filename)
    }

    /// Builds the argv that launches `file`.
    pub fn resolve(&self, file: &Path) -> Result<Vec<String>, InterpError> {
        let Some(entry) = self.find_for(file) else {
            return Ok(vec![executable_path(file).to_string_lossy().into_owned()]);
        };

        let vars = file_vars(file);
        entry
            .command
            .split_whitespace()
            .map(|word| interp(word, &vars))
            .collect()
    }
}

/// A bare relative name would be looked up in `PATH`.
fn executable_path(file: &Path) -> PathBuf {
    if file.is_relative() && file.parent().map_or(true, |p| p.as_os_str().is_empty()) {
        Path::new(".").join(file)
    } else {
        file.to_owned()
    }
}

fn file_vars(file: &Path) -> HashMap<&'static str, String> {
    let lossy = |s: &std::ffi::OsStr| s.to_string_lossy().into_owned();
    let mut m = HashMap::new();
    m.insert("filePath", lossy(file.as_os_str()));
    m.insert("fileName", file.file_name().map(lossy).unwrap_or_default());
    m.insert(
        "fileDir",
        file.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| ".".to_owned(), |p| lossy(p.as_os_str())),
    );
    m.insert("fileStem", file.file_stem().map(lossy).unwrap_or_default());
    m.insert("fileExt", file.extension().map(lossy).unwrap_or_default());
    m
}

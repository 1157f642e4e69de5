use std::{
    fs::{self, ReadDir},
    path::{Path, PathBuf},
};

pub mod error {
    use std::{io, path::PathBuf};

    pub type Result<T> = std::result::Result<T, self::Error>;

    type Msg = &'static str;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("{0} ({1}): {2}")]
        SingleIO(Msg, PathBuf, #[source] io::Error),

        #[error("Invalid glob pattern '{0}': {1}")]
        InvalidGlob(String, #[source] ::glob::PatternError),

        #[error("No file matched glob '{0}'")]
        NoEntryMatchedGlob(String),
    }
}
pub use error::{Error, Result};

#[must_use]
pub fn mkdir_all(path: impl AsRef<Path>) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::SingleIO("Cannot create dir", dir.to_owned(), e))
}

#[must_use]
pub fn write<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    fs::write(&filepath, contents)
        .map_err(|e| Error::SingleIO("Cannot write file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn write_with_mkdir<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    if let Some(dir) = filepath.as_ref().parent() {
        self::mkdir_all(dir)?;
    }
    self::write(filepath, contents)
}

#[must_use]
pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn read_dir(dir: impl AsRef<Path>) -> Result<ReadDir> {
    fs::read_dir(&dir).map_err(|e| Error::SingleIO("Cannot read dir", dir.as_ref().to_owned(), e))
}

/// Normalize the path
/// ```
/// use fsutil::normalize_path;
/// use std::path::Path;
///
/// assert_eq!(normalize_path("./hoge/.config/././foo"), Path::new("hoge/.config/foo"));
/// assert_eq!(normalize_path("hoge/.config/../../bar/."), Path::new("bar"));
/// assert_eq!(normalize_path("./soma.py"), Path::new("soma.py"));
/// assert_eq!(normalize_path("/"), Path::new("/"));
/// assert_eq!(normalize_path("."), Path::new("."));
/// ```
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    use ::std::path::Component;
    let mut stack = Vec::new();
    for c in path.as_ref().components() {
        match c {
            Component::CurDir => (),
            Component::ParentDir if matches!(stack.last(), Some(Component::Normal(_))) => {
                stack.pop();
            }
            _ => stack.push(c),
        }
    }
    if stack.is_empty() {
        stack.push(Component::CurDir);
    }
    stack.iter().collect()
}

/// Regular files directly inside `dir` whose name matches `pattern`, sorted by path.
pub fn list_files_matching(
    dir: impl AsRef<Path>,
    pattern: &::glob::Pattern,
) -> Result<Vec<PathBuf>> {
    let mut res = Vec::new();
    for entry in self::read_dir(&dir)?.filter_map(std::result::Result::ok) {
        let Ok(ft) = entry.file_type() else {
            continue
        };
        if !ft.is_file() {
            continue;
        }
        if pattern.matches(&entry.file_name().to_string_lossy()) {
            res.push(entry.path());
        }
    }
    res.sort();
    Ok(res)
}

/// Expands a command-line file argument.
///
/// An existing path is returned as is. Otherwise the argument is treated as
/// a glob pattern, which must match at least one file.
pub fn expand_file_arg(arg: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(arg);
    if path.exists() {
        return Ok(vec![path.to_owned()]);
    }
    let entries = ::glob::glob(arg).map_err(|e| Error::InvalidGlob(arg.to_owned(), e))?;
    let mut res: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .filter(|p| p.is_file())
        .collect();
    if res.is_empty() {
        return Err(Error::NoEntryMatchedGlob(arg.to_owned()));
    }
    res.sort();
    Ok(res)
}

use once_cell::sync::OnceCell;
use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

pub type Result<T> = std::result::Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot resolve CSV path `{path}`: {source}")]
    PathResolution {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read header row of `{path}`: {source}")]
    HeaderRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{path}` has no header row")]
    EmptyHeaderRow { path: PathBuf },

    #[error("duplicate header `{header}` in `{path}`")]
    DuplicateHeader { path: PathBuf, header: String },

    #[error("headers must be renamed to valid Parquet column names: {}", missing.join(", "))]
    MissingRename { missing: Vec<String> },

    #[error("cannot render a script with zero output headers")]
    EmptyHeaders,

    #[error("header `{header}` contains a backtick and cannot be quoted for Drill")]
    UnquotableHeader { header: String },

    #[error("location `{location}` contains a backtick and cannot be quoted for Drill")]
    UnquotableLocation { location: String },
}

/// A CSV file whose header row names the columns of the Parquet table Drill
/// will build.
///
/// The path is canonicalized up front; a relative path like `../input.csv`
/// would resolve against Drill's working directory, not ours, and produce a
/// confusing engine-side error. The header row itself is only read on first
/// access and cached, so constructing a `CsvSource` is cheap for callers that
/// just need the resolved path. Once read, all state is immutable, so sharing
/// a resolved source across threads is fine.
#[derive(Debug)]
pub struct CsvSource {
    path: PathBuf,
    rename_map: Option<HashMap<String, String>>,
    headers: OnceCell<Vec<String>>,
    header_map: OnceCell<Vec<(String, String)>>,
}

impl CsvSource {
    /// Resolve `path` to its canonical absolute form and wrap it.
    ///
    /// `rename_map`, if given, must cover every header that cannot name a
    /// Parquet column as-is; that is only checked when `header_map` is first
    /// called. Keys that match no header are ignored.
    pub fn new(
        path: impl AsRef<Path>,
        rename_map: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let raw = path.as_ref();
        let path = raw
            .canonicalize()
            .map_err(|source| SourceError::PathResolution {
                path: raw.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path,
            rename_map,
            headers: OnceCell::new(),
            header_map: OnceCell::new(),
        })
    }

    /// Canonical absolute path of the CSV file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ordered header names from the file's first row.
    ///
    /// The first call opens the file and reads one line; later calls return
    /// the cached list even if the file has changed since. Duplicate names are
    /// passed through as-is here — `header_map` is where they get rejected.
    pub fn headers(&self) -> Result<&[String]> {
        let headers = self
            .headers
            .get_or_try_init(|| read_header_row(&self.path))?;
        Ok(headers)
    }

    /// Ordered mapping from every source header to its output column name.
    ///
    /// Headers with an entry in the rename map take the mapped name; the rest
    /// keep their own name. Headers that are not usable as Parquet column
    /// names as-is (Drill reads `a.b` as a table-qualified column) must be
    /// covered by the rename map; `MissingRename` lists every such uncovered
    /// header rather than just the first.
    pub fn header_map(&self) -> Result<&[(String, String)]> {
        let map = self.header_map.get_or_try_init(|| {
            let headers = self.headers()?;

            let mut seen = HashSet::new();
            for header in headers {
                if !seen.insert(header.as_str()) {
                    return Err(SourceError::DuplicateHeader {
                        path: self.path.clone(),
                        header: header.clone(),
                    });
                }
            }

            let renames = self.rename_map.as_ref();
            let missing: Vec<String> = headers
                .iter()
                .filter(|h| {
                    needs_rename(h) && !renames.is_some_and(|m| m.contains_key(h.as_str()))
                })
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(SourceError::MissingRename { missing });
            }

            let resolved = headers
                .iter()
                .map(|h| match renames.and_then(|m| m.get(h.as_str())) {
                    Some(out) => (h.clone(), out.clone()),
                    None => (h.clone(), h.clone()),
                })
                .collect();
            Ok(resolved)
        })?;
        Ok(map)
    }

    /// Output column names in source-header order, ready for script rendering.
    pub fn output_headers(&self) -> Result<Vec<String>> {
        Ok(self
            .header_map()?
            .iter()
            .map(|(_, out)| out.clone())
            .collect())
    }
}

/// Read the first line of `path` and split it into cleaned header cells.
fn read_header_row(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|source| SourceError::HeaderRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|source| SourceError::HeaderRead {
            path: path.to_path_buf(),
            source,
        })?;
    if line.trim().is_empty() {
        return Err(SourceError::EmptyHeaderRow {
            path: path.to_path_buf(),
        });
    }

    let headers: Vec<String> = line
        .trim_end_matches(['\r', '\n'])
        .split(',')
        .map(clean_str)
        .collect();
    debug!(path = %path.display(), count = headers.len(), "read header row");
    Ok(headers)
}

/// A header made of alphanumerics, underscores, dashes, and spaces can name a
/// Parquet column as-is; anything else (periods above all) must be renamed.
fn needs_rename(header: &str) -> bool {
    !header
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '))
}

/// Trim whitespace + strip outer quotes if present.
fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

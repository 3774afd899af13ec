//! Dataset picker: the terminal stand-in for the upload control.
//!
//! Only files the ingest would accept are offered. A CSV without a `ds`
//! column is rejected here with the same schema error `load_dataset` would
//! raise, before any fitting starts.

use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::domain::DATE_COLUMN;
use crate::error::AppError;
use crate::io::ingest::{read_headers, validate_columns};

/// A CSV whose header passed the date-column check.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub path: PathBuf,
    /// Every header except `ds`, in file order.
    pub columns: Vec<String>,
}

/// Accept `path` as an uploaded dataset.
///
/// Checks that it is an existing `.csv` file whose header carries `ds`.
/// Rows are not read; that is left to the ingest.
pub fn validate_csv_path(path: &Path) -> Result<PathBuf, AppError> {
    inspect(path).map(|c| c.path)
}

/// List the datasets in the working directory and let the user pick one.
pub fn prompt_for_csv_path() -> Result<PathBuf, AppError> {
    let candidates = find_datasets(Path::new("."));
    let stdin = io::stdin();
    choose(&candidates, &mut stdin.lock(), &mut io::stdout())
}

/// Datasets directly inside `dir`, sorted by file name.
///
/// CSVs that fail the header check are skipped and logged at debug level.
pub fn find_datasets(dir: &Path) -> Vec<Candidate> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut found: Vec<Candidate> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_csv_extension(path))
        .filter_map(|path| match inspect(&path) {
            Ok(candidate) => Some(candidate),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "skipping csv");
                None
            }
        })
        .collect();
    found.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    found
}

fn inspect(path: &Path) -> Result<Candidate, AppError> {
    if !path.is_file() {
        return Err(AppError::io(format!("CSV file not found: {}", path.display())));
    }
    if !has_csv_extension(path) {
        return Err(AppError::config(format!(
            "Expected a .csv file (got: {}).",
            path.display()
        )));
    }

    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let headers = read_headers(file)
        .map_err(|e| AppError::schema(format!("{}: {}", path.display(), e.message())))?;
    validate_columns(&headers, &[DATE_COLUMN.to_string()])
        .map_err(|e| AppError::schema(format!("{}: {}", path.display(), e.message())))?;

    Ok(Candidate {
        path: path.to_path_buf(),
        columns: headers.into_iter().filter(|h| h != DATE_COLUMN).collect(),
    })
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// The prompt loop, over any input/output pair.
///
/// A number picks from the list, anything else is taken as a path and
/// checked like an upload. `q` or end of input cancels.
fn choose<R: BufRead, W: Write>(
    candidates: &[Candidate],
    input: &mut R,
    out: &mut W,
) -> Result<PathBuf, AppError> {
    let write_err = |e: io::Error| AppError::io(format!("Failed to write prompt: {e}"));

    if candidates.is_empty() {
        writeln!(out, "No dataset (.csv with a `{DATE_COLUMN}` column) in this directory.").map_err(write_err)?;
    } else {
        writeln!(out, "Datasets:").map_err(write_err)?;
        for (n, c) in candidates.iter().enumerate() {
            let name = c.path.file_name().map_or_else(|| c.path.display().to_string(), |f| f.to_string_lossy().into_owned());
            writeln!(out, "{:>3}) {name}  [{}]", n + 1, c.columns.join(", ")).map_err(write_err)?;
        }
    }

    loop {
        write!(out, "Dataset number or path (q to quit): ").map_err(write_err)?;
        out.flush().map_err(write_err)?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|e| AppError::io(format!("Failed to read input: {e}")))?;
        let answer = line.trim();
        if read == 0 || answer.eq_ignore_ascii_case("q") {
            return Err(AppError::config("No dataset selected. Pass one with `-i <file.csv>`."));
        }

        let picked = match answer.parse::<usize>() {
            Ok(n) if (1..=candidates.len()).contains(&n) => Ok(candidates[n - 1].path.clone()),
            Ok(n) => Err(AppError::config(format!("No dataset numbered {n}."))),
            Err(_) => validate_csv_path(Path::new(answer)),
        };
        match picked {
            Ok(path) => return Ok(path),
            Err(err) => writeln!(out, "{err}").map_err(write_err)?,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::ErrorKind;

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("sales.csv"), "\u{feff}ds,y_vendite,meteo_temp\n2024-01-01,10,5\n").unwrap();
        fs::write(root.join("a_contacts.CSV"), "ds,y_clienti\n2024-01-01,3\n").unwrap();
        fs::write(root.join("prices.csv"), "date,price\n2024-01-01,3\n").unwrap();
        fs::write(root.join("notes.txt"), "ds,y\n").unwrap();
        fs::create_dir(root.join("nested.csv")).unwrap();
        dir
    }

    #[test]
    fn only_files_with_a_date_column_are_offered() {
        let dir = workspace();
        let found = find_datasets(dir.path());
        let names: Vec<String> = found
            .iter()
            .map(|c| c.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a_contacts.CSV", "sales.csv"]);
        assert_eq!(found[1].columns, vec!["y_vendite".to_string(), "meteo_temp".to_string()]);
    }

    #[test]
    fn upload_without_date_column_is_a_schema_error() {
        let dir = workspace();
        let err = validate_csv_path(&dir.path().join("prices.csv")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(err.message().contains("Missing required column(s): ds"));

        assert_eq!(validate_csv_path(&dir.path().join("notes.txt")).unwrap_err().kind(), ErrorKind::Config);
        assert_eq!(validate_csv_path(&dir.path().join("gone.csv")).unwrap_err().kind(), ErrorKind::Io);
        assert_eq!(validate_csv_path(&dir.path().join("nested.csv")).unwrap_err().kind(), ErrorKind::Io);
        assert!(validate_csv_path(&dir.path().join("sales.csv")).is_ok());
    }

    #[test]
    fn prompt_retries_until_a_dataset_is_given() {
        let dir = workspace();
        let found = find_datasets(dir.path());
        let bad = dir.path().join("prices.csv");
        let mut input = Cursor::new(format!("7\n{}\n2\n", bad.display()));
        let mut out = Vec::new();

        let picked = choose(&found, &mut input, &mut out).unwrap();
        assert_eq!(picked, dir.path().join("sales.csv"));

        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("2) sales.csv  [y_vendite, meteo_temp]"));
        assert!(shown.contains("No dataset numbered 7."));
        assert!(shown.contains("Missing required column(s): ds"));
    }

    #[test]
    fn end_of_input_cancels() {
        let mut out = Vec::new();
        let err = choose(&[], &mut Cursor::new(""), &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(String::from_utf8(out).unwrap().contains("No dataset"));
    }
}

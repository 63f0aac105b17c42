//! Writing output collections to disk.
//!
//! Files are staged under a temporary name and renamed into place only after
//! every file of the run has been staged, so a failed run leaves no partial
//! JSON behind.

pub mod report;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ConvertResult;
use crate::models::{PersonRecord, TicketRecord};

pub use report::{render_report, write_report, ReportContext, REPORT_FILE};

pub const HUNTERS_FILE: &str = "hunters.json";
pub const TICKETS_FILE: &str = "huntingtickets.json";

/// Pretty JSON, two-space indent, non-ASCII left as is.
pub fn to_json<T: Serialize + ?Sized>(data: &T) -> ConvertResult<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// File names for a collection, split into chunks of `split_count` when set.
fn collection_files<T: Serialize>(
    stem: &str,
    records: &[T],
    split_count: usize,
) -> ConvertResult<Vec<(String, String)>> {
    if split_count == 0 || records.len() <= split_count {
        return Ok(vec![(format!("{}.json", stem), to_json(records)?)]);
    }

    records
        .chunks(split_count)
        .enumerate()
        .map(|(i, chunk)| Ok((format!("{}_{:03}.json", stem, i + 1), to_json(chunk)?)))
        .collect()
}

/// Write `(file name, content)` pairs into a folder, all or nothing.
pub fn write_atomically(
    folder: &Path,
    files: Vec<(String, String)>,
) -> ConvertResult<Vec<PathBuf>> {
    fs::create_dir_all(folder)?;

    let mut staged = Vec::with_capacity(files.len());
    for (name, content) in files {
        let target = folder.join(&name);
        let tmp = folder.join(format!(".{}.tmp", name));
        if let Err(e) = fs::write(&tmp, content) {
            for (tmp, _) in &staged {
                let _ = fs::remove_file(tmp);
            }
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        staged.push((tmp, target));
    }

    let mut written: Vec<PathBuf> = Vec::with_capacity(staged.len());
    let mut pending = staged.into_iter();
    while let Some((tmp, target)) = pending.next() {
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            for (tmp, _) in pending.by_ref() {
                let _ = fs::remove_file(tmp);
            }
            // Undo the renames of this call.
            for target in &written {
                let _ = fs::remove_file(target);
            }
            return Err(e.into());
        }
        written.push(target);
    }
    Ok(written)
}

/// Serialized `(file name, content)` pairs for both collections.
pub fn collection_payloads(
    hunters: &[PersonRecord],
    tickets: &[TicketRecord],
    split_count: usize,
) -> ConvertResult<Vec<(String, String)>> {
    let mut files = collection_files("hunters", hunters, split_count)?;
    files.extend(collection_files("huntingtickets", tickets, split_count)?);
    Ok(files)
}

/// Write both collections. Returns the paths in write order.
pub fn write_collections(
    folder: &Path,
    hunters: &[PersonRecord],
    tickets: &[TicketRecord],
    split_count: usize,
) -> ConvertResult<Vec<PathBuf>> {
    write_atomically(folder, collection_payloads(hunters, tickets, split_count)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(surname: &str) -> PersonRecord {
        PersonRecord {
            surname: surname.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_files() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_collections(
            dir.path(),
            &[person("Иванов")],
            &[TicketRecord::default()],
            0,
        )
        .unwrap();

        assert_eq!(written, vec![dir.path().join(HUNTERS_FILE), dir.path().join(TICKETS_FILE)]);
        let content = fs::read_to_string(dir.path().join(HUNTERS_FILE)).unwrap();
        assert!(content.contains("\"surname\": \"Иванов\""));
        assert!(content.starts_with("[\n  {"));
    }

    #[test]
    fn test_split_files() {
        let dir = tempfile::tempdir().unwrap();
        let hunters: Vec<PersonRecord> =
            (0..5).map(|i| person(&format!("Охотник {}", i))).collect();

        let written = write_collections(dir.path(), &hunters, &[], 2).unwrap();

        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["hunters_001.json", "hunters_002.json", "hunters_003.json", "huntingtickets.json"]
        );
        let last: Vec<PersonRecord> =
            serde_json::from_str(&fs::read_to_string(&written[2]).unwrap()).unwrap();
        assert_eq!(last.len(), 1);
    }

    #[test]
    fn test_no_temp_files_left() {
        let dir = tempfile::tempdir().unwrap();
        write_collections(dir.path(), &[], &[], 0).unwrap();
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_failed_rename_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the way makes the second rename fail.
        fs::create_dir(dir.path().join("b.txt")).unwrap();
        fs::write(dir.path().join("b.txt").join("keep"), "x").unwrap();
        let files = vec![
            ("a.txt".to_string(), "a".to_string()),
            ("b.txt".to_string(), "b".to_string()),
            ("c.txt".to_string(), "c".to_string()),
        ];

        assert!(write_atomically(dir.path(), files).is_err());

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["b.txt"]);
    }
}

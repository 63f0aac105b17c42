//! Category directory (e.g. nationalities): a plain code/name dictionary.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use super::{infer_columns, read_rows};
use crate::error::ReferenceResult;
use crate::parser::load_table;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryEntry {
    pub code: String,
    pub name: String,
}

/// Code ↔ name lookups. When nothing is loaded every lookup misses.
#[derive(Debug, Clone, Default)]
pub struct CategoryDirectory {
    entries: Vec<CategoryEntry>,
    by_code: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl CategoryDirectory {
    pub fn not_loaded() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<CategoryEntry>) -> Self {
        let mut by_code = HashMap::new();
        let mut by_name = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            by_code.insert(entry.code.clone(), i);
            if !entry.name.is_empty() {
                by_name.insert(entry.name.to_lowercase(), i);
            }
        }
        Self {
            entries,
            by_code,
            by_name,
        }
    }

    /// Load from a tabular file with code and name columns.
    pub fn load(path: &Path) -> ReferenceResult<Self> {
        let table = load_table(path, None)?;
        let roles = infer_columns(&table.headers, false)?;
        let entries: Vec<CategoryEntry> = read_rows(&table, roles)
            .into_iter()
            .map(|(code, name, _)| CategoryEntry {
                code: code.trim().to_string(),
                name: name.trim().to_string(),
            })
            .collect();

        tracing::info!(
            path = %path.display(),
            entries = entries.len(),
            "loaded category directory"
        );
        Ok(Self::from_entries(entries))
    }

    /// Load if a path is given; a missing or unreadable file leaves the directory unloaded.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load(path).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "category directory not loaded");
                Self::not_loaded()
            }),
            None => Self::not_loaded(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn name_by_code(&self, code: &str) -> Option<&str> {
        self.by_code
            .get(code.trim())
            .map(|&i| self.entries[i].name.as_str())
    }

    /// Case-insensitive exact name match.
    pub fn code_by_name(&self, name: &str) -> Option<&str> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .map(|&i| self.entries[i].code.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> CategoryDirectory {
        CategoryDirectory::from_entries(vec![
            CategoryEntry { code: "1".into(), name: "Русский".into() },
            CategoryEntry { code: "2".into(), name: "Татарин".into() },
        ])
    }

    #[test]
    fn test_lookups() {
        let dir = sample();
        assert_eq!(dir.name_by_code("2"), Some("Татарин"));
        assert_eq!(dir.code_by_name("русский"), Some("1"));
        assert_eq!(dir.code_by_name("Рус"), None);
    }

    #[test]
    fn test_not_loaded_is_noop() {
        let dir = CategoryDirectory::load_or_empty(Some(Path::new("/no/such/file.csv")));
        assert!(!dir.is_loaded());
        assert_eq!(dir.name_by_code("1"), None);
    }

    #[test]
    fn test_load_from_file_with_named_columns() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Наименование;Код").unwrap();
        writeln!(file, "Русский;1").unwrap();
        writeln!(file, "Мордвин;15").unwrap();

        let dir = CategoryDirectory::load(file.path()).unwrap();
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.name_by_code("15"), Some("Мордвин"));
        assert_eq!(dir.code_by_name("РУССКИЙ"), Some("1"));
    }
}

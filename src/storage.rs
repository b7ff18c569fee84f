use std::fs;
use std::path::{Path, PathBuf};

/// Known- and used-code lists, persisted as two JSON string arrays.
///
/// Loaded once at startup and written back after every mutation.
/// Last write wins; only one watcher process is expected to own the
/// files at a time. Load failures degrade to empty lists so a corrupt
/// file never takes the watcher down.
#[derive(Debug)]
pub struct CodeStore {
    codes_path: PathBuf,
    used_path: PathBuf,
    known: Vec<String>,
    used: Vec<String>,
}

impl CodeStore {
    pub fn load(codes_path: impl Into<PathBuf>, used_path: impl Into<PathBuf>) -> Self {
        let codes_path = codes_path.into();
        let used_path = used_path.into();
        let known = load_list(&codes_path);
        let used = load_list(&used_path);
        tracing::debug!(
            known = known.len(),
            used = used.len(),
            "code store loaded"
        );
        Self {
            codes_path,
            used_path,
            known,
            used,
        }
    }

    /// A code is known if it was ever logged or already has a terminal
    /// outcome recorded.
    pub fn is_known(&self, code: &str) -> bool {
        self.known.iter().any(|c| c == code) || self.used.iter().any(|c| c == code)
    }

    /// Log newly discovered codes and persist the list.
    pub fn record_known(&mut self, codes: &[String]) {
        for code in codes {
            if !self.known.iter().any(|c| c == code) {
                self.known.push(code.clone());
            }
        }
        save_list(&self.codes_path, &self.known);
    }

    /// Retire a code that reached a terminal outcome and persist the list.
    pub fn record_used(&mut self, code: &str) {
        if !self.used.iter().any(|c| c == code) {
            self.used.push(code.to_string());
            save_list(&self.used_path, &self.used);
        }
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }
}

fn load_list(path: &Path) -> Vec<String> {
    if !path.exists() {
        return Vec::new();
    }
    match fs::read_to_string(path).map_err(|e| e.to_string()).and_then(|raw| {
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    }) {
        Ok(list) => list,
        Err(error) => {
            tracing::error!(path = %path.display(), error = %error, "failed to load code list");
            Vec::new()
        }
    }
}

fn save_list(path: &Path, list: &[String]) {
    match serde_json::to_string_pretty(list) {
        Ok(json) => {
            if let Err(error) = fs::write(path, json) {
                tracing::error!(path = %path.display(), %error, "failed to save code list");
            }
        }
        Err(error) => {
            tracing::error!(path = %path.display(), %error, "failed to serialize code list")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let codes = dir.path().join("codes_log.json");
        let used = dir.path().join("codes_used.json");

        {
            let mut store = CodeStore::load(&codes, &used);
            store.record_known(&["ABCDE-FGHIJ-KLMNO-PQRST-UVWXY".to_string()]);
            store.record_used("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY");
        }

        let store = CodeStore::load(&codes, &used);
        assert!(store.is_known("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY"));
        assert_eq!(store.used_count(), 1);
    }

    #[test]
    fn test_absent_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CodeStore::load(dir.path().join("a.json"), dir.path().join("b.json"));
        assert!(!store.is_known("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY"));
        assert_eq!(store.used_count(), 0);
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let codes = dir.path().join("codes_log.json");
        fs::write(&codes, "not json at all").unwrap();

        let store = CodeStore::load(&codes, dir.path().join("used.json"));
        assert!(!store.is_known("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY"));
    }

    #[test]
    fn test_record_used_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store =
            CodeStore::load(dir.path().join("codes.json"), dir.path().join("used.json"));
        store.record_used("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY");
        store.record_used("ABCDE-FGHIJ-KLMNO-PQRST-UVWXY");
        assert_eq!(store.used_count(), 1);
    }
}

//! Loading many stage files at once.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use kinopio_stage::{Result, Stage, StageConfig};

/// Outcome of loading one file.
#[derive(Debug)]
pub struct BatchResult {
    pub path: PathBuf,
    pub stage: Result<Stage>,
}

/// Load every path in parallel. A failure only affects its own entry.
pub fn load_stages<P: AsRef<Path> + Sync>(paths: &[P], config: &StageConfig) -> Vec<BatchResult> {
    paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            BatchResult {
                path: path.to_path_buf(),
                stage: load_stage(path, config),
            }
        })
        .collect()
}

fn load_stage(path: &Path, config: &StageConfig) -> Result<Stage> {
    let data = std::fs::read(path)?;
    let file_name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
    Stage::load_archive(&file_name, &data, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_fail_individually() {
        let paths = ["/nonexistent/FirstStageMap1.szs", "/nonexistent/SecondStageMap1.szs"];
        let results = load_stages(&paths, &StageConfig::default());
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|result| result.stage.is_err()));
        assert_eq!(results[1].path, Path::new("/nonexistent/SecondStageMap1.szs"));
    }
}

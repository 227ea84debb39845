// ============================================================
// Layer 4 - Dataset Archive Extraction
// ============================================================
// The raw dataset ships as one zip archive. Extraction is
// idempotent: if the extraction directory already exists it is
// treated as fully materialised and the archive is not touched
// (it does not even need to exist any more).
//
// The archive is unpacked into a temporary directory next to
// the destination and only renamed into place once every entry
// has been written, so an interrupted extraction never leaves a
// half-populated directory that a later run would trust.
//
// Layout expected inside the archive:
//   <top-level dir>/lung_image_sets/<class>/*.jpeg
// The top-level dir name is the last component of `extract_dir`.

use std::fs::{self, File};
use std::path::Path;

use zip::ZipArchive;

use crate::domain::error::{PipelineError, PipelineResult};

/// Ensure `extract_dir` exists, expanding `archive` into its parent if needed.
///
/// Returns true when an extraction actually happened.
pub fn extract_if_needed(archive: &Path, extract_dir: &Path) -> PipelineResult<bool> {
    if extract_dir.is_dir() {
        tracing::debug!("'{}' already extracted, skipping", extract_dir.display());
        return Ok(false);
    }

    if !archive.is_file() {
        return Err(PipelineError::TrainingData(format!(
            "dataset archive '{}' not found and '{}' does not exist",
            archive.display(),
            extract_dir.display()
        )));
    }

    let parent = extract_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let top_level = extract_dir.file_name().ok_or_else(|| {
        PipelineError::TrainingData(format!("invalid extract dir '{}'", extract_dir.display()))
    })?;
    fs::create_dir_all(parent)?;

    tracing::info!("Extracting '{}' ...", archive.display());

    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(parent)?;

    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)
        .map_err(|e| PipelineError::TrainingData(format!("bad archive: {e}")))?;
    zip.extract(staging.path())
        .map_err(|e| PipelineError::TrainingData(format!("extraction failed: {e}")))?;

    let unpacked = staging.path().join(top_level);
    if !unpacked.is_dir() {
        return Err(PipelineError::TrainingData(format!(
            "archive does not contain top-level directory '{}'",
            top_level.to_string_lossy()
        )));
    }

    fs::rename(&unpacked, extract_dir)?;
    tracing::info!("Extracted dataset to '{}'", extract_dir.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extracts_once() {
        let tmp     = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("data.zip");
        let target  = tmp.path().join("raw").join("image_set");
        write_zip(&archive, &[("image_set/lung_n/a.txt", b"hello")]);

        assert!(extract_if_needed(&archive, &target).unwrap());
        assert!(target.join("lung_n/a.txt").is_file());

        // archive removed: second call must not need it
        fs::remove_file(&archive).unwrap();
        assert!(!extract_if_needed(&archive, &target).unwrap());
    }

    #[test]
    fn test_missing_archive_is_training_data_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = extract_if_needed(&tmp.path().join("nope.zip"), &tmp.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::TrainingData(_)));
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn test_wrong_top_level_leaves_no_directory() {
        let tmp     = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("data.zip");
        write_zip(&archive, &[("other/x.txt", b"x")]);
        let target = tmp.path().join("image_set");
        assert!(extract_if_needed(&archive, &target).is_err());
        assert!(!target.exists());
    }
}

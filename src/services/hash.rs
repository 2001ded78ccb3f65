//! File fingerprints used to detect re-imports of the same report pair

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::types::FileHashes;

#[derive(Debug, Error)]
#[error("{report} file {}", path.display())]
pub struct HashError {
    pub report: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// SHA-256 of a file's contents as lowercase hex, streamed from disk.
pub fn calculate_file_hash(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Digests for both reports. The pair is order-sensitive.
pub fn calculate_file_hashes(jobs_path: &Path, invoices_path: &Path) -> Result<FileHashes, HashError> {
    let jobs_hash = calculate_file_hash(jobs_path).map_err(|source| HashError {
        report: "jobs",
        path: jobs_path.to_path_buf(),
        source,
    })?;
    let invoices_hash = calculate_file_hash(invoices_path).map_err(|source| HashError {
        report: "invoices",
        path: invoices_path.to_path_buf(),
        source,
    })?;

    Ok(FileHashes {
        jobs_hash,
        invoices_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_hash_matches_known_sha256() {
        let file = temp_file("abc");
        let hash = calculate_file_hash(file.path()).unwrap();
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_pair_is_order_sensitive() {
        let jobs = temp_file("Job ID,Status\n1,Completed\n");
        let invoices = temp_file("Invoice #,Job #\n10,1\n");

        let forward = calculate_file_hashes(jobs.path(), invoices.path()).unwrap();
        let swapped = calculate_file_hashes(invoices.path(), jobs.path()).unwrap();

        assert_ne!(forward, swapped);
        assert_eq!(forward.jobs_hash, swapped.invoices_hash);
    }

    #[test]
    fn test_missing_file_names_the_report() {
        let jobs = temp_file("x");
        let err = calculate_file_hashes(jobs.path(), Path::new("/nonexistent/invoices.csv"))
            .unwrap_err();
        assert_eq!(err.report, "invoices");
        assert!(err.to_string().contains("invoices file"));
    }
}

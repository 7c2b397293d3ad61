//! Bulk archive acquisition
//!
//! Downloads the published ZIP archive (with retry and exponential backoff)
//! unless a cached copy already exists, then extracts the single CSV entry
//! into the cache directory. The rest of the loader only ever sees the
//! extracted file.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};
use zip::ZipArchive;

use crate::config::SourceConfig;
use crate::error::{IngestError, Result};

/// HTTP client for the bulk data archive
pub struct ArchiveFetcher {
    client: Client,
    config: SourceConfig,
}

impl ArchiveFetcher {
    /// Create a new fetcher with configuration
    pub fn new(config: SourceConfig) -> Result<Self> {
        if config.archive_url.is_empty() {
            return Err(IngestError::Config("archive URL cannot be empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("chb-ingest/0.1")
            .build()?;

        Ok(Self { client, config })
    }

    /// Path the downloaded archive lands at.
    pub fn archive_path(&self) -> PathBuf {
        let filename = self
            .config
            .archive_url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("bulk-archive.zip");
        self.config.cache_dir.join(filename)
    }

    /// Ensure the archive is on disk, downloading it if necessary.
    ///
    /// Returns the local archive path. An existing file is reused as-is so
    /// re-runs skip the (large) download.
    pub async fn fetch(&self) -> Result<PathBuf> {
        let path = self.archive_path();
        if path.exists() {
            info!(path = %path.display(), "archive already cached, skipping download");
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.config.cache_dir).await?;

        let bytes = self.download_with_retry(&self.config.archive_url).await?;
        tokio::fs::write(&path, &bytes).await?;

        info!(
            path = %path.display(),
            size_bytes = bytes.len(),
            "archive downloaded"
        );

        Ok(path)
    }

    /// Extract the CSV entry from the archive into the cache directory.
    ///
    /// Returns the extracted file's path. Extraction is skipped when the
    /// output already exists with the expected size.
    pub fn extract_csv(&self, archive_path: &Path) -> Result<PathBuf> {
        let file = File::open(archive_path)?;
        let mut archive = ZipArchive::new(file)?;

        let mut csv_index = None;
        for index in 0..archive.len() {
            let entry = archive.by_index(index)?;
            if entry.name().ends_with(".csv") {
                csv_index = Some(index);
                break;
            }
        }
        let csv_index = csv_index.ok_or_else(|| {
            IngestError::Archive(format!(
                "no CSV entry found in {}",
                archive_path.display()
            ))
        })?;

        let mut entry = archive.by_index(csv_index)?;
        let entry_name = entry
            .name()
            .rsplit('/')
            .next()
            .unwrap_or("companies.csv")
            .to_string();
        let out_path = self.config.cache_dir.join(entry_name);

        if let Ok(metadata) = std::fs::metadata(&out_path) {
            if metadata.len() == entry.size() {
                info!(path = %out_path.display(), "CSV already extracted, reusing");
                return Ok(out_path);
            }
        }

        info!(
            entry = entry.name(),
            size_bytes = entry.size(),
            "extracting CSV from archive"
        );
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;

        Ok(out_path)
    }

    /// Download a URL with retry and exponential backoff.
    async fn download_with_retry(&self, url: &str) -> Result<Vec<u8>> {
        let mut last_error = None;

        for attempt in 1..=self.config.max_retries {
            match self.download_url(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) => {
                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %err,
                        "download attempt failed"
                    );
                    last_error = Some(err);

                    if attempt < self.config.max_retries {
                        let backoff_secs = 2u64.pow(attempt);
                        info!(backoff_secs, "retrying download");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    }
                },
            }
        }

        Err(last_error.unwrap_or_else(|| {
            IngestError::Archive(format!(
                "download of {url} failed after {} attempts",
                self.config.max_retries
            ))
        }))
    }

    async fn download_url(&self, url: &str) -> Result<Vec<u8>> {
        info!(url, "downloading archive");
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(IngestError::Archive(format!(
                "HTTP {} fetching {}",
                response.status(),
                url
            )));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn fetcher_for(dir: &Path) -> ArchiveFetcher {
        let config = SourceConfig {
            cache_dir: dir.to_path_buf(),
            ..SourceConfig::default()
        };
        ArchiveFetcher::new(config).unwrap()
    }

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn archive_path_uses_url_filename() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_for(dir.path());

        let path = fetcher.archive_path();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "BasicCompanyDataAsOneFile-2023-09-01.zip"
        );
    }

    #[test]
    fn extract_csv_finds_and_extracts_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bulk.zip");
        write_zip(
            &archive,
            &[
                ("README.txt", "not this one"),
                ("BasicCompanyData.csv", "name,number\nACME,01\n"),
            ],
        );

        let fetcher = fetcher_for(dir.path());
        let csv_path = fetcher.extract_csv(&archive).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(content, "name,number\nACME,01\n");
        assert_eq!(
            csv_path.file_name().unwrap().to_str().unwrap(),
            "BasicCompanyData.csv"
        );
    }

    #[test]
    fn extract_csv_reuses_existing_output_of_matching_size() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bulk.zip");
        let content = "name,number\nACME,01\n";
        write_zip(&archive, &[("data.csv", content)]);

        let fetcher = fetcher_for(dir.path());
        let first = fetcher.extract_csv(&archive).unwrap();
        let modified_before = std::fs::metadata(&first).unwrap().modified().unwrap();

        let second = fetcher.extract_csv(&archive).unwrap();
        let modified_after = std::fs::metadata(&second).unwrap().modified().unwrap();

        assert_eq!(first, second);
        assert_eq!(modified_before, modified_after);
    }

    #[test]
    fn archive_without_csv_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bulk.zip");
        write_zip(&archive, &[("README.txt", "nothing here")]);

        let fetcher = fetcher_for(dir.path());
        let err = fetcher.extract_csv(&archive).unwrap_err();
        assert!(matches!(err, IngestError::Archive(_)));
    }
}

// ============================================================
// Layer 4 — Archive Download and Extraction
// ============================================================
// Streams a remote .tar.gz to disk and unpacks it in place.
// No retries and no integrity check: the SHA-256 of the bytes
// is only reported so runs can be compared by eye.
//
// Reference: reqwest, flate2 and tar crate documentation

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    path::Path,
};

/// Some object stores reject requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0";

pub struct ArchiveFetcher {
    client: reqwest::blocking::Client,
}

impl ArchiveFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Cannot build HTTP client")?;
        Ok(Self { client })
    }

    /// Download `url` into `dest`, returning the hex SHA-256 of the body.
    pub fn fetch(&self, url: &str, dest: &Path) -> Result<String> {
        tracing::info!("Downloading '{}' to '{}'", url, dest.display());

        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Request to '{url}' failed"))?
            .error_for_status()
            .with_context(|| format!("Server refused '{url}'"))?;

        let file = File::create(dest)
            .with_context(|| format!("Cannot create '{}'", dest.display()))?;
        let mut writer = HashingWriter::new(BufWriter::new(file));

        let mut body = response;
        let bytes = io::copy(&mut body, &mut writer)
            .with_context(|| format!("Cannot write '{}'", dest.display()))?;
        let digest = writer.finish()?;

        tracing::info!("Downloaded {} bytes (sha256 {})", bytes, digest);
        Ok(digest)
    }
}

/// Unpack a gzip-compressed tarball into `into`.
pub fn extract_tar_gz(archive: &Path, into: &Path) -> Result<()> {
    fs::create_dir_all(into)
        .with_context(|| format!("Cannot create '{}'", into.display()))?;

    let file = File::open(archive)
        .with_context(|| format!("Cannot open '{}'", archive.display()))?;

    tar::Archive::new(GzDecoder::new(file))
        .unpack(into)
        .with_context(|| format!("Cannot extract '{}' into '{}'", archive.display(), into.display()))?;

    tracing::info!("Extracted '{}' into '{}'", archive.display(), into.display());
    Ok(())
}

/// Hex SHA-256 of any reader.
pub fn sha256_hex(mut reader: impl Read) -> Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Forwards writes while hashing them.
struct HashingWriter<W: Write> {
    inner:  W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, hasher: Sha256::new() }
    }

    fn finish(mut self) -> Result<String> {
        self.inner.flush()?;
        Ok(format!("{:x}", self.hasher.finalize()))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

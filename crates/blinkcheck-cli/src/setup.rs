//! `blinkcheck setup`: downloads the Haar cascades used for face and eye detection.

use anyhow::{bail, Context, Result};
use blinkcheck_models::{looks_like_cascade, verify_cascade_file, write_sidecar, CascadeAsset, CASCADES};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

/// Size of the leading slice kept for the format check.
const HEAD_BYTES: usize = 16 * 1024;

/// Copy `reader` into `sink`, printing a percentage line at every tenth of
/// `expected`. Returns the byte count and the first `HEAD_BYTES` of the body.
fn stream_with_progress(
    reader: &mut impl Read,
    sink: &mut impl Write,
    expected: Option<u64>,
) -> io::Result<(u64, Vec<u8>)> {
    let mut chunk = vec![0u8; 64 * 1024];
    let mut head = Vec::with_capacity(HEAD_BYTES);
    let mut written = 0u64;
    let mut shown_decile = 0u64;

    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        sink.write_all(&chunk[..n])?;
        let room = HEAD_BYTES.saturating_sub(head.len());
        head.extend_from_slice(&chunk[..n.min(room)]);
        written += n as u64;

        if let Some(total) = expected.filter(|&t| t > 0) {
            let decile = written * 10 / total;
            if decile > shown_decile {
                shown_decile = decile;
                print!("  {}%\r", (decile * 10).min(100));
                io::stdout().flush().ok();
            }
        }
    }

    sink.flush()?;
    Ok((written, head))
}

/// Stream `body` into a fresh file at `partial`. The file is removed again if
/// the transfer fails partway.
fn receive_into(
    partial: &Path,
    body: &mut impl Read,
    expected: Option<u64>,
) -> Result<(u64, Vec<u8>)> {
    let mut file = fs::File::create(partial)
        .with_context(|| format!("failed to create {}", partial.display()))?;
    let streamed = stream_with_progress(body, &mut file, expected);
    drop(file);

    streamed.map_err(|e| {
        fs::remove_file(partial).ok();
        e.into()
    })
}

/// Fetch one cascade into `dest`. The body lands in a `.part` file first and
/// is only renamed into place once it looks like a cascade document; the
/// partial file is removed on any failure.
fn download_cascade(asset: &CascadeAsset, dest: &Path) -> Result<()> {
    let partial = dest.with_extension("xml.part");

    println!("  downloading {} ({})...", asset.name, asset.size_display);
    tracing::debug!(url = asset.url, "fetching cascade");

    let resp = ureq::get(asset.url)
        .call()
        .with_context(|| format!("failed to download {}", asset.url))?;
    let expected = resp
        .headers()
        .get("Content-Length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let mut body = resp.into_body().into_reader();
    let (bytes, head) = receive_into(&partial, &mut body, expected)
        .with_context(|| format!("download of {} interrupted", asset.name))?;

    if !looks_like_cascade(&head) {
        fs::remove_file(&partial).ok();
        bail!("{} did not return an OpenCV cascade document", asset.url);
    }

    fs::rename(&partial, dest).with_context(|| {
        format!("failed to move {} into place", partial.display())
    })?;

    let digest = write_sidecar(dest)?;
    println!("  {} ok (sha256 {digest})", asset.name);
    tracing::info!(asset = asset.name, bytes, sha256 = %digest, "cascade installed");

    Ok(())
}

/// Run the setup command: download and record the cascade files.
pub fn run(dir: &Path) -> Result<()> {
    println!("Cascade directory: {}", dir.display());

    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;

    let mut downloaded = 0;
    let mut skipped = 0;

    for asset in CASCADES {
        let dest = dir.join(asset.name);
        if dest.exists() {
            match verify_cascade_file(asset.name, &dest) {
                Ok(()) => {
                    println!("  {} already present (ok)", asset.name);
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    println!("  {} exists but failed verification, re-downloading", asset.name);
                    tracing::warn!(asset = asset.name, error = %e, "existing cascade rejected");
                }
            }
        }

        download_cascade(asset, &dest)?;
        downloaded += 1;
    }

    println!();
    if downloaded > 0 {
        println!("Setup complete: {downloaded} cascade(s) downloaded, {skipped} already present.");
    } else {
        println!("All cascades already present. Nothing to download.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Yields `good` bytes, then fails.
    struct FailingReader {
        good: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.good == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            let n = self.good.min(buf.len());
            buf[..n].fill(b'x');
            self.good -= n;
            Ok(n)
        }
    }

    #[test]
    fn stream_keeps_only_the_head() {
        let body = vec![b'a'; HEAD_BYTES * 3];
        let mut sink = Vec::new();
        let (bytes, head) =
            stream_with_progress(&mut body.as_slice(), &mut sink, Some(body.len() as u64)).unwrap();
        assert_eq!(bytes, body.len() as u64);
        assert_eq!(sink, body);
        assert_eq!(head.len(), HEAD_BYTES);
    }

    #[test]
    fn stream_surfaces_read_errors() {
        let mut sink = Vec::new();
        let err = stream_with_progress(&mut FailingReader { good: 100 }, &mut sink, None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(sink.len(), 100);
    }

    #[test]
    fn interrupted_transfer_leaves_no_partial_file() {
        let dir = std::env::temp_dir().join(format!(
            "blinkcheck-setup-test-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::create_dir_all(&dir).unwrap();
        let partial = dir.join("haarcascade_eye.xml.part");

        assert!(receive_into(&partial, &mut FailingReader { good: 4096 }, Some(8192)).is_err());
        assert!(!partial.exists());

        let (bytes, _) = receive_into(&partial, &mut &b"<opencv_storage>"[..], None).unwrap();
        assert_eq!(bytes, 16);
        assert!(partial.exists());

        let _ = fs::remove_dir_all(&dir);
    }
}

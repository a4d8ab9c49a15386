use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which detector a cascade asset feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Face,
    Eye,
}

/// Cascade asset descriptor: role, filename, download URL, human-readable size.
pub struct CascadeAsset {
    pub kind: AssetKind,
    pub name: &'static str,
    pub url: &'static str,
    pub size_display: &'static str,
}

pub const CASCADES: &[CascadeAsset] = &[
    CascadeAsset {
        kind: AssetKind::Face,
        name: "haarcascade_frontalface_alt2.xml",
        url: "https://raw.githubusercontent.com/opencv/opencv/master/data/haarcascades/haarcascade_frontalface_alt2.xml",
        size_display: "530 KB",
    },
    CascadeAsset {
        kind: AssetKind::Eye,
        name: "haarcascade_eye.xml",
        url: "https://raw.githubusercontent.com/anaustinbeing/haar-cascade-files/master/haarcascade_eye.xml",
        size_display: "330 KB",
    },
];

/// Root element every OpenCV cascade document carries.
const CASCADE_ROOT_TAG: &[u8] = b"<opencv_storage>";

/// How far into the file the root element may appear (after the XML
/// declaration and the license comment block).
const CASCADE_PROBE_BYTES: usize = 16 * 1024;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("cascade file not found: {name} ({path})")]
    MissingAsset { name: &'static str, path: PathBuf },

    #[error("failed to open cascade file: {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read cascade file: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write checksum file: {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not an OpenCV cascade document")]
    NotCascade { path: PathBuf },

    #[error("malformed checksum file: {path}")]
    InvalidSidecar { path: PathBuf },

    #[error(
        "cascade checksum mismatch for {name} ({path})\n  expected: {expected}\n  got:      {got}"
    )]
    ChecksumMismatch {
        name: &'static str,
        path: PathBuf,
        expected: String,
        got: String,
    },
}

pub fn asset(kind: AssetKind) -> &'static CascadeAsset {
    match kind {
        AssetKind::Face => &CASCADES[0],
        AssetKind::Eye => &CASCADES[1],
    }
}

/// Determine the cascade directory.
///
/// When running as root (UID 0), defaults to `/usr/share/blinkcheck/cascades`.
/// Otherwise defaults to `$XDG_DATA_HOME/blinkcheck/cascades`
/// (~/.local/share/blinkcheck/cascades).
pub fn default_cascade_dir() -> PathBuf {
    if is_root() {
        PathBuf::from("/usr/share/blinkcheck/cascades")
    } else {
        let data_home = std::env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            format!("{home}/.local/share")
        });
        PathBuf::from(data_home).join("blinkcheck/cascades")
    }
}

fn is_root() -> bool {
    // SAFETY: geteuid is always safe to call.
    unsafe { libc::geteuid() == 0 }
}

/// Path of the checksum file written next to a downloaded asset.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file_hex(path: &Path) -> Result<String, AssetError> {
    let mut file = fs::File::open(path).map_err(|source| AssetError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = file.read(&mut buf).map_err(|source| AssetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Record the current digest of `path` in its sidecar file.
pub fn write_sidecar(path: &Path) -> Result<String, AssetError> {
    let digest = sha256_file_hex(path)?;
    let sidecar = sidecar_path(path);
    fs::write(&sidecar, format!("{digest}\n")).map_err(|source| AssetError::Write {
        path: sidecar,
        source,
    })?;
    Ok(digest)
}

fn read_sidecar(sidecar: &Path) -> Result<String, AssetError> {
    let contents = fs::read_to_string(sidecar).map_err(|source| AssetError::Read {
        path: sidecar.to_path_buf(),
        source,
    })?;
    let digest = contents.split_whitespace().next().unwrap_or_default();
    if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AssetError::InvalidSidecar {
            path: sidecar.to_path_buf(),
        });
    }
    Ok(digest.to_ascii_lowercase())
}

/// True if `bytes` looks like the head of an OpenCV cascade XML document.
pub fn looks_like_cascade(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(CASCADE_PROBE_BYTES)];
    head.windows(CASCADE_ROOT_TAG.len())
        .any(|w| w == CASCADE_ROOT_TAG)
}

fn check_cascade_format(path: &Path) -> Result<(), AssetError> {
    let file = fs::File::open(path).map_err(|source| AssetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut head = Vec::with_capacity(CASCADE_PROBE_BYTES);
    file.take(CASCADE_PROBE_BYTES as u64)
        .read_to_end(&mut head)
        .map_err(|source| AssetError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if !looks_like_cascade(&head) {
        return Err(AssetError::NotCascade {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Verify one cascade file: present, a cascade document, and matching its
/// sidecar checksum when one exists.
pub fn verify_cascade_file(name: &'static str, path: &Path) -> Result<(), AssetError> {
    if !path.exists() {
        return Err(AssetError::MissingAsset {
            name,
            path: path.to_path_buf(),
        });
    }

    check_cascade_format(path)?;

    let sidecar = sidecar_path(path);
    if sidecar.exists() {
        let expected = read_sidecar(&sidecar)?;
        let digest = sha256_file_hex(path)?;
        if digest != expected {
            return Err(AssetError::ChecksumMismatch {
                name,
                path: path.to_path_buf(),
                expected,
                got: digest,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASCADE_DOC: &[u8] = b"<?xml version=\"1.0\"?>\n<!-- license -->\n<opencv_storage>\n<cascade type_id=\"opencv-cascade-classifier\"></cascade>\n</opencv_storage>\n";

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "blinkcheck-models-test-{tag}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn verify_cascade_file_rejects_missing() {
        let dir = scratch_dir("missing");
        let path = dir.join("nope.xml");

        let err = verify_cascade_file("nope.xml", &path).unwrap_err();
        assert!(matches!(err, AssetError::MissingAsset { .. }));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn verify_cascade_file_rejects_non_cascade() {
        let dir = scratch_dir("format");
        let path = dir.join("face.xml");
        fs::write(&path, b"<html>404: Not Found</html>").unwrap();

        let err = verify_cascade_file("face.xml", &path).unwrap_err();
        assert!(matches!(err, AssetError::NotCascade { .. }));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn verify_cascade_file_accepts_without_sidecar() {
        let dir = scratch_dir("nosidecar");
        let path = dir.join("face.xml");
        fs::write(&path, CASCADE_DOC).unwrap();

        verify_cascade_file("face.xml", &path).unwrap();

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn verify_cascade_file_checks_sidecar() {
        let dir = scratch_dir("sidecar");
        let path = dir.join("face.xml");
        fs::write(&path, CASCADE_DOC).unwrap();

        let digest = write_sidecar(&path).unwrap();
        assert_eq!(digest, sha256_file_hex(&path).unwrap());
        verify_cascade_file("face.xml", &path).unwrap();

        let mut tampered = CASCADE_DOC.to_vec();
        tampered.extend_from_slice(b"<!-- edited -->\n");
        fs::write(&path, tampered).unwrap();
        let err = verify_cascade_file("face.xml", &path).unwrap_err();
        assert!(matches!(err, AssetError::ChecksumMismatch { .. }));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn verify_cascade_file_rejects_malformed_sidecar() {
        let dir = scratch_dir("badsidecar");
        let path = dir.join("eye.xml");
        fs::write(&path, CASCADE_DOC).unwrap();
        fs::write(sidecar_path(&path), "not-a-digest\n").unwrap();

        let err = verify_cascade_file("eye.xml", &path).unwrap_err();
        assert!(matches!(err, AssetError::InvalidSidecar { .. }));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn sidecar_path_appends_extension() {
        let p = sidecar_path(Path::new("/data/haarcascade_eye.xml"));
        assert_eq!(p, PathBuf::from("/data/haarcascade_eye.xml.sha256"));
    }

    #[test]
    fn asset_lookup_by_kind() {
        assert_eq!(asset(AssetKind::Face).name, "haarcascade_frontalface_alt2.xml");
        assert_eq!(asset(AssetKind::Eye).name, "haarcascade_eye.xml");
    }

    #[test]
    fn asset_lookup_matches_manifest_kind() {
        for kind in [AssetKind::Face, AssetKind::Eye] {
            assert_eq!(asset(kind).kind, kind);
        }
    }

    #[test]
    fn looks_like_cascade_ignores_root_past_probe() {
        let mut doc = vec![b' '; CASCADE_PROBE_BYTES];
        doc.extend_from_slice(CASCADE_ROOT_TAG);
        assert!(!looks_like_cascade(&doc));
        assert!(looks_like_cascade(CASCADE_DOC));
    }
}

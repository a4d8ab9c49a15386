//! `blinkcheck check`: confirm both cascades are installed and load.

use anyhow::{bail, Result};
use blinkcheck_hw::{CascadeDetector, CascadeParams};
use blinkcheck_models::{verify_cascade_file, CASCADES};
use std::path::Path;

/// Verify each cascade on disk, then load it into OpenCV.
///
/// Every asset is reported even after a failure; the command fails if any did.
pub fn run(cascade_dir: &Path) -> Result<()> {
    println!("Cascade directory: {}", cascade_dir.display());

    let mut failures = 0;
    for asset in CASCADES {
        let path = cascade_dir.join(asset.name);

        if let Err(e) = verify_cascade_file(asset.name, &path) {
            println!("  {:?} {}: {e}", asset.kind, asset.name);
            failures += 1;
            continue;
        }

        match CascadeDetector::load(&path, CascadeParams::default()) {
            Ok(_) => println!("  {:?} {}: ok", asset.kind, asset.name),
            Err(e) => {
                println!("  {:?} {}: {e}", asset.kind, asset.name);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} cascade(s) unusable; run `blinkcheck setup`");
    }

    println!("All cascades load.");
    Ok(())
}

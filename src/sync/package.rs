// src/sync/package.rs

//! Firmware packaging
//!
//! Turns a downloaded firmware blob and its component into a published
//! cabinet:
//! 1. hash the blob (SHA-1 and SHA-256, one pass)
//! 2. stamp the digests onto every release of the component
//! 3. write the metainfo fragment next to the blob
//! 4. build `<firmware>.cab` with the cabinet tool
//! 5. upload the cabinet under its file name

use crate::appstream::{Checksum, Component};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::hash::{FirmwareDigests, HashAlgorithm};
use crate::storage::Storage;
use crate::tools;
use std::path::Path;
use tracing::debug;

/// File name of the metainfo fragment packed into each cabinet
pub const METAINFO_FILENAME: &str = "firmware.metainfo.xml";

/// Storage key of the cabinet built for `filename`
pub fn cabinet_name(filename: &str) -> String {
    format!("{filename}.cab")
}

/// Hash a firmware file without blocking the runtime
pub async fn digest_file(path: &Path) -> Result<FirmwareDigests> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || FirmwareDigests::from_file(&owned))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
        .map_err(|e| Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))))
}

/// Replace the checksums of every release with content digests of `filename`
pub fn apply_checksums(component: &mut Component, filename: &str, digests: &FirmwareDigests) {
    for release in &mut component.releases {
        release.checksums = vec![
            Checksum::content(HashAlgorithm::Sha1, filename, digests.get(HashAlgorithm::Sha1)),
            Checksum::content(HashAlgorithm::Sha256, filename, digests.get(HashAlgorithm::Sha256)),
        ];
    }
}

/// Package `work_dir/<filename>` and upload the cabinet
///
/// On success the component carries the checksums of the packaged blob.
/// The caller owns `work_dir` and removes it afterwards.
pub async fn assemble(
    config: &SyncConfig,
    storage: &dyn Storage,
    work_dir: &Path,
    filename: &str,
    component: &mut Component,
) -> Result<()> {
    let blob = work_dir.join(filename);
    let digests = digest_file(&blob).await?;
    debug!("{}: sha256 {}", filename, digests.sha256);

    apply_checksums(component, filename, &digests);

    let metainfo = work_dir.join(METAINFO_FILENAME);
    tokio::fs::write(&metainfo, component.to_xml()?).await?;

    let cabinet_key = cabinet_name(filename);
    let cabinet = work_dir.join(&cabinet_key);
    tools::build_cabinet(&config.cabinet_tool, &cabinet, &metainfo, &blob).await?;

    let data = tokio::fs::read(&cabinet).await?;
    storage.write(&cabinet_key, &data).await?;
    debug!("Uploaded {} to {}", cabinet_key, storage.name());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appstream::{ChecksumTarget, Release};

    #[test]
    fn test_apply_checksums_replaces_existing() {
        let mut component = Component::firmware("com.example.fw", "FW");
        let mut release = Release::new("1.0");
        release
            .checksums
            .push(Checksum::content(HashAlgorithm::Sha1, "vendor-name.bin", "stale"));
        component.releases.push(release);
        component.releases.push(Release::new("0.9"));

        let digests = FirmwareDigests::from_bytes(b"payload");
        apply_checksums(&mut component, "fw.bin", &digests);

        for release in &component.releases {
            assert_eq!(release.checksums.len(), 2);
            assert_eq!(release.checksums[0].algorithm, HashAlgorithm::Sha1);
            assert_eq!(release.checksums[1].algorithm, HashAlgorithm::Sha256);
            assert!(release.checksums.iter().all(|c| c.filename == "fw.bin"));
            assert!(release.checksums.iter().all(|c| c.target == ChecksumTarget::Content));
            assert_eq!(release.checksums[1].value, digests.sha256);
        }
    }

    #[tokio::test]
    async fn test_digest_file_matches_bytes() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("fw.bin");
        std::fs::write(&path, b"firmware bytes").unwrap();

        let digests = digest_file(&path).await.unwrap();
        assert_eq!(digests, FirmwareDigests::from_bytes(b"firmware bytes"));

        assert!(digest_file(&temp.path().join("missing.bin")).await.is_err());
    }

    #[test]
    fn test_cabinet_name() {
        assert_eq!(cabinet_name("bios.exe"), "bios.exe.cab");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_assemble_uploads_cabinet() {
        use crate::storage::LocalStorage;
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let tool = temp.path().join("cab");
        std::fs::write(&tool, "#!/bin/sh\ncat \"$4\" > \"$2\"\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = SyncConfig::new(temp.path().join("cache"));
        config.cabinet_tool = tool.to_string_lossy().into_owned();
        let storage = LocalStorage::new(temp.path().join("out")).unwrap();

        let work_dir = config.work_dir("fw.bin");
        std::fs::create_dir_all(&work_dir).unwrap();
        std::fs::write(work_dir.join("fw.bin"), b"payload").unwrap();

        let mut component = Component::firmware("com.example.fw", "FW");
        component.releases.push(Release::new("1.0"));
        assemble(&config, &storage, &work_dir, "fw.bin", &mut component)
            .await
            .unwrap();

        assert_eq!(storage.read("fw.bin.cab").await.unwrap(), b"payload");
        assert!(work_dir.join(METAINFO_FILENAME).exists());
        assert_eq!(component.releases[0].checksums.len(), 2);
    }
}

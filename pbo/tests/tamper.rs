//! Any single corrupted or missing byte must be caught by the trailer check.

use std::fs;

use pbo::{create, CreateOptions, ReadOptions, SignatureStatus};
use pbo_core::ArchiveReader;
use proptest::prelude::*;

fn sample_archive() -> Vec<u8> {
    let tmp = tempfile::tempdir().unwrap();
    let data = tmp.path().join("data");
    fs::create_dir_all(data.join("textures")).unwrap();
    fs::write(data.join("config.cpp"), b"class CfgPatches { class sample {}; };").unwrap();
    fs::write(data.join("textures/icon.paa"), vec![0xaa; 300]).unwrap();
    fs::write(tmp.path().join("readme.txt"), b"").unwrap();

    let archive = tmp.path().join("sample.pbo");
    create(
        &archive,
        [data, tmp.path().join("readme.txt")],
        CreateOptions::default(),
    )
    .unwrap();
    fs::read(archive).unwrap()
}

proptest! {
    #[test]
    fn prop_flipped_byte_detected(position in any::<prop::sample::Index>(), mask in 1u8..=255) {
        let mut bytes = sample_archive();
        let at = position.index(bytes.len());
        bytes[at] ^= mask;

        let strict = ArchiveReader::new(&bytes, ReadOptions { signed: true }).unpack();
        prop_assert!(strict.is_err(), "flip at {} accepted", at);

        if let Ok(archive) = ArchiveReader::new(&bytes, ReadOptions::default()).unpack() {
            let is_mismatch = matches!(archive.signature(), SignatureStatus::Mismatch { .. });
            prop_assert!(is_mismatch);
        }
    }

    #[test]
    fn prop_truncation_rejected(position in any::<prop::sample::Index>()) {
        let bytes = sample_archive();
        let cut = position.index(bytes.len());

        let result = ArchiveReader::new(&bytes[..cut], ReadOptions::default()).unpack();
        prop_assert!(result.is_err(), "truncated to {} accepted", cut);
    }
}

#[test]
fn untouched_archive_verifies() {
    let bytes = sample_archive();
    let archive = ArchiveReader::new(&bytes, ReadOptions { signed: true })
        .unpack()
        .unwrap();
    assert!(archive.signature().is_verified());
    assert_eq!(archive.files().count(), 3);
}

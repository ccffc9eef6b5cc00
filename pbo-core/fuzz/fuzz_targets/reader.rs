#![no_main]
use libfuzzer_sys::fuzz_target;
use pbo_core::{ArchiveReader, ReadOptions, SignatureStatus};

fuzz_target!(|data: &[u8]| {
    match ArchiveReader::new(data, ReadOptions { signed: true }).unpack() {
        Ok(archive) => assert_eq!(archive.signature(), SignatureStatus::Verified),
        Err(_) => (),
    }

    if let Ok(archive) = ArchiveReader::new(data, ReadOptions::default()).unpack() {
        for file in archive.files() {
            let size = file.record().size().unwrap_or(0) as usize;
            assert_eq!(file.payload().map(<[u8]>::len), Some(size));
        }
    }
});

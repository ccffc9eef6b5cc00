use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pbo::{read_archive, ArchiveWriter, CreateOptions, Error, PackingMethod, ReadOptions, SourceEntry};
use pbo_core::Checksum;

struct TestDir {
    tmpdir: tempfile::TempDir,
}

impl TestDir {
    fn new() -> io::Result<TestDir> {
        Ok(TestDir {
            tmpdir: tempfile::tempdir()?,
        })
    }

    fn file(&self, path: impl AsRef<Path>) -> PathBuf {
        self.tmpdir.path().join(path)
    }

    fn write(&self, path: impl AsRef<Path>, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.file(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }
}

const SOME_FILE_PATH: &str = "some/file";
const SOME_FILE_CONTENTS: &[u8; 18] = b"some file contents";
const SOME_FILE_TIME: u32 = 1_600_000_000;

fn le_fields(fields: [u32; 5]) -> Vec<u8> {
    fields.iter().flat_map(|field| field.to_le_bytes()).collect()
}

#[test]
fn writer_layout() -> Result<(), Error> {
    let tmp = TestDir::new().unwrap();
    let source = tmp.write("contents.txt", SOME_FILE_CONTENTS).unwrap();
    let archive_path = tmp.file("addon.pbo");

    let mut entry = SourceEntry::new(&source, SOME_FILE_PATH)?;
    entry.set_timestamp(SOME_FILE_TIME);

    let mut writer = ArchiveWriter::new(&archive_path, CreateOptions::default());
    writer.header_mut().properties_mut().insert("version", "1");
    writer.add_entry(entry);
    let digest = writer.pack()?;

    let mut expected = vec![0];
    expected.extend(le_fields([0x5665_7273, 0, 0, 0, 0]));
    expected.extend_from_slice(b"prefix\0addon\0product\0addon\0version\x001\0\0");
    expected.extend_from_slice(SOME_FILE_PATH.as_bytes());
    expected.push(0);
    expected.extend(le_fields([0, 18, 0, SOME_FILE_TIME, 18]));
    expected.extend_from_slice(&[0; 21]);
    expected.extend_from_slice(SOME_FILE_CONTENTS);
    expected.push(0);

    let mut checksum = Checksum::new();
    checksum.update(&expected);
    let want = checksum.finalize();
    assert_eq!(digest, want);
    expected.extend_from_slice(&want);

    let archive = fs::read(&archive_path).unwrap();
    assert_eq!(archive, expected);
    Ok(())
}

#[test]
fn seeded_header() -> Result<(), Error> {
    let tmp = TestDir::new().unwrap();
    let writer = ArchiveWriter::new(tmp.file("my_mod.pbo"), CreateOptions::default());
    let properties = writer.header().properties();
    assert_eq!(properties.get("prefix"), Some("my_mod"));
    assert_eq!(properties.get("product"), Some("my_mod"));
    let version: u128 = properties.get("version").unwrap().parse().unwrap();
    assert!(version > 1_600_000_000_000);

    writer.pack()?;
    let archive = read_archive(tmp.file("my_mod.pbo"), ReadOptions { signed: true })?;
    assert!(archive.files().next().is_none());
    assert_eq!(archive.header().unwrap().properties().get("prefix"), Some("my_mod"));
    Ok(())
}

#[test]
fn directory_order() -> Result<(), Error> {
    let tmp = TestDir::new().unwrap();
    tmp.write("data/b/z.txt", b"z").unwrap();
    tmp.write("data/b/a.txt", b"a").unwrap();
    tmp.write("data/a.txt", b"first").unwrap();
    tmp.write("data/c.txt", b"").unwrap();
    let lone = tmp.write("lone.cfg", b"lone").unwrap();

    let mut writer = ArchiveWriter::new(tmp.file("out.pbo"), CreateOptions::default());
    writer.add_file(tmp.file("data"))?.add_file(&lone)?;
    writer.pack()?;

    let archive = read_archive(tmp.file("out.pbo"), ReadOptions { signed: true })?;
    let paths: Vec<_> = archive
        .files()
        .map(|file| String::from_utf8_lossy(file.path_bytes()).into_owned())
        .collect();
    assert_eq!(
        paths,
        ["data/a.txt", "data/b/a.txt", "data/b/z.txt", "data/c.txt", "lone.cfg"]
    );

    let payloads: Vec<_> = archive.files().map(|file| file.payload().unwrap().to_vec()).collect();
    let expected: [&[u8]; 5] = [b"first", b"a", b"z", b"", b"lone"];
    assert_eq!(payloads, expected);
    Ok(())
}

#[test]
fn missing_source() {
    let tmp = TestDir::new().unwrap();
    let mut writer = ArchiveWriter::new(tmp.file("out.pbo"), CreateOptions::default());
    let err = writer.add_file(tmp.file("absent")).unwrap_err();
    assert!(matches!(err, Error::SourceNotFound(_)));
}

#[test]
fn collision_policy() -> Result<(), Error> {
    let tmp = TestDir::new().unwrap();
    let existing = tmp.write("out.pbo", b"not an archive").unwrap();
    let source = tmp.write("file.txt", b"contents").unwrap();

    let options = CreateOptions {
        overwrite: false,
        ..CreateOptions::default()
    };
    let mut writer = ArchiveWriter::new(&existing, options);
    writer.add_file(&source)?;
    let err = writer.pack().unwrap_err();
    assert!(matches!(err, Error::WriteCollision(_)));
    assert_eq!(fs::read(&existing).unwrap(), b"not an archive");

    let mut writer = ArchiveWriter::new(&existing, CreateOptions::default());
    writer.add_file(&source)?;
    writer.pack()?;
    let archive = read_archive(&existing, ReadOptions { signed: true })?;
    assert_eq!(archive.find(b"file.txt").unwrap().payload(), Some(&b"contents"[..]));
    Ok(())
}

#[test]
fn reserved_method_removes_partial() -> Result<(), Error> {
    let tmp = TestDir::new().unwrap();
    let source = tmp.write("packed.bin", b"compressed?").unwrap();
    let archive_path = tmp.file("out.pbo");

    let mut entry = SourceEntry::from_path(&source)?;
    entry.set_packing_method(PackingMethod::Compressed)?;

    let mut writer = ArchiveWriter::new(&archive_path, CreateOptions::default());
    writer.add_entry(entry);
    let err = writer.pack().unwrap_err();
    assert!(matches!(
        err,
        Error::Core(pbo_core::Error::UnsupportedPackingMethod(PackingMethod::Compressed))
    ));
    assert!(!archive_path.exists());
    Ok(())
}

#[test]
fn source_changed_while_packing() -> Result<(), Error> {
    let tmp = TestDir::new().unwrap();
    let source = tmp.write("shrinks.txt", b"short").unwrap();
    let archive_path = tmp.file("out.pbo");

    let entry = SourceEntry::from_path(&source)?;
    fs::write(&source, b"sh").unwrap();

    let mut writer = ArchiveWriter::new(&archive_path, CreateOptions::default());
    writer.add_entry(entry);
    let err = writer.pack().unwrap_err();
    assert!(matches!(
        err,
        Error::LengthMismatch {
            actual: 2,
            expected: 5,
            ..
        }
    ));
    assert!(!archive_path.exists());
    Ok(())
}

#[test]
fn archive_inside_packed_dir() -> Result<(), Error> {
    let tmp = TestDir::new().unwrap();
    tmp.write("data/a.txt", b"a").unwrap();
    tmp.write("data/z.txt", b"z").unwrap();
    let archive_path = tmp.file("data/data.pbo");

    let mut writer = ArchiveWriter::new(&archive_path, CreateOptions::default());
    writer.add_file(tmp.file("data"))?;
    writer.pack()?;

    let archive = read_archive(&archive_path, ReadOptions { signed: true })?;
    let paths: Vec<_> = archive
        .files()
        .map(|file| String::from_utf8_lossy(file.path_bytes()).into_owned())
        .collect();
    assert_eq!(paths, ["data/a.txt", "data/z.txt"]);
    Ok(())
}

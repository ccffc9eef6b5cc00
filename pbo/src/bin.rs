use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use log::{debug, info, warn};
use pbo_core::{Archive, FileEntry, ReadOptions, SignatureStatus, DIGEST_SIZE};

use crate::ext::EntryExt;
use crate::{read_archive, wrap_io_err, ArchiveWriter, CreateOptions, Error};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Refuse to extract anything from an archive whose digest doesn't match
    pub signed: bool,
}

/// Outcome of [`extract`]. Individual files may fail without failing the
/// whole extraction.
#[derive(Debug)]
pub struct ExtractReport {
    pub extracted: Vec<PathBuf>,
    /// Archive path of each entry that was skipped, with the reason
    pub failed: Vec<(String, Error)>,
    pub signature: SignatureStatus,
}

/// Pack `files` into a new archive at `archive_path`, returning its digest.
/// Directories are stored recursively under their own name.
pub fn create<P, I>(archive_path: P, files: I, options: CreateOptions) -> Result<[u8; DIGEST_SIZE], Error>
where
    P: AsRef<Path>,
    I: IntoIterator,
    I::Item: AsRef<Path>,
{
    let mut writer = ArchiveWriter::new(archive_path, options);
    for file in files {
        writer.add_file(file)?;
    }
    writer.pack()
}

fn temp_path(target_path: &Path) -> Result<PathBuf, Error> {
    let tmp_name = match target_path.file_name() {
        Some(filename) => format!(".pbo.{}", Path::new(filename).display()),
        None => {
            return Err(Error::InvalidPath {
                entry: target_path.to_path_buf(),
                component: PathBuf::from("/"),
            })
        }
    };

    let parent = target_path.parent().ok_or_else(|| Error::InvalidPath {
        entry: target_path.to_path_buf(),
        component: PathBuf::from("/"),
    })?;
    fs::create_dir_all(parent).map_err(wrap_io_err!(parent, "Creating directory"))?;
    Ok(parent.join(tmp_name))
}

fn extract_file(base_dir: &Path, file: &FileEntry) -> Result<PathBuf, Error> {
    let relative = file.check_path()?;
    let target = base_dir.join(relative);
    let tmp = temp_path(&target)?;

    let write = || -> Result<(), Error> {
        let mut out = fs::File::create(&tmp).map_err(wrap_io_err!(tmp, "Creating file"))?;
        out.write_all(file.payload().unwrap_or_default())
            .map_err(wrap_io_err!(tmp, "Writing file"))?;
        drop(out);

        let mtime = FileTime::from_unix_time(i64::from(file.record().timestamp), 0);
        if let Err(err) = filetime::set_file_mtime(&tmp, mtime) {
            warn!("could not set mtime on {}: {}", target.display(), err);
        }
        fs::rename(&tmp, &target).map_err(wrap_io_err!(target, "Renaming temp file"))
    };

    match write() {
        Ok(()) => {
            debug!("extracted {}", target.display());
            Ok(target)
        }
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            Err(err)
        }
    }
}

/// Extract every file in the archive under `base_dir`.
///
/// The archive must parse and, when `signed`, match its digest; after that
/// each file is written on its own and a failure only skips that file.
pub fn extract(
    archive_path: impl AsRef<Path>,
    base_dir: impl AsRef<Path>,
    options: ExtractOptions,
) -> Result<ExtractReport, Error> {
    let archive_path = archive_path.as_ref();
    let base_dir = base_dir.as_ref();

    let archive = read_archive(archive_path, ReadOptions { signed: options.signed })?;
    fs::create_dir_all(base_dir).map_err(wrap_io_err!(base_dir, "Creating directory"))?;

    let mut report = ExtractReport {
        extracted: Vec::new(),
        failed: Vec::new(),
        signature: archive.signature(),
    };
    for file in archive.files().filter(|file| !file.path_bytes().is_empty()) {
        match extract_file(base_dir, file) {
            Ok(target) => report.extracted.push(target),
            Err(err) => {
                let name = String::from_utf8_lossy(file.path_bytes()).into_owned();
                warn!("skipping {:?}: {}", name, err);
                report.failed.push((name, err));
            }
        }
    }

    info!(
        "extracted {} files from {} ({} skipped)",
        report.extracted.len(),
        archive_path.display(),
        report.failed.len()
    );
    Ok(report)
}

pub fn list(archive_path: impl AsRef<Path>, options: ReadOptions) -> Result<Archive, Error> {
    read_archive(archive_path, options)
}

/// Read the archive, failing unless its trailer matches, and return the digest.
pub fn verify(archive_path: impl AsRef<Path>) -> Result<[u8; DIGEST_SIZE], Error> {
    let archive = read_archive(archive_path, ReadOptions { signed: true })?;
    Ok(archive.digest())
}

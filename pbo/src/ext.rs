//! Extension traits and helpers for types defined in `pbo-core`.
use std::io::{self, Read};
use std::path::{Component, Path};

use pbo_core::FileEntry;

use crate::Error;

/// Copy up to `total` bytes from `read` in chunks of at most `buf.len()`,
/// handing each chunk to `emit`. Returns the number of bytes copied, which
/// is short of `total` only if `read` ran out.
pub fn copy_bounded<R, F>(mut read: R, total: u64, buf: &mut [u8], mut emit: F) -> io::Result<u64>
where
    R: Read,
    F: FnMut(&[u8]) -> io::Result<()>,
{
    let mut copied = 0;
    while copied < total {
        let want = (total - copied).min(buf.len() as u64) as usize;
        let count = match read.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(count) => count,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        emit(&buf[..count])?;
        copied += count as u64;
    }
    Ok(copied)
}

pub trait EntryExt {
    fn check_path(&self) -> Result<&Path, Error>;
}

impl EntryExt for FileEntry {
    /// Iterate the components of the path and ensure that there are no
    /// non-normal components. A single leading `/` is dropped, as some
    /// packers store every path rooted.
    fn check_path(&self) -> Result<&Path, Error> {
        let full = std::str::from_utf8(self.path_bytes())
            .map(Path::new)
            .map_err(pbo_core::Error::from)?;
        let mut components = full.components();
        let path = match components.next() {
            Some(Component::RootDir) => components.as_path(),
            _ => full,
        };
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidPath {
                entry: full.to_path_buf(),
                component: path.to_path_buf(),
            });
        }
        for component in path.components() {
            match component {
                Component::Normal(_) => {}
                invalid => {
                    let bad_component: &Path = invalid.as_ref();
                    return Err(Error::InvalidPath {
                        entry: full.to_path_buf(),
                        component: bad_component.to_path_buf(),
                    });
                }
            }
        }
        Ok(path)
    }
}

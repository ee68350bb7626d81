// Host-backed roots.
// The reference side is always one of these. A candidate mount is reached the
// same way, through the kernel's file calls, so it is one of these too.

use crate::{NodeKind, OpenMode, Root, Vfs, VfsError};
use log::trace;
use std::collections::BTreeSet;
use std::ffi::{CString, OsString};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::ffi::OsStringExt;

const NODE_MODE: libc::mode_t = 0o644;

#[derive(Debug, Clone)]
pub struct HostFs {
    root: Root,
}

impl HostFs {
    pub fn new(root: Root) -> Self {
        Self { root }
    }
}

impl Vfs for HostFs {
    type Handle = File;

    fn root(&self) -> &Root {
        &self.root
    }

    fn create_dir(&self, path: &str) -> Result<(), VfsError> {
        trace!("{}: mkdir {}", self.root.role(), path);
        fs::create_dir(self.root.join(path))?;
        Ok(())
    }

    /// mknod(2) with `S_IFREG`, so a mount sees a node creation and never an
    /// open/release pair.
    fn create_node(&self, path: &str) -> Result<(), VfsError> {
        trace!("{}: mknod {}", self.root.role(), path);
        let target = CString::new(self.root.join(path).into_os_string().into_vec())
            .map_err(|_| VfsError::from_errno(libc::EINVAL))?;
        // SAFETY: `target` is NUL-terminated and outlives the call.
        let rc = unsafe { libc::mknod(target.as_ptr(), libc::S_IFREG | NODE_MODE, 0) };
        if rc != 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }

    fn list_dir(&self, path: &str) -> Result<BTreeSet<OsString>, VfsError> {
        let mut names = BTreeSet::new();
        for entry in fs::read_dir(self.root.join(path))? {
            names.insert(entry?.file_name());
        }
        Ok(names)
    }

    fn stat(&self, path: &str) -> Result<NodeKind, VfsError> {
        let meta = fs::metadata(self.root.join(path))?;
        Ok(if meta.is_dir() {
            NodeKind::Directory
        } else if meta.is_file() {
            NodeKind::File
        } else {
            NodeKind::Other
        })
    }

    fn open(&self, path: &str, mode: OpenMode) -> Result<File, VfsError> {
        let mut opts = OpenOptions::new();
        match mode {
            OpenMode::Read => opts.read(true),
            OpenMode::Write => opts.write(true),
            OpenMode::ReadWrite => opts.read(true).write(true),
        };
        Ok(opts.open(self.root.join(path))?)
    }

    fn close(&self, handle: File) -> Result<(), VfsError> {
        // std discards close(2) errors, so there is nothing to report here.
        drop(handle);
        Ok(())
    }

    /// A single read(2): a mount that answers short mid-file shows up as such.
    fn read(&self, handle: &mut File, count: usize) -> Result<Vec<u8>, VfsError> {
        let mut buf = vec![0u8; count];
        let n = loop {
            match handle.read(&mut buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other?,
            }
        };
        buf.truncate(n);
        Ok(buf)
    }

    fn write(&self, handle: &mut File, data: &[u8]) -> Result<usize, VfsError> {
        loop {
            match handle.write(data) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return Ok(other?),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    use tempfile::tempdir;

    fn host(dir: &tempfile::TempDir) -> HostFs {
        HostFs::new(Root::reference(dir.path()))
    }

    fn names(list: &[&str]) -> BTreeSet<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn mkdir_twice_reports_already_exists() {
        let dir = tempdir().unwrap();
        let fs = host(&dir);
        fs.create_dir("a").unwrap();
        assert_eq!(fs.create_dir("a"), Err(VfsError::AlreadyExists));
        assert_eq!(fs.stat("a"), Ok(NodeKind::Directory));
    }

    #[test]
    fn mkdir_needs_parent() {
        let dir = tempdir().unwrap();
        assert_eq!(host(&dir).create_dir("missing/child"), Err(VfsError::NotFound));
    }

    #[test]
    fn mknod_is_exclusive() {
        let dir = tempdir().unwrap();
        let fs = host(&dir);
        fs.create_node("n.txt").unwrap();
        assert_eq!(fs.stat("n.txt"), Ok(NodeKind::File));
        assert_eq!(std::fs::metadata(dir.path().join("n.txt")).unwrap().len(), 0);
        assert_eq!(fs.create_node("n.txt"), Err(VfsError::AlreadyExists));
    }

    #[test]
    fn mknod_reports_missing_parent() {
        let dir = tempdir().unwrap();
        assert_eq!(host(&dir).create_node("nope/n.txt"), Err(VfsError::NotFound));
    }

    #[test]
    fn listing_errors_are_classified() {
        let dir = tempdir().unwrap();
        let fs = host(&dir);
        assert_eq!(fs.list_dir("nope"), Err(VfsError::NotFound));
        fs.create_node("plain").unwrap();
        assert_eq!(fs.list_dir("plain"), Err(VfsError::NotADirectory));
    }

    #[test]
    fn listing_is_a_name_set() {
        let dir = tempdir().unwrap();
        let fs = host(&dir);
        fs.create_dir("p").unwrap();
        for name in ["b", "a", "c"] {
            fs.create_dir(&format!("p/{name}")).unwrap();
        }
        assert_eq!(fs.list_dir("p").unwrap(), names(&["a", "b", "c"]));
    }

    #[test]
    fn listing_keeps_raw_name_bytes() {
        let dir = tempdir().unwrap();
        let fs = host(&dir);
        fs.create_dir("raw").unwrap();
        for bytes in [&b"n\xff"[..], &b"n\xfe"[..]] {
            File::create(dir.path().join("raw").join(OsStr::from_bytes(bytes))).unwrap();
        }

        let listed = fs.list_dir("raw").unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(OsStr::from_bytes(b"n\xff")));
        assert!(listed.contains(OsStr::from_bytes(b"n\xfe")));
    }

    #[test]
    fn open_never_creates() {
        let dir = tempdir().unwrap();
        let fs = host(&dir);
        assert_eq!(fs.open("ghost", OpenMode::Read).err(), Some(VfsError::NotFound));
        assert_eq!(fs.open("ghost", OpenMode::Write).err(), Some(VfsError::NotFound));
        assert_eq!(fs.stat("ghost"), Err(VfsError::NotFound));
    }

    #[test]
    fn write_then_read_back() {
        let dir = tempdir().unwrap();
        let fs = host(&dir);
        fs.create_node("f").unwrap();

        let mut w = fs.open("f", OpenMode::Write).unwrap();
        assert_eq!(fs.write(&mut w, b"whatever bruh").unwrap(), 13);
        fs.close(w).unwrap();

        let mut r = fs.open("f", OpenMode::Read).unwrap();
        assert_eq!(fs.read(&mut r, 8).unwrap(), b"whatever");
        // Short at end of data, not an error.
        assert_eq!(fs.read(&mut r, 100).unwrap(), b" bruh");
        assert_eq!(fs.read(&mut r, 4).unwrap(), b"");
        fs.close(r).unwrap();
    }

    #[test]
    fn read_returns_what_one_call_yields() {
        let dir = tempdir().unwrap();
        let fs = host(&dir);
        let fifo = CString::new(dir.path().join("fifo").into_os_string().into_vec()).unwrap();
        // SAFETY: `fifo` is NUL-terminated and outlives the call.
        assert_eq!(unsafe { libc::mkfifo(fifo.as_ptr(), 0o600) }, 0);

        // Keeps a writer attached, so the pipe never reports end of data.
        let mut writer = OpenOptions::new()
            .read(true)
            .write(true)
            .open(dir.path().join("fifo"))
            .unwrap();
        writer.write_all(b"abc").unwrap();

        let mut r = fs.open("fifo", OpenMode::Read).unwrap();
        assert_eq!(fs.read(&mut r, 16).unwrap(), b"abc");
        fs.close(r).unwrap();
    }
}

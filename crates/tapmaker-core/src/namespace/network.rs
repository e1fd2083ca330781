//! Network namespace entry.
//!
//! A [`NetNamespace`] is an open handle to `/proc/<pid>/ns/net` (or any
//! other nsfs file). Entering it moves only the calling thread; the
//! returned [`NamespaceGuard`] moves the thread back when restored or
//! dropped.

use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use nix::sched::{CloneFlags, setns};
use nix::sys::statfs::{self, fstatfs};
use tapmaker_common::constants;
use tapmaker_common::error::{Result, TapMakerError};
use tapmaker_common::types::TargetPid;

use super::NamespaceId;

/// Open handle to a kernel network namespace.
#[derive(Debug)]
pub struct NetNamespace {
    file: File,
    path: PathBuf,
}

impl NetNamespace {
    /// Opens the network namespace of process `pid`.
    ///
    /// The process is only consulted here; the handle stays valid even if
    /// the process exits afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`TapMakerError::NamespaceNotFound`] if `/proc/<pid>/ns/net`
    /// cannot be opened, or [`TapMakerError::InvalidNamespace`] if it is not
    /// a namespace file.
    pub fn of_pid(pid: TargetPid) -> Result<Self> {
        Self::open(constants::net_ns_path(pid))
    }

    /// Opens the network namespace of the calling thread.
    ///
    /// # Errors
    ///
    /// Returns an error if `/proc/thread-self/ns/net` cannot be opened.
    pub fn current() -> Result<Self> {
        Self::open(constants::THREAD_SELF_NET_NS)
    }

    /// Opens a network namespace from an nsfs path, such as a bind mount
    /// under `/var/run/netns`.
    ///
    /// # Errors
    ///
    /// Returns [`TapMakerError::NamespaceNotFound`] if the file cannot be
    /// opened, or [`TapMakerError::InvalidNamespace`] if it does not live on
    /// nsfs or procfs.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|source| TapMakerError::NamespaceNotFound {
            path: path.clone(),
            source,
        })?;
        verify_namespace_file(&file, &path)?;
        tracing::trace!(path = %path.display(), "opened network namespace");
        Ok(Self { file, path })
    }

    /// Returns the path this handle was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the kernel identity of this namespace.
    ///
    /// # Errors
    ///
    /// Returns [`TapMakerError::Io`] if the handle cannot be stat'ed.
    pub fn id(&self) -> Result<NamespaceId> {
        let meta = self.file.metadata().map_err(|source| TapMakerError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(NamespaceId::from_metadata(&meta))
    }

    /// Moves the calling thread into this namespace.
    ///
    /// The thread's current namespace is opened first so the guard can
    /// always find its way back.
    ///
    /// # Errors
    ///
    /// Returns an error if the current namespace cannot be opened or if
    /// `setns(2)` fails. The thread has not moved in either case.
    pub fn enter(&self) -> Result<NamespaceGuard> {
        let original = Self::current()?;
        setns(&self.file, CloneFlags::CLONE_NEWNET).map_err(|errno| {
            TapMakerError::NamespaceSwitch {
                path: self.path.clone(),
                source: errno.into(),
            }
        })?;
        tracing::debug!(path = %self.path.display(), "entered network namespace");
        Ok(NamespaceGuard {
            original: Some(original),
            _thread: PhantomData,
        })
    }

    /// Runs `work` with the calling thread inside this namespace.
    ///
    /// The original namespace is restored before this returns, whether
    /// `work` succeeded or not. If `work` and the restore both fail, the
    /// restore error is returned and the work error is logged.
    ///
    /// # Errors
    ///
    /// Returns the error of entering, of `work`, or of restoring.
    pub fn run<T>(&self, work: impl FnOnce() -> Result<T>) -> Result<T> {
        let guard = self.enter()?;
        let outcome = work();
        match (guard.restore(), outcome) {
            (Ok(()), outcome) => outcome,
            (Err(restore), Ok(_)) => Err(restore),
            (Err(restore), Err(work)) => {
                tracing::error!(error = %work, "work failed inside network namespace");
                Err(restore)
            }
        }
    }
}

/// Keeps track of the namespace a thread came from.
///
/// Namespace membership is per thread, so the guard cannot be sent to
/// another thread.
#[must_use = "dropping the guard switches the thread back immediately"]
#[derive(Debug)]
pub struct NamespaceGuard {
    original: Option<NetNamespace>,
    _thread: PhantomData<*const ()>,
}

impl NamespaceGuard {
    /// Switches the calling thread back to its original namespace.
    ///
    /// # Errors
    ///
    /// Returns [`TapMakerError::NamespaceRestore`] if `setns(2)` fails.
    pub fn restore(mut self) -> Result<()> {
        self.original.take().map_or(Ok(()), |original| switch_back(&original))
    }
}

impl Drop for NamespaceGuard {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            if let Err(e) = switch_back(&original) {
                tracing::error!(error = %e, "thread left in foreign network namespace");
            }
        }
    }
}

fn switch_back(original: &NetNamespace) -> Result<()> {
    setns(&original.file, CloneFlags::CLONE_NEWNET)
        .map_err(|errno| TapMakerError::NamespaceRestore {
            source: errno.into(),
        })?;
    tracing::debug!(path = %original.path.display(), "restored network namespace");
    Ok(())
}

/// Rejects files that are not namespace references.
///
/// Namespace files live on nsfs; kernels before 3.19 expose them on procfs.
fn verify_namespace_file(file: &File, path: &Path) -> Result<()> {
    let stat = fstatfs(file).map_err(|errno| TapMakerError::Io {
        path: path.to_path_buf(),
        source: errno.into(),
    })?;
    let fs_type = stat.filesystem_type();
    if fs_type != statfs::NSFS_MAGIC && fs_type != statfs::PROC_SUPER_MAGIC {
        return Err(TapMakerError::InvalidNamespace {
            path: path.to_path_buf(),
            reason: format!("unexpected filesystem type {fs_type:?}"),
        });
    }
    Ok(())
}

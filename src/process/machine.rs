/*!
 * Machine Hooks
 *
 * Narrow interface to the collaborators the scheduler core consumes but does
 * not own: address spaces, open files and working directories. The core only
 * moves opaque handles around; it never looks inside them.
 */

use crate::core::errors::ResourceError;
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Opaque address-space handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressSpace(pub u64);

/// Opaque open-file handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHandle(pub u64);

/// Opaque directory handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirHandle(pub u64);

/// Resource lifecycle hooks invoked at boot, fork, dispatch, exit and reap
#[cfg_attr(test, mockall::automock)]
pub trait Machine: Send + Sync {
    /// Build the address space of the root process
    fn create_space(&self) -> Result<AddressSpace, ResourceError>;

    /// Copy a parent's address space for a forked child
    fn duplicate_space(&self, parent: AddressSpace) -> Result<AddressSpace, ResourceError>;

    fn destroy_space(&self, space: AddressSpace);

    /// Make a process's mappings active on the calling CPU
    fn activate(&self, space: AddressSpace);

    /// Restore the scheduler's own mappings
    fn activate_kernel(&self);

    fn duplicate_file(&self, file: FileHandle) -> FileHandle;

    fn close_file(&self, file: FileHandle);

    fn resolve_dir(&self, path: &str) -> Result<DirHandle, ResourceError>;

    fn duplicate_dir(&self, dir: DirHandle) -> DirHandle;

    fn release_dir(&self, dir: DirHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleKind {
    Space,
    File,
    Dir,
}

/// In-process machine that mints handles and tracks which are still live
///
/// Files are reference counted the way an open-file table would be: a
/// duplicate returns the same handle with one more reference.
pub struct HostMachine {
    next: AtomicU64,
    live: DashMap<u64, (HandleKind, u32), RandomState>,
    activations: AtomicU64,
}

impl HostMachine {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            live: DashMap::with_hasher(RandomState::new()),
            activations: AtomicU64::new(0),
        }
    }

    fn mint(&self, kind: HandleKind) -> u64 {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        self.live.insert(id, (kind, 1));
        id
    }

    fn retain(&self, id: u64) {
        if let Some(mut entry) = self.live.get_mut(&id) {
            entry.1 += 1;
        }
    }

    fn drop_ref(&self, id: u64) {
        let last = match self.live.get_mut(&id) {
            Some(mut entry) => {
                entry.1 = entry.1.saturating_sub(1);
                entry.1 == 0
            }
            None => false,
        };
        if last {
            self.live.remove(&id);
        }
    }

    fn count(&self, kind: HandleKind) -> usize {
        self.live.iter().filter(|e| e.value().0 == kind).count()
    }

    /// Open a file for installation into a process's descriptor table
    pub fn open_file(&self) -> FileHandle {
        FileHandle(self.mint(HandleKind::File))
    }

    pub fn live_spaces(&self) -> usize {
        self.count(HandleKind::Space)
    }

    pub fn live_files(&self) -> usize {
        self.count(HandleKind::File)
    }

    pub fn live_dirs(&self) -> usize {
        self.count(HandleKind::Dir)
    }

    /// Number of process address-space activations performed so far
    pub fn activations(&self) -> u64 {
        self.activations.load(Ordering::Relaxed)
    }
}

impl Default for HostMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine for HostMachine {
    fn create_space(&self) -> Result<AddressSpace, ResourceError> {
        Ok(AddressSpace(self.mint(HandleKind::Space)))
    }

    fn duplicate_space(&self, parent: AddressSpace) -> Result<AddressSpace, ResourceError> {
        if !self.live.contains_key(&parent.0) {
            return Err(ResourceError::AddressSpace(format!(
                "parent space {} is not live",
                parent.0
            )));
        }
        Ok(AddressSpace(self.mint(HandleKind::Space)))
    }

    fn destroy_space(&self, space: AddressSpace) {
        self.live.remove(&space.0);
    }

    fn activate(&self, space: AddressSpace) {
        self.activations.fetch_add(1, Ordering::Relaxed);
        debug!(space = space.0, "address space activated");
    }

    fn activate_kernel(&self) {}

    fn duplicate_file(&self, file: FileHandle) -> FileHandle {
        self.retain(file.0);
        file
    }

    fn close_file(&self, file: FileHandle) {
        self.drop_ref(file.0);
    }

    fn resolve_dir(&self, path: &str) -> Result<DirHandle, ResourceError> {
        if !path.starts_with('/') {
            return Err(ResourceError::Directory(format!(
                "{path} is not an absolute path"
            )));
        }
        Ok(DirHandle(self.mint(HandleKind::Dir)))
    }

    fn duplicate_dir(&self, dir: DirHandle) -> DirHandle {
        self.retain(dir.0);
        dir
    }

    fn release_dir(&self, dir: DirHandle) {
        self.drop_ref(dir.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_lifecycle() {
        let machine = HostMachine::new();
        let root = machine.create_space().unwrap();
        let child = machine.duplicate_space(root).unwrap();
        assert_ne!(root, child);
        assert_eq!(machine.live_spaces(), 2);

        machine.destroy_space(child);
        assert_eq!(machine.live_spaces(), 1);
        assert!(machine.duplicate_space(child).is_err());
    }

    #[test]
    fn test_file_references() {
        let machine = HostMachine::new();
        let file = machine.open_file();
        let dup = machine.duplicate_file(file);
        assert_eq!(file, dup);

        machine.close_file(file);
        assert_eq!(machine.live_files(), 1);
        machine.close_file(dup);
        assert_eq!(machine.live_files(), 0);
    }

    #[test]
    fn test_relative_directory_rejected() {
        let machine = HostMachine::new();
        assert!(machine.resolve_dir("tmp").is_err());
        let dir = machine.resolve_dir("/").unwrap();
        machine.release_dir(dir);
        assert_eq!(machine.live_dirs(), 0);
    }
}

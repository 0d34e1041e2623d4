//! In-memory [`FileStore`] — the stand-in for the browser virtual
//! filesystem.
//!
//! A single mutex guards the whole tree. The engine runs commands
//! serially, so contention is not a concern; the lock exists so view
//! code on other threads can take consistent reads.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{path, FileStore, FsError, FsErrorKind, FsResult, NodeKind};

// ---------------------------------------------------------------------------
// Node tree
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
enum Node {
    File(Vec<u8>),
    Dir(BTreeMap<String, Node>),
}

impl Node {
    const fn kind(&self) -> NodeKind {
        match self {
            Self::File(_) => NodeKind::File,
            Self::Dir(_) => NodeKind::Dir,
        }
    }
}

// ---------------------------------------------------------------------------
// MemStore
// ---------------------------------------------------------------------------

/// A mutex-guarded in-memory file tree.
pub struct MemStore {
    root: Mutex<Node>,
}

impl MemStore {
    /// Create an empty store containing only the root directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Mutex::new(Node::Dir(BTreeMap::new())),
        }
    }

    /// Drop every node, leaving an empty root. Used by snapshot import.
    pub fn clear(&self) {
        let mut root = self.root.lock().expect("mem store poisoned");
        *root = Node::Dir(BTreeMap::new());
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk to the node at `path` within `root`, if present.
fn find<'a>(root: &'a Node, path: &str) -> Option<&'a Node> {
    let mut cur = root;
    for seg in path::segments(path) {
        match cur {
            Node::Dir(children) => cur = children.get(seg)?,
            Node::File(_) => return None,
        }
    }
    Some(cur)
}

/// Walk to the *parent directory* of `path`, returning its child map and
/// the final segment name.
fn find_parent<'a>(
    root: &'a mut Node,
    path: &str,
) -> FsResult<(&'a mut BTreeMap<String, Node>, String)> {
    let segs: Vec<&str> = path::segments(path).collect();
    let Some((last, ancestors)) = segs.split_last() else {
        // The root has no parent.
        return Err(FsError::new(FsErrorKind::InvalidPath, path));
    };
    let mut cur = root;
    for seg in ancestors {
        match cur {
            Node::Dir(children) => {
                cur = children
                    .get_mut(*seg)
                    .ok_or_else(|| FsError::not_found(path))?;
            }
            Node::File(_) => return Err(FsError::new(FsErrorKind::NotADirectory, path)),
        }
    }
    match cur {
        Node::Dir(children) => Ok((children, (*last).to_owned())),
        Node::File(_) => Err(FsError::new(FsErrorKind::NotADirectory, path)),
    }
}

impl FileStore for MemStore {
    fn stat(&self, path: &str) -> FsResult<Option<NodeKind>> {
        let root = self.root.lock().expect("mem store poisoned");
        Ok(find(&root, path).map(Node::kind))
    }

    fn read_dir(&self, path: &str) -> FsResult<Vec<String>> {
        let root = self.root.lock().expect("mem store poisoned");
        match find(&root, path) {
            Some(Node::Dir(children)) => Ok(children.keys().cloned().collect()),
            Some(Node::File(_)) => Err(FsError::new(FsErrorKind::NotADirectory, path)),
            None => Err(FsError::not_found(path)),
        }
    }

    fn read_file(&self, path: &str) -> FsResult<Vec<u8>> {
        let root = self.root.lock().expect("mem store poisoned");
        match find(&root, path) {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Dir(_)) => Err(FsError::new(FsErrorKind::NotADirectory, path)),
            None => Err(FsError::not_found(path)),
        }
    }

    fn write_file(&self, path: &str, data: &[u8]) -> FsResult<()> {
        let mut root = self.root.lock().expect("mem store poisoned");
        let (children, name) = find_parent(&mut root, path)?;
        if let Some(Node::Dir(_)) = children.get(&name) {
            return Err(FsError::new(FsErrorKind::NotADirectory, path));
        }
        children.insert(name, Node::File(data.to_vec()));
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        if to == from || to.starts_with(&format!("{from}/")) {
            return Err(FsError::new(FsErrorKind::InvalidPath, to));
        }
        let mut root = self.root.lock().expect("mem store poisoned");
        // Validate both ends before detaching anything.
        {
            let (src, src_name) = find_parent(&mut root, from)?;
            if !src.contains_key(&src_name) {
                return Err(FsError::not_found(from));
            }
        }
        {
            let (dst, dst_name) = find_parent(&mut root, to)?;
            if let Some(Node::Dir(_)) = dst.get(&dst_name) {
                return Err(FsError::new(FsErrorKind::Exists, to));
            }
        }
        let node = {
            let (src, src_name) = find_parent(&mut root, from)?;
            src.remove(&src_name)
                .ok_or_else(|| FsError::not_found(from))?
        };
        let (dst, dst_name) = find_parent(&mut root, to)?;
        dst.insert(dst_name, node);
        Ok(())
    }

    fn unlink(&self, path: &str) -> FsResult<()> {
        let mut root = self.root.lock().expect("mem store poisoned");
        let (children, name) = find_parent(&mut root, path)?;
        match children.get(&name) {
            Some(Node::File(_)) => {
                children.remove(&name);
                Ok(())
            }
            Some(Node::Dir(_)) => Err(FsError::new(FsErrorKind::NotADirectory, path)),
            None => Err(FsError::not_found(path)),
        }
    }

    fn mkdir(&self, path: &str) -> FsResult<()> {
        if path == "/" {
            return Ok(());
        }
        let mut root = self.root.lock().expect("mem store poisoned");
        let (children, name) = find_parent(&mut root, path)?;
        match children.get(&name) {
            Some(Node::Dir(_)) => Ok(()),
            Some(Node::File(_)) => Err(FsError::new(FsErrorKind::Exists, path)),
            None => {
                children.insert(name, Node::Dir(BTreeMap::new()));
                Ok(())
            }
        }
    }

    fn rmdir(&self, path: &str) -> FsResult<()> {
        let mut root = self.root.lock().expect("mem store poisoned");
        let (children, name) = find_parent(&mut root, path)?;
        match children.get(&name) {
            Some(Node::Dir(grand)) if grand.is_empty() => {
                children.remove(&name);
                Ok(())
            }
            Some(Node::Dir(_)) => Err(FsError::new(FsErrorKind::NotEmpty, path)),
            Some(Node::File(_)) => Err(FsError::new(FsErrorKind::NotADirectory, path)),
            None => Err(FsError::not_found(path)),
        }
    }
}

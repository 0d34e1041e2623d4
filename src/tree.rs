//! Tree walking and construction.
//!
//! The merge and status machinery works on *blob indexes*: flat maps
//! from repo-relative path to blob oid for everything reachable from a
//! tree. Building the nested tree objects back from a flat map happens
//! bottom-up so child trees are written (and hashed) before parents.

use std::collections::BTreeMap;

use edugit_fs::path;

use crate::error::Result;
use crate::model::{Object, ObjectKind, Oid, TreeEntry};
use crate::repo::Repository;

impl Repository {
    /// Flatten the tree at `tree_oid` into `path → blob oid`.
    ///
    /// # Errors
    /// Missing or corrupt objects.
    pub fn flatten_tree(&self, tree_oid: Oid) -> Result<BTreeMap<String, Oid>> {
        let mut out = BTreeMap::new();
        self.flatten_into(tree_oid, "", &mut out)?;
        Ok(out)
    }

    fn flatten_into(
        &self,
        tree_oid: Oid,
        prefix: &str,
        out: &mut BTreeMap<String, Oid>,
    ) -> Result<()> {
        for entry in self.read_tree(tree_oid)? {
            let child = if prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{prefix}/{}", entry.name)
            };
            match entry.kind {
                ObjectKind::Blob => {
                    out.insert(child, entry.oid);
                }
                ObjectKind::Tree => self.flatten_into(entry.oid, &child, out)?,
                ObjectKind::Commit => {}
            }
        }
        Ok(())
    }

    /// Flatten the tree of the commit at `commit_oid`.
    ///
    /// A `None` commit (unborn branch) flattens to the empty map.
    ///
    /// # Errors
    /// Missing or corrupt objects.
    pub fn flatten_commit(&self, commit_oid: Option<Oid>) -> Result<BTreeMap<String, Oid>> {
        match commit_oid {
            None => Ok(BTreeMap::new()),
            Some(oid) => {
                let commit = self.read_commit(oid)?;
                self.flatten_tree(commit.tree)
            }
        }
    }

    /// Write the nested tree objects for a flat `path → blob oid` map
    /// and return the root tree oid.
    ///
    /// # Errors
    /// Filesystem failures while writing tree objects.
    pub fn build_tree(&self, blobs: &BTreeMap<String, Oid>) -> Result<Oid> {
        // Group blobs and collect every intermediate directory.
        let mut dirs: BTreeMap<String, Vec<(String, Oid)>> = BTreeMap::new();
        dirs.entry(String::new()).or_default();
        for (p, oid) in blobs {
            let dir = parent_dir(p);
            let mut cur = dir.clone();
            loop {
                dirs.entry(cur.clone()).or_default();
                if cur.is_empty() {
                    break;
                }
                cur = parent_dir(&cur);
            }
            dirs.entry(dir)
                .or_default()
                .push((path::file_name(&format!("/{p}")).to_owned(), oid.to_owned()));
        }

        // Deepest-first so child tree oids exist when parents encode.
        let mut order: Vec<String> = dirs.keys().cloned().collect();
        order.sort_by_key(|d| std::cmp::Reverse(d.matches('/').count() + usize::from(!d.is_empty())));

        let mut tree_oids: BTreeMap<String, Oid> = BTreeMap::new();
        for dir in order {
            let mut entries: Vec<TreeEntry> = dirs
                .get(&dir)
                .into_iter()
                .flatten()
                .map(|(name, oid)| TreeEntry::blob(name.clone(), *oid))
                .collect();
            for (sub, oid) in &tree_oids {
                if parent_dir(sub) == dir {
                    entries.push(TreeEntry::tree(
                        path::file_name(&format!("/{sub}")).to_owned(),
                        *oid,
                    ));
                }
            }
            let oid = self.write_object(&Object::Tree(entries))?;
            tree_oids.insert(dir.clone(), oid);
            if dir.is_empty() {
                return Ok(oid);
            }
        }
        // dirs always contains the root entry.
        unreachable!("root tree was not built")
    }
}

fn parent_dir(rel: &str) -> String {
    rel.rfind('/').map_or_else(String::new, |i| rel[..i].to_owned())
}

//! The three object variants and their canonical serialisations.
//!
//! Objects are immutable once written; two objects are equal exactly when
//! their serialised forms are equal, and the oid is the hash of that form.
//!
//! # Wire format
//!
//! Every object is `<kind> <len>\0<body>`:
//!
//! - *blob* body: the raw bytes.
//! - *tree* body: one line per entry, sorted by name:
//!   `<mode:06o> <kind> <oid>\t<name>\n`
//! - *commit* body: `tree`/`parent`*/`author`/`committer` headers, a blank
//!   line, then the message.

use std::fmt;

use crate::model::types::Oid;

// ---------------------------------------------------------------------------
// ObjectKind
// ---------------------------------------------------------------------------

/// Discriminates the three object variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// A byte sequence.
    Blob,
    /// An ordered set of named entries.
    Tree,
    /// A snapshot with ancestry.
    Commit,
}

impl ObjectKind {
    /// The serialised tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        }
    }

    /// Parse a serialised tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "blob" => Some(Self::Blob),
            "tree" => Some(Self::Tree),
            "commit" => Some(Self::Commit),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TreeEntry
// ---------------------------------------------------------------------------

/// File mode for a regular blob entry.
pub const MODE_BLOB: u32 = 0o100_644;
/// File mode for a subtree entry.
pub const MODE_TREE: u32 = 0o040_000;

/// One named entry inside a tree object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    /// Unix-style mode bits.
    pub mode: u32,
    /// Entry name (a single path segment, never `/`-separated).
    pub name: String,
    /// Whether the entry points at a blob or a subtree.
    pub kind: ObjectKind,
    /// The referenced object.
    pub oid: Oid,
}

impl TreeEntry {
    /// Build a blob entry with the default file mode.
    #[must_use]
    pub fn blob(name: impl Into<String>, oid: Oid) -> Self {
        Self {
            mode: MODE_BLOB,
            name: name.into(),
            kind: ObjectKind::Blob,
            oid,
        }
    }

    /// Build a subtree entry.
    #[must_use]
    pub fn tree(name: impl Into<String>, oid: Oid) -> Self {
        Self {
            mode: MODE_TREE,
            name: name.into(),
            kind: ObjectKind::Tree,
            oid,
        }
    }
}

// ---------------------------------------------------------------------------
// Signature / Commit
// ---------------------------------------------------------------------------

/// Author or committer identity with a unix-seconds timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Seconds since the unix epoch.
    pub timestamp: i64,
}

impl Signature {
    /// Serialised header form: `<name> <<email>> <timestamp>`.
    #[must_use]
    pub fn to_header(&self) -> String {
        format!("{} <{}> {}", self.name, self.email, self.timestamp)
    }

    /// Parse the header form.
    #[must_use]
    pub fn parse_header(s: &str) -> Option<Self> {
        let open = s.find('<')?;
        let close = s.find('>')?;
        let name = s.get(..open)?.trim_end().to_owned();
        let email = s.get(open + 1..close)?.to_owned();
        let timestamp = s.get(close + 1..)?.trim().parse().ok()?;
        Some(Self {
            name,
            email,
            timestamp,
        })
    }
}

/// A commit object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    /// The root tree of this snapshot.
    pub tree: Oid,
    /// Parent commits; two or more denote a merge commit.
    pub parents: Vec<Oid>,
    /// Who wrote the change.
    pub author: Signature,
    /// Who recorded the commit.
    pub committer: Signature,
    /// The commit message.
    pub message: String,
}

impl Commit {
    /// The first line of the message, for one-line displays.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Returns `true` if this commit has two or more parents.
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.parents.len() >= 2
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// A decoded object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    /// Raw bytes.
    Blob(Vec<u8>),
    /// Sorted entries.
    Tree(Vec<TreeEntry>),
    /// A commit.
    Commit(Commit),
}

impl Object {
    /// The variant tag.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Commit(_) => ObjectKind::Commit,
        }
    }

    /// Canonical serialisation: `<kind> <len>\0<body>`.
    ///
    /// Tree entries are sorted by name before encoding, so two trees with
    /// the same entries always serialise (and therefore hash) identically.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let body = self.encode_body();
        let mut out = format!("{} {}\0", self.kind(), body.len()).into_bytes();
        out.extend_from_slice(&body);
        out
    }

    /// The oid of this object's canonical serialisation.
    #[must_use]
    pub fn id(&self) -> Oid {
        Oid::hash(&self.encode())
    }

    fn encode_body(&self) -> Vec<u8> {
        match self {
            Self::Blob(data) => data.clone(),
            Self::Tree(entries) => {
                let mut sorted: Vec<&TreeEntry> = entries.iter().collect();
                sorted.sort_by(|a, b| a.name.cmp(&b.name));
                let mut body = String::new();
                for e in sorted {
                    body.push_str(&format!("{:06o} {} {}\t{}\n", e.mode, e.kind, e.oid, e.name));
                }
                body.into_bytes()
            }
            Self::Commit(c) => {
                let mut body = format!("tree {}\n", c.tree);
                for parent in &c.parents {
                    body.push_str(&format!("parent {parent}\n"));
                }
                body.push_str(&format!("author {}\n", c.author.to_header()));
                body.push_str(&format!("committer {}\n", c.committer.to_header()));
                body.push('\n');
                body.push_str(&c.message);
                body.into_bytes()
            }
        }
    }

    /// Decode a canonical serialisation.
    ///
    /// # Errors
    /// A description of the malformation; the object store wraps this
    /// into its corrupt-object error.
    pub fn decode(raw: &[u8]) -> Result<Self, String> {
        let nul = raw
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| "missing header terminator".to_owned())?;
        let header =
            std::str::from_utf8(&raw[..nul]).map_err(|_| "header is not utf-8".to_owned())?;
        let (tag, len_str) = header
            .split_once(' ')
            .ok_or_else(|| "malformed header".to_owned())?;
        let kind = ObjectKind::from_tag(tag).ok_or_else(|| format!("unknown kind '{tag}'"))?;
        let len: usize = len_str
            .parse()
            .map_err(|_| format!("bad length '{len_str}'"))?;
        let body = &raw[nul + 1..];
        if body.len() != len {
            return Err(format!("length mismatch: header {len}, body {}", body.len()));
        }
        match kind {
            ObjectKind::Blob => Ok(Self::Blob(body.to_vec())),
            ObjectKind::Tree => Self::decode_tree(body),
            ObjectKind::Commit => Self::decode_commit(body),
        }
    }

    fn decode_tree(body: &[u8]) -> Result<Self, String> {
        let text = std::str::from_utf8(body).map_err(|_| "tree body is not utf-8".to_owned())?;
        let mut entries = Vec::new();
        for line in text.lines() {
            let (meta, name) = line
                .split_once('\t')
                .ok_or_else(|| format!("malformed tree entry: {line:?}"))?;
            let mut parts = meta.splitn(3, ' ');
            let mode = u32::from_str_radix(parts.next().unwrap_or(""), 8)
                .map_err(|_| format!("bad mode in tree entry: {line:?}"))?;
            let kind = parts
                .next()
                .and_then(ObjectKind::from_tag)
                .ok_or_else(|| format!("bad kind in tree entry: {line:?}"))?;
            let oid: Oid = parts
                .next()
                .unwrap_or("")
                .parse()
                .map_err(|_| format!("bad oid in tree entry: {line:?}"))?;
            entries.push(TreeEntry {
                mode,
                name: name.to_owned(),
                kind,
                oid,
            });
        }
        Ok(Self::Tree(entries))
    }

    fn decode_commit(body: &[u8]) -> Result<Self, String> {
        let text = std::str::from_utf8(body).map_err(|_| "commit body is not utf-8".to_owned())?;
        let (headers, message) = text
            .split_once("\n\n")
            .map_or((text, ""), |(h, m)| (h, m));
        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        for line in headers.lines() {
            let (key, value) = line
                .split_once(' ')
                .ok_or_else(|| format!("malformed commit header: {line:?}"))?;
            match key {
                "tree" => {
                    tree = Some(value.parse().map_err(|_| format!("bad tree oid: {value:?}"))?);
                }
                "parent" => {
                    parents
                        .push(value.parse().map_err(|_| format!("bad parent oid: {value:?}"))?);
                }
                "author" => {
                    author = Signature::parse_header(value);
                }
                "committer" => {
                    committer = Signature::parse_header(value);
                }
                other => return Err(format!("unknown commit header '{other}'")),
            }
        }
        Ok(Self::Commit(Commit {
            tree: tree.ok_or_else(|| "commit missing tree header".to_owned())?,
            parents,
            author: author.ok_or_else(|| "commit missing author header".to_owned())?,
            committer: committer.ok_or_else(|| "commit missing committer header".to_owned())?,
            message: message.to_owned(),
        }))
    }
}

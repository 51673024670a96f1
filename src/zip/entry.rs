//! Archive entries before and after placement.

/// A node of the tree handed to the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveNode {
    File { name: String, data: Vec<u8> },
    Directory { name: String, children: Vec<ArchiveNode> },
}

impl ArchiveNode {
    pub fn file(name: impl Into<String>, data: Vec<u8>) -> Self {
        ArchiveNode::File { name: name.into(), data }
    }

    pub fn directory(name: impl Into<String>, children: Vec<ArchiveNode>) -> Self {
        ArchiveNode::Directory { name: name.into(), children }
    }
}

/// A named payload waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self { name: name.into(), data }
    }

    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// What the writer recorded for an entry once it was placed in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub name:   String,
    pub crc:    u32,
    pub size:   u32,
    /// Absolute offset of the entry's local header.
    pub offset: u32,
}

/// Depth-first, pre-order flattening of a node tree.
///
/// Directories become empty entries named `prefix + name + "/"` and are
/// emitted before their children, whose names carry that prefix.
pub fn flatten(nodes: Vec<ArchiveNode>) -> Vec<ArchiveEntry> {
    let mut out = Vec::new();
    flatten_into(nodes, "", &mut out);
    out
}

fn flatten_into(nodes: Vec<ArchiveNode>, prefix: &str, out: &mut Vec<ArchiveEntry>) {
    for node in nodes {
        match node {
            ArchiveNode::File { name, data } => {
                out.push(ArchiveEntry::new(format!("{prefix}{name}"), data));
            }
            ArchiveNode::Directory { name, children } => {
                let dir = format!("{prefix}{name}/");
                out.push(ArchiveEntry::new(dir.clone(), Vec::new()));
                flatten_into(children, &dir, out);
            }
        }
    }
}

//! In-process page import built on lopdf
//!
//! Loading a source document is split from adding it to the output:
//! [`load_source`] parses and renumbers a document on the blocking pool, and
//! [`PageAssembler::absorb`] appends the prepared pages. A parser panic only
//! costs the one document; pages already absorbed are untouched.

use crate::error::MergeError;
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Page tree depth beyond which inheritance lookups give up
const MAX_TREE_DEPTH: usize = 32;

/// A parsed source document ready to be absorbed
pub(crate) struct PreparedSource {
    pages: Vec<(ObjectId, Dictionary)>,
    objects: BTreeMap<ObjectId, Object>,
    max_id: u32,
}

impl PreparedSource {
    pub(crate) fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Accumulates pages from many documents into one output document
pub(crate) struct PageAssembler {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl PageAssembler {
    pub(crate) fn new() -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// First object id a source must be renumbered from before [`absorb`](Self::absorb)
    pub(crate) fn next_id(&self) -> u32 {
        self.document.max_id + 1
    }

    pub(crate) fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append every page of a prepared source, in its page order
    pub(crate) fn absorb(&mut self, source: PreparedSource) -> usize {
        let count = source.pages.len();
        self.document.objects.extend(source.objects);
        for (id, mut page) in source.pages {
            page.set("Parent", self.pages_id);
            self.document.objects.insert(id, Object::Dictionary(page));
            self.kids.push(id);
        }
        self.document.max_id = self.document.max_id.max(source.max_id);
        count
    }

    /// Write the assembled document and return its size
    pub(crate) fn save(mut self, output: &Path) -> Result<u64, MergeError> {
        let write_error = |reason: String| MergeError::Write {
            path: output.to_path_buf(),
            reason,
        };

        let kids: Vec<Object> = self.kids.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);
        self.document.compress();

        self.document
            .save(output)
            .map_err(|e| write_error(e.to_string()))?;
        std::fs::metadata(output)
            .map(|meta| meta.len())
            .map_err(|e| write_error(e.to_string()))
    }
}

/// Parse a document and renumber its objects from `start_id`
pub(crate) fn prepare(path: &Path, start_id: u32) -> Result<PreparedSource, MergeError> {
    let load_error = |reason: String| MergeError::from_load(path.to_path_buf(), reason);

    let mut source = Document::load(path).map_err(|e| load_error(e.to_string()))?;
    source.renumber_objects_with(start_id);

    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err(MergeError::EmptyDocument {
            path: path.to_path_buf(),
        });
    }

    let mut pages = Vec::with_capacity(page_ids.len());
    for id in page_ids {
        let mut page = source
            .get_dictionary(id)
            .map_err(|e| load_error(e.to_string()))?
            .clone();
        for key in INHERITABLE_KEYS {
            if !page.has(key)
                && let Some(value) = inherited(&source, &page, key)
            {
                page.set(key.to_vec(), value);
            }
        }
        pages.push((id, page));
    }

    let max_id = source.max_id;
    let objects = source
        .objects
        .into_iter()
        .filter(|(_, object)| {
            !matches!(
                object.type_name().unwrap_or(""),
                "Catalog" | "Pages" | "Page" | "Outlines" | "Outline"
            )
        })
        .collect();

    Ok(PreparedSource {
        pages,
        objects,
        max_id,
    })
}

/// Look a page attribute up through the page's ancestors
fn inherited(document: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = document.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// [`prepare`] on the blocking pool
pub(crate) async fn load_source(path: PathBuf, start_id: u32) -> Result<PreparedSource, MergeError> {
    spawn_blocking(move || prepare(&path, start_id))
        .await
        .map_err(|e| MergeError::Task(e.to_string()))?
}

/// [`PageAssembler::save`] on the blocking pool
pub(crate) async fn write_output(assembler: PageAssembler, output: PathBuf) -> Result<u64, MergeError> {
    spawn_blocking(move || assembler.save(&output))
        .await
        .map_err(|e| MergeError::Task(e.to_string()))?
}

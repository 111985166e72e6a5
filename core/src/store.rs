use crate::error::StoreError;
use crate::posting::Posting;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

const POSTINGS_TREE: &str = "postings";
const DOCUMENTS_TREE: &str = "documents";
const KEY_SEPARATOR: u8 = 0;

/// Point lookup of postings by word. The only contact the ranking engine has with storage.
pub trait PostingStore: Send + Sync {
    /// All postings indexed under `word`, in no particular order. Unknown words yield an empty list.
    fn lookup(&self, word: &str) -> Result<Vec<Posting>, StoreError>;

    /// Number of distinct documents, when the store tracks it.
    fn corpus_size(&self) -> Result<Option<u32>, StoreError> {
        Ok(None)
    }
}

impl<S: PostingStore + ?Sized> PostingStore for &S {
    fn lookup(&self, word: &str) -> Result<Vec<Posting>, StoreError> {
        (**self).lookup(word)
    }
    fn corpus_size(&self) -> Result<Option<u32>, StoreError> {
        (**self).corpus_size()
    }
}

impl<S: PostingStore + ?Sized> PostingStore for Arc<S> {
    fn lookup(&self, word: &str) -> Result<Vec<Posting>, StoreError> {
        (**self).lookup(word)
    }
    fn corpus_size(&self) -> Result<Option<u32>, StoreError> {
        (**self).corpus_size()
    }
}

/// sled-backed posting store.
///
/// Postings live in one tree keyed by `word 0x00 url` so a word lookup is a prefix scan;
/// a second tree keyed by url tracks the distinct documents.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    postings: sled::Tree,
    documents: sled::Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let postings = db.open_tree(POSTINGS_TREE)?;
        let documents = db.open_tree(DOCUMENTS_TREE)?;
        Ok(Self { db, postings, documents })
    }

    /// Write a batch of postings. A posting for an existing (word, url) pair replaces it.
    pub fn insert_batch(&self, postings: &[Posting]) -> Result<(), StoreError> {
        let mut posting_batch = sled::Batch::default();
        let mut document_batch = sled::Batch::default();
        for p in postings {
            let value = bincode::serialize(p).map_err(|source| StoreError::Codec { word: p.word.clone(), source })?;
            posting_batch.insert(posting_key(&p.word, &p.url), value);
            document_batch.insert(p.url.as_bytes(), &[] as &[u8]);
        }
        self.postings.apply_batch(posting_batch)?;
        self.documents.apply_batch(document_batch)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<usize, StoreError> {
        Ok(self.db.flush()?)
    }

    /// Number of stored postings.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

fn posting_key(word: &str, url: &str) -> Vec<u8> {
    let mut key = word_prefix(word);
    key.extend_from_slice(url.as_bytes());
    key
}

fn word_prefix(word: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(word.len() + 1);
    key.extend_from_slice(word.as_bytes());
    key.push(KEY_SEPARATOR);
    key
}

impl PostingStore for SledStore {
    fn lookup(&self, word: &str) -> Result<Vec<Posting>, StoreError> {
        let mut out = Vec::new();
        for entry in self.postings.scan_prefix(word_prefix(word)) {
            let (_key, value) = entry?;
            let posting: Posting =
                bincode::deserialize(&value).map_err(|source| StoreError::Codec { word: word.to_string(), source })?;
            // A word containing the separator byte shares this prefix.
            if posting.word == word {
                out.push(posting);
            }
        }
        Ok(out)
    }

    fn corpus_size(&self) -> Result<Option<u32>, StoreError> {
        let n = self.documents.len();
        Ok(if n == 0 { None } else { Some(u32::try_from(n).unwrap_or(u32::MAX)) })
    }
}

#[derive(Default)]
struct MemoryInner {
    /// word -> url -> posting, urls in first-insertion order.
    postings: HashMap<String, IndexMap<String, Posting>>,
    documents: HashSet<String>,
}

/// In-memory posting store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, posting: Posting) {
        let mut inner = self.inner.write();
        inner.documents.insert(posting.url.clone());
        inner
            .postings
            .entry(posting.word.clone())
            .or_default()
            .insert(posting.url.clone(), posting);
    }

    pub fn extend<I: IntoIterator<Item = Posting>>(&self, postings: I) {
        for p in postings {
            self.insert(p);
        }
    }

    pub fn document_count(&self) -> usize {
        self.inner.read().documents.len()
    }
}

impl FromIterator<Posting> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Posting>>(iter: I) -> Self {
        let store = MemoryStore::new();
        store.extend(iter);
        store
    }
}

impl PostingStore for MemoryStore {
    fn lookup(&self, word: &str) -> Result<Vec<Posting>, StoreError> {
        Ok(self
            .inner
            .read()
            .postings
            .get(word)
            .map(|by_url| by_url.values().cloned().collect())
            .unwrap_or_default())
    }

    fn corpus_size(&self) -> Result<Option<u32>, StoreError> {
        let n = self.document_count();
        Ok(if n == 0 { None } else { Some(u32::try_from(n).unwrap_or(u32::MAX)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Vec<Posting> {
        vec![
            Posting::new("cat", "http://a", 1.0, 0.5),
            Posting::new("cat", "http://b", 0.4, 0.2),
            Posting::new("cats", "http://c", 1.0, 0.9),
            Posting::new("dog", "http://a", 0.5, 0.3),
        ]
    }

    #[test]
    fn sled_lookup_is_exact_on_word() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path().join("db")).unwrap();
        store.insert_batch(&sample()).unwrap();

        let mut cat = store.lookup("cat").unwrap();
        cat.sort_by(|a, b| a.url.cmp(&b.url));
        assert_eq!(cat.len(), 2, "'cats' must not match the 'cat' prefix");
        assert_eq!(cat[0], Posting::new("cat", "http://a", 1.0, 0.5));
        assert!(store.lookup("bird").unwrap().is_empty());
        assert_eq!(store.len(), 4);
        assert_eq!(store.corpus_size().unwrap(), Some(3));
    }

    #[test]
    fn sled_reinsert_replaces_posting() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path().join("db")).unwrap();
        store.insert_batch(&sample()).unwrap();
        store.insert_batch(&[Posting::new("cat", "http://a", 1.0, 0.7)]).unwrap();
        let cat = store.lookup("cat").unwrap();
        assert_eq!(cat.len(), 2);
        assert!(cat.iter().any(|p| p.url == "http://a" && p.euclidean_tf == 0.7));
    }

    #[test]
    fn sled_lookup_ignores_words_sharing_the_key_separator() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path().join("db")).unwrap();
        store
            .insert_batch(&[Posting::new("a\0b", "http://x", 1.0, 0.5), Posting::new("a", "http://y", 1.0, 0.4)])
            .unwrap();
        let a = store.lookup("a").unwrap();
        assert_eq!(a.len(), 1);
        assert!(a.iter().all(|p| p.word == "a" && p.url == "http://y"));
        assert_eq!(store.lookup("a\0b").unwrap().len(), 1);
    }

    #[test]
    fn empty_store_has_no_corpus_size() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path().join("db")).unwrap();
        assert_eq!(store.corpus_size().unwrap(), None);
        assert_eq!(MemoryStore::new().corpus_size().unwrap(), None);
    }

    #[test]
    fn memory_store_matches_sled_semantics() {
        let store: MemoryStore = sample().into_iter().collect();
        store.insert(Posting::new("cat", "http://a", 1.0, 0.7));
        let cat = store.lookup("cat").unwrap();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat[0].euclidean_tf, 0.7);
        assert!(store.lookup("bird").unwrap().is_empty());
        assert_eq!(store.corpus_size().unwrap(), Some(3));
    }

    #[test]
    fn memory_store_keeps_first_insertion_order_on_replace() {
        let store = MemoryStore::from_iter((0..1000).map(|i| Posting::new("w", format!("http://doc/{i}"), 1.0, 0.1)));
        store.insert(Posting::new("w", "http://doc/0", 1.0, 0.9));
        store.insert(Posting::new("w", "http://doc/500", 1.0, 0.8));
        let w = store.lookup("w").unwrap();
        assert_eq!(w.len(), 1000);
        assert_eq!((w[0].url.as_str(), w[0].euclidean_tf), ("http://doc/0", 0.9));
        assert_eq!((w[500].url.as_str(), w[500].euclidean_tf), ("http://doc/500", 0.8));
        assert_eq!(w[999].url, "http://doc/999");
    }

    #[test]
    fn references_and_arcs_forward() {
        let store = Arc::new(MemoryStore::from_iter(sample()));
        fn lookup_len<S: PostingStore>(s: S) -> usize {
            s.lookup("cat").unwrap().len()
        }
        assert_eq!(lookup_len(&*store), 2);
        assert_eq!(lookup_len(Arc::clone(&store)), 2);
    }
}

use std::sync::Arc;

use falx::analysis::StandardAnalyzer;
use falx::document::{CompositeField, Document, Field, IndexingOptions};
use falx::index::{Batch, Index};
use falx::store::memory::MemoryStore;
use falx::store::KVStore;

fn open_index() -> Index {
    let index = Index::new(
        Arc::new(MemoryStore::new()),
        Arc::new(StandardAnalyzer::new()),
    );
    index.open().unwrap();
    index
}

fn doc(id: &str, fields: &[(&str, &str)]) -> Document {
    let mut doc = Document::new(id);
    for (name, text) in fields {
        doc.add_field(Field::text(*name, *text, IndexingOptions::default()));
    }
    doc
}

#[test]
fn test_fresh_index_is_empty() {
    let index = open_index();
    assert_eq!(index.doc_count(), 0);
    assert_eq!(index.row_count().unwrap(), 1);
    assert!(index.reader().fields().is_empty());
}

#[test]
fn test_index_and_fetch_document() {
    let index = open_index();
    index
        .update(doc("1", &[("name", "marty"), ("desc", "gophercon india")]))
        .unwrap();
    assert_eq!(index.doc_count(), 1);

    let reader = index.reader();
    let fetched = reader.document("1").unwrap().unwrap();
    assert_eq!(fetched.fields.len(), 2);
    assert!(reader.document("2").unwrap().is_none());
}

#[test]
fn test_update_replaces_document() {
    let index = open_index();
    index.update(doc("1", &[("desc", "apple banana")])).unwrap();
    index.update(doc("1", &[("desc", "banana cherry")])).unwrap();
    assert_eq!(index.doc_count(), 1);

    let reader = index.reader();
    assert_eq!(reader.term_field_reader(b"apple", "desc").unwrap().count(), 0);
    assert_eq!(reader.term_field_reader(b"banana", "desc").unwrap().count(), 1);
    assert_eq!(reader.term_field_reader(b"cherry", "desc").unwrap().count(), 1);
}

#[test]
fn test_delete_then_absent() {
    let index = open_index();
    index.update(doc("1", &[("desc", "ephemeral content")])).unwrap();
    index.delete("1").unwrap();

    assert_eq!(index.doc_count(), 0);
    let reader = index.reader();
    assert!(reader.document("1").unwrap().is_none());
    assert_eq!(
        reader.term_field_reader(b"ephemeral", "desc").unwrap().count(),
        0
    );
    let mut id_reader = reader.doc_id_reader("", "");
    assert!(id_reader.next().unwrap().is_none());
}

#[test]
fn test_summary_counts_match_postings() {
    let index = open_index();
    index.update(doc("1", &[("desc", "red green blue")])).unwrap();
    index.update(doc("2", &[("desc", "red green")])).unwrap();
    index.update(doc("3", &[("desc", "red")])).unwrap();
    index.update(doc("2", &[("desc", "red yellow")])).unwrap();
    index.delete("3").unwrap();

    // every dictionary count must equal the number of postings behind it
    let reader = index.reader();
    let mut dict = reader.field_dict("desc").unwrap();
    let mut seen = Vec::new();
    while let Some(entry) = dict.next().unwrap() {
        let mut tfr = reader
            .term_field_reader(entry.term.as_bytes(), "desc")
            .unwrap();
        let mut postings = 0;
        while tfr.next().unwrap().is_some() {
            postings += 1;
        }
        assert_eq!(entry.count, postings, "term {}", entry.term);
        seen.push((entry.term, entry.count));
    }
    assert_eq!(
        seen,
        vec![
            ("blue".to_string(), 1),
            ("green".to_string(), 1),
            ("red".to_string(), 2),
            ("yellow".to_string(), 1),
        ]
    );
}

#[test]
fn test_field_ids_stay_stable() {
    let index = open_index();
    index.update(doc("1", &[("alpha", "x"), ("beta", "y")])).unwrap();
    index.update(doc("2", &[("beta", "y"), ("gamma", "z")])).unwrap();

    // names come back in first-seen order, unaffected by later documents
    assert_eq!(index.reader().fields(), vec!["alpha", "beta", "gamma"]);

    index.delete("1").unwrap();
    index.update(doc("3", &[("alpha", "x")])).unwrap();
    assert_eq!(index.reader().fields(), vec!["alpha", "beta", "gamma"]);
}

#[test]
fn test_batch_is_atomicish_and_counts() {
    let index = open_index();
    index.update(doc("old", &[("desc", "stale")])).unwrap();

    let mut batch = Batch::new();
    batch.update(doc("a", &[("desc", "fresh")]));
    batch.update(doc("b", &[("desc", "fresh")]));
    batch.delete("old");
    batch.delete("never-existed");
    batch.set_internal(b"checkpoint", b"42");
    index.batch(batch).unwrap();

    assert_eq!(index.doc_count(), 2);
    let reader = index.reader();
    assert_eq!(reader.term_field_reader(b"fresh", "desc").unwrap().count(), 2);
    assert_eq!(reader.term_field_reader(b"stale", "desc").unwrap().count(), 0);
    assert_eq!(
        reader.get_internal(b"checkpoint").unwrap(),
        Some(b"42".to_vec())
    );
}

#[test]
fn test_composite_field_searchable() {
    let index = open_index();
    let mut d = Document::new("1");
    d.add_field(Field::text("name", "marty", IndexingOptions::INDEXED));
    d.add_field(Field::text("desc", "gophercon", IndexingOptions::INDEXED));
    d.add_composite_field(CompositeField::all("_all", IndexingOptions::INDEXED));
    index.update(d).unwrap();

    let reader = index.reader();
    assert_eq!(reader.term_field_reader(b"marty", "_all").unwrap().count(), 1);
    assert_eq!(
        reader.term_field_reader(b"gophercon", "_all").unwrap().count(),
        1
    );
    // the composite never leaks into the source fields
    assert_eq!(reader.term_field_reader(b"marty", "desc").unwrap().count(), 0);
}

#[test]
fn test_reopen_preserves_index() {
    let store: Arc<dyn KVStore> = Arc::new(MemoryStore::new());
    {
        let index = Index::new(Arc::clone(&store), Arc::new(StandardAnalyzer::new()));
        index.open().unwrap();
        index.update(doc("1", &[("desc", "persistent")])).unwrap();
    }

    let index = Index::new(Arc::clone(&store), Arc::new(StandardAnalyzer::new()));
    index.open().unwrap();
    assert_eq!(index.doc_count(), 1);
    let reader = index.reader();
    assert_eq!(
        reader.term_field_reader(b"persistent", "desc").unwrap().count(),
        1
    );
    // new fields keep extending the recovered catalog
    index.update(doc("2", &[("extra", "field")])).unwrap();
    assert_eq!(index.reader().fields(), vec!["desc", "extra"]);
}

use std::sync::Arc;

use falx::analysis::StandardAnalyzer;
use falx::document::{Document, Field, IndexingOptions};
use falx::index::{Index, IndexReader};
use falx::query::{BooleanQuery, PhraseQuery, Query, TermQuery};
use falx::search::collector::TopScoreCollector;
use falx::store::memory::MemoryStore;

fn seeded_reader() -> IndexReader {
    let index = Index::new(
        Arc::new(MemoryStore::new()),
        Arc::new(StandardAnalyzer::new()),
    );
    index.open().unwrap();

    let corpus = [
        ("1", "marty", "beer beer beer beer"),
        ("2", "steve", "angst beer couch database"),
        ("3", "dustin", "apple beer column dank"),
        ("4", "ravi", "fresh apple juice"),
    ];
    for (id, name, desc) in corpus {
        let mut doc = Document::new(id);
        doc.add_field(Field::text("name", name, IndexingOptions::INDEXED));
        doc.add_field(Field::text(
            "desc",
            desc,
            IndexingOptions::INDEXED | IndexingOptions::TERM_VECTORS,
        ));
        index.update(doc).unwrap();
    }
    index.reader()
}

fn search(reader: &IndexReader, query: &dyn Query, k: usize) -> Vec<(String, f64)> {
    let mut searcher = query.searcher(reader, false).unwrap();
    let mut collector = TopScoreCollector::new(k);
    collector.collect(searcher.as_mut()).unwrap();
    collector
        .results()
        .into_iter()
        .map(|m| (m.id, m.score))
        .collect()
}

#[test]
fn test_term_query_ranks_by_frequency() {
    let reader = seeded_reader();
    let results = search(&reader, &TermQuery::new("desc", "beer"), 10);

    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    // doc 1 is all beer; its higher tf beats the longer mixed fields
    assert_eq!(ids[0], "1");
    assert_eq!(ids.len(), 3);
    assert!(results.iter().all(|(_, score)| *score > 0.0));
}

#[test]
fn test_boolean_query_combines_clauses() {
    let reader = seeded_reader();
    let query = BooleanQuery::new()
        .with_must(Box::new(TermQuery::new("desc", "beer")))
        .with_should(Box::new(TermQuery::new("name", "marty")))
        .with_should(Box::new(TermQuery::new("name", "dustin")))
        .with_must_not(Box::new(TermQuery::new("desc", "couch")));
    let results = search(&reader, &query, 10);

    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    // doc 2 is excluded by the couch clause; both survivors match a should
    assert_eq!(ids, vec!["1", "3"]);
    assert!(results[0].1 > results[1].1);
}

#[test]
fn test_boolean_min_should() {
    let reader = seeded_reader();
    let query = BooleanQuery::new()
        .with_should(Box::new(TermQuery::new("desc", "apple")))
        .with_should(Box::new(TermQuery::new("desc", "juice")))
        .with_min_should(2);
    let results = search(&reader, &query, 10);

    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["4"]);
}

#[test]
fn test_phrase_query_is_exact() {
    let reader = seeded_reader();

    let results = search(&reader, &PhraseQuery::from_phrase("desc", &["angst", "beer"]), 10);
    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["2"]);

    // same terms, wrong order
    let results = search(&reader, &PhraseQuery::from_phrase("desc", &["beer", "angst"]), 10);
    assert!(results.is_empty());
}

#[test]
fn test_searcher_streams_in_id_order() {
    let reader = seeded_reader();
    let query = TermQuery::new("desc", "beer");
    let mut searcher = query.searcher(&reader, false).unwrap();

    let mut last: Option<String> = None;
    while let Some(rv) = searcher.next().unwrap() {
        if let Some(prev) = &last {
            assert!(rv.id > *prev);
        }
        last = Some(rv.id);
    }
}

#[test]
fn test_collector_skip() {
    let reader = seeded_reader();
    let query = TermQuery::new("desc", "beer");

    let mut searcher = query.searcher(&reader, false).unwrap();
    let mut collector = TopScoreCollector::with_skip(2, 1);
    collector.collect(searcher.as_mut()).unwrap();

    assert_eq!(collector.total(), 3);
    let page = collector.results();
    assert_eq!(page.len(), 2);

    // the skipped match is the overall best
    let full = search(&reader, &query, 10);
    assert_eq!(page[0].id, full[1].0);
    assert_eq!(page[1].id, full[2].0);
}

#[test]
fn test_explanations_track_scores() {
    let reader = seeded_reader();
    let query = BooleanQuery::new()
        .with_must(Box::new(TermQuery::new("desc", "beer")))
        .with_should(Box::new(TermQuery::new("name", "marty").with_boost(2.0)));

    let mut searcher = query.searcher(&reader, true).unwrap();
    while let Some(rv) = searcher.next().unwrap() {
        let expl = rv.expl.expect("explain run must attach explanations");
        assert!((expl.value - rv.score).abs() < 1e-9);
        assert!(!expl.children.is_empty());
    }
}

#[test]
fn test_locations_surface_term_vectors() {
    let reader = seeded_reader();
    let query = TermQuery::new("desc", "angst");
    let mut searcher = query.searcher(&reader, false).unwrap();

    let rv = searcher.next().unwrap().unwrap();
    assert_eq!(rv.id, "2");
    let locations = &rv.locations["desc"]["angst"];
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].pos, 1);
    assert_eq!(locations[0].start, 0);
    assert_eq!(locations[0].end, 5);

    // the name field was indexed without vectors
    let mut searcher = TermQuery::new("name", "marty").searcher(&reader, false).unwrap();
    let rv = searcher.next().unwrap().unwrap();
    assert!(rv.locations.is_empty());
}

use retrieval::{rank, vectorize, Corpus, DocInput};

fn doc(id: &str, text: &str) -> DocInput {
    DocInput {
        id: id.to_string(),
        name: format!("{id}.md"),
        text: text.to_string(),
    }
}

fn approx(a: f32, b: f32) {
    assert!((a - b).abs() < 1e-3, "expected {b}, got {a}");
}

#[test]
fn two_document_scenario() {
    // D1 = "cat dog", D2 = "cat cat fish", N = 2.
    // idf(cat) = ln(3/3)+1 = 1.0, idf(dog) = idf(fish) = ln(3/2)+1 ~ 1.4055.
    let corpus = Corpus::build(vec![doc("d1", "cat dog"), doc("d2", "cat cat fish")]).unwrap();

    assert_eq!(corpus.doc_frequency("cat"), 2);
    assert_eq!(corpus.doc_frequency("dog"), 1);
    assert_eq!(corpus.doc_frequency("fish"), 1);

    let d1 = &corpus.docs()[0];
    approx(d1.weights["cat"], 1.0);
    approx(d1.weights["dog"], 1.4055);
    approx(d1.norm, 1.7250);

    let d2 = &corpus.docs()[1];
    approx(d2.weights["cat"], 2.0);
    approx(d2.weights["fish"], 1.4055);
    approx(d2.norm, 2.4445);

    let (q, q_norm) = vectorize("cat", &corpus);
    approx(q["cat"], 1.0);
    approx(q_norm, 1.0);

    let hits = corpus.retrieve("cat", 2);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "d2");
    approx(hits[0].score, 0.8182);
    assert_eq!(hits[1].id, "d1");
    approx(hits[1].score, 0.5797);
}

#[test]
fn scores_are_within_unit_interval() {
    let corpus = Corpus::build(vec![
        doc("a", "the quick brown fox"),
        doc("b", "quick quick fox"),
        doc("c", "lazy dog"),
    ])
    .unwrap();
    for query in ["quick fox", "dog", "quick brown fox lazy dog", "zebra"] {
        for hit in corpus.retrieve(query, 10) {
            assert!(hit.score > 0.0 && hit.score <= 1.0, "score {} for {query:?}", hit.score);
        }
    }
}

#[test]
fn identical_document_scores_one() {
    let corpus = Corpus::build(vec![doc("a", "alpha beta"), doc("b", "gamma")]).unwrap();
    let hits = corpus.retrieve("alpha beta", 1);
    assert_eq!(hits[0].id, "a");
    approx(hits[0].score, 1.0);
}

#[test]
fn zero_scores_are_excluded_even_under_k() {
    let corpus = Corpus::build(vec![doc("a", "cat"), doc("b", "dog")]).unwrap();
    let hits = corpus.retrieve("cat", 5);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "a");
}

#[test]
fn k_zero_yields_empty() {
    let corpus = Corpus::build(vec![doc("a", "cat")]).unwrap();
    assert!(corpus.retrieve("cat", 0).is_empty());
}

#[test]
fn empty_corpus_yields_empty_for_any_query() {
    let corpus = Corpus::build(Vec::new()).unwrap();
    assert!(corpus.retrieve("anything at all", 10).is_empty());
    assert!(corpus.retrieve("", 10).is_empty());
}

#[test]
fn empty_query_yields_empty() {
    let corpus = Corpus::build(vec![doc("a", "cat dog")]).unwrap();
    assert!(corpus.retrieve("", 5).is_empty());
    assert!(corpus.retrieve("...!!!", 5).is_empty());
}

#[test]
fn unseen_terms_still_produce_a_valid_vector() {
    let corpus = Corpus::build(vec![doc("a", "cat dog")]).unwrap();
    let (q, q_norm) = vectorize("zebra unicorn", &corpus);
    // df = 0 everywhere: idf = ln(2/1)+1, still strictly positive
    assert!(q["zebra"] > 0.0);
    assert!(q["unicorn"] > 0.0);
    assert!(q_norm > 0.0);
    // no overlap with the corpus, so no hits, but no panic either
    assert!(corpus.retrieve("zebra unicorn", 3).is_empty());
}

#[test]
fn equal_scores_keep_build_order() {
    // Identical texts score identically against any query; build order must
    // decide their relative rank.
    let corpus = Corpus::build(vec![
        doc("first", "cat dog"),
        doc("second", "cat dog"),
        doc("third", "cat dog"),
    ])
    .unwrap();
    let hits = corpus.retrieve("cat", 3);
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, ["first", "second", "third"]);
    assert!((hits[0].score - hits[2].score).abs() < f32::EPSILON);
}

#[test]
fn results_are_sorted_descending() {
    let corpus = Corpus::build(vec![
        doc("a", "cat"),
        doc("b", "cat cat"),
        doc("c", "cat mouse bird"),
    ])
    .unwrap();
    let hits = corpus.retrieve("cat", 3);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn k_truncates_results() {
    let corpus = Corpus::build(vec![doc("a", "cat"), doc("b", "cat"), doc("c", "cat")]).unwrap();
    assert_eq!(corpus.retrieve("cat", 2).len(), 2);
    assert_eq!(corpus.retrieve("cat", 100).len(), 3);
}

#[test]
fn rank_accepts_a_prebuilt_query_vector() {
    let corpus = Corpus::build(vec![doc("a", "cat dog"), doc("b", "fish")]).unwrap();
    let (q, q_norm) = vectorize("cat", &corpus);
    let hits = rank(&q, q_norm, &corpus, 10);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "a");
}

#[test]
fn arbitrary_text_never_fails_build() {
    let corpus = Corpus::build(vec![
        doc("binary", "\u{0}\u{1}\u{2}garbage\u{fffd}"),
        doc("empty", ""),
        doc("unicode", "日本語だけ"),
    ])
    .unwrap();
    assert_eq!(corpus.len(), 3);
    // only the decodable ascii run survives tokenization
    assert_eq!(corpus.doc_frequency("garbage"), 1);
    assert_eq!(corpus.docs()[1].norm, 0.0);
    assert_eq!(corpus.docs()[2].norm, 0.0);
}

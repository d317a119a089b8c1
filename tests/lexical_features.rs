use jsguard_features::config::LexicalConfig;
use jsguard_features::features::lexical::tokenize;
use jsguard_features::features::{LexicalExtractor, TfidfVectorizer};
use jsguard_features::table::{ColumnGroup, FeatureTable, Sample};

fn ten_docs() -> Vec<String> {
    (0..10)
        .map(|i| {
            if i < 5 {
                "var alpha = 1;".to_string()
            } else {
                "var beta = 2;".to_string()
            }
        })
        .collect()
}

#[test]
fn tokens_are_lowercased_words_of_two_or_more_chars() {
    assert_eq!(
        tokenize("var X = getElementById('a_b') + 1;", true),
        vec!["var", "getelementbyid", "a_b"]
    );
}

#[test]
fn document_frequency_bounds_filter_vocabulary() {
    let v = TfidfVectorizer::fit(&ten_docs(), &LexicalConfig::default());
    // "var" is in every document (> 50%), single-character tokens never match
    assert_eq!(v.terms(), &["alpha".to_string(), "beta".to_string()]);
    assert_eq!(v.documents(), 10);
    let expected_idf = (11.0f64 / 6.0).ln() + 1.0;
    assert!((v.idf()[0] - expected_idf).abs() < 1e-12);
}

#[test]
fn rows_are_l2_normalized() {
    let docs = ten_docs();
    let v = TfidfVectorizer::fit(&docs, &LexicalConfig::default());
    let m = v.transform(&["alpha alpha beta", "nothing known"]);
    let norm: f64 = m.row(0).iter().map(|x| x * x).sum::<f64>().sqrt();
    assert!((norm - 1.0).abs() < 1e-12);
    // sublinear tf: 1 + ln(2) for alpha vs 1 for beta, same idf
    assert!((m[[0, 0]] / m[[0, 1]] - (1.0 + 2f64.ln())).abs() < 1e-12);
    assert!(m.row(1).iter().all(|x| *x == 0.0));
}

#[test]
fn single_document_batch_has_empty_vocabulary() {
    let table = FeatureTable::from_sources(["eval(unescape('%61'))"]);
    let (out, v) = LexicalExtractor::new(LexicalConfig::default()).extract(&table).unwrap();
    assert!(v.is_empty());
    assert!(out.keys_in(Some(ColumnGroup::Lexical)).is_empty());
    assert_eq!(out.len(), 1);
}

#[test]
fn extract_appends_one_column_per_term() {
    let table = FeatureTable::from_sources(ten_docs());
    let (out, v) = LexicalExtractor::new(LexicalConfig::default()).extract(&table).unwrap();
    assert_eq!(out.keys_in(Some(ColumnGroup::Lexical)).len(), v.terms().len());
    assert_eq!(out.get(ColumnGroup::Lexical, "alpha").unwrap()[0], 1.0);
    assert_eq!(out.get(ColumnGroup::Lexical, "beta").unwrap()[0], 0.0);
    assert_eq!(out.get(ColumnGroup::Lexical, "beta").unwrap()[9], 1.0);
}

#[test]
fn missing_text_is_scored_as_empty() {
    let mut samples: Vec<Sample> = ten_docs().into_iter().map(Sample::from_source).collect();
    samples.push(Sample::default());
    let table = FeatureTable::new(samples);
    let extractor = LexicalExtractor::new(LexicalConfig::default());
    let (out, _) = extractor.extract(&table).unwrap();
    assert_eq!(out.len(), 11);
    assert_eq!(out.get(ColumnGroup::Lexical, "alpha").unwrap()[10], 0.0);
}

#[test]
fn apply_reuses_fitted_vocabulary() {
    let extractor = LexicalExtractor::new(LexicalConfig::default());
    let (_, v) = extractor.extract(&FeatureTable::from_sources(ten_docs())).unwrap();
    let single = FeatureTable::from_sources(["beta()"]);
    let out = extractor.apply(&single, &v).unwrap();
    assert_eq!(out.get(ColumnGroup::Lexical, "beta").unwrap()[0], 1.0);
    assert_eq!(out.get(ColumnGroup::Lexical, "alpha").unwrap()[0], 0.0);
}

#[test]
fn deserialized_vectorizer_transforms_identically() {
    let v = TfidfVectorizer::fit(&ten_docs(), &LexicalConfig::default());
    let json = serde_json::to_string(&v).unwrap();
    let restored: TfidfVectorizer = serde_json::from_str(&json).unwrap();
    let docs = ["alpha beta beta", "var"];
    let a = v.transform(&docs);
    let b = restored.transform(&docs);
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() < 1e-12);
    }
}

use search_core::tokenizer::normalize;

#[test]
fn it_normalizes_and_stems() {
    let words = normalize("Running Runners RUN! The café's menu.");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // Unicode normalization keeps the accented letter as part of the token
    assert!(words.iter().any(|w| w.starts_with("caf")));
}

#[test]
fn it_filters_stopwords() {
    let words = normalize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert_eq!(words.len(), 5);
}

#[test]
fn it_is_deterministic() {
    let text = "Slim Fit Men's Casual Shirts, Pack of 2";
    assert_eq!(normalize(text), normalize(text));
}

#[test]
fn it_strips_punctuation_boundaries() {
    assert_eq!(normalize("(denim)"), normalize("denim"));
    assert_eq!(normalize("denim..."), normalize("DENIM"));
}

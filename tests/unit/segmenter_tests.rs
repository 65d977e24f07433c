/*!
 * Tests for sentence segmentation
 */

use textfix::segmenter::{DelimiterSegmenter, Segmenter, Sentence, UnicodeSegmenter};

use crate::common;

fn assert_lossless(text: &str, sentences: &[Sentence]) {
    let joined: String = sentences.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(joined, text);

    let mut previous_end = 0;
    for sentence in sentences {
        assert_eq!(sentence.start, previous_end);
        assert_eq!(&text[sentence.start..sentence.end], sentence.text);
        assert!(!sentence.text.trim().is_empty());
        previous_end = sentence.end;
    }
    assert_eq!(previous_end, text.len());
}

#[test]
fn test_unicodeSegmenter_sampleDocument_shouldBeLossless() {
    let document = common::sample_document();
    let sentences = UnicodeSegmenter::new().segment(&document, Some("it"));

    assert!(sentences.len() >= 16);
    assert_lossless(&document, &sentences);
}

#[test]
fn test_unicodeSegmenter_paragraphBreak_shouldStayWithPreviousSentence() {
    let text = "Prima riga.\n\nSeconda riga.";
    let sentences = UnicodeSegmenter::new().segment(text, None);

    assert_eq!(sentences.len(), 2);
    assert_eq!(sentences[0].text, "Prima riga.\n\n");
    assert_eq!(sentences[1].text, "Seconda riga.");
}

#[test]
fn test_unicodeSegmenter_leadingWhitespace_shouldJoinFirstSentence() {
    let text = "\n\n  Inizio. Fine.";
    let sentences = UnicodeSegmenter::new().segment(text, None);

    assert_eq!(sentences[0].start, 0);
    assert!(sentences[0].text.starts_with("\n\n"));
    assert_lossless(text, &sentences);
}

#[test]
fn test_unicodeSegmenter_sameInput_shouldBeDeterministic() {
    let document = common::sample_document();
    let segmenter = UnicodeSegmenter::new();

    assert_eq!(segmenter.segment(&document, None), segmenter.segment(&document, Some("it")));
}

#[test]
fn test_delimiterSegmenter_sampleDocument_shouldBeLossless() {
    let document = common::sample_document();
    let sentences = DelimiterSegmenter::new().segment(&document, None);

    // Clauses are finer than sentences
    assert!(sentences.len() > UnicodeSegmenter::new().segment(&document, None).len());
    assert_lossless(&document, &sentences);
}

#[test]
fn test_segmenter_asTraitObject_shouldWork() {
    let segmenters: Vec<Box<dyn Segmenter>> = vec![
        Box::new(UnicodeSegmenter::new()),
        Box::new(DelimiterSegmenter::new()),
    ];

    for segmenter in segmenters {
        let sentences = segmenter.segment("Uno. Due.", None);
        assert_lossless("Uno. Due.", &sentences);
    }
}

use std::fs;

use figment::providers::{Format, Toml};
use figment::Figment;
use ragctx_core::chunker::{clean, Chunker, ChunkingConfig};
use ragctx_core::config::{Config, RagSettings};
use ragctx_core::types::{ChunkScope, Document, MediaKind};
use tempfile::TempDir;

fn words(n: usize) -> String {
    (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

fn chunker(max_tokens: usize, overlap: usize) -> Chunker {
    Chunker::new(ChunkingConfig::new(max_tokens, overlap).expect("valid chunking config"))
}

#[test]
fn clean_collapses_whitespace_and_blank_lines() {
    let raw = "  alpha \t\t beta\n\n\n\n\ngamma  \n\ndelta  ";
    assert_eq!(clean(raw), "alpha beta\n\ngamma \n\ndelta");
}

#[test]
fn empty_text_yields_no_chunks() {
    let c = Chunker::default();
    assert!(c.chunk("").is_empty());
    assert!(c.chunk(" \t\n\n\n ").is_empty());
}

#[test]
fn short_text_is_a_single_chunk() {
    let c = chunker(10, 3);
    assert_eq!(c.chunk(&words(10)), vec![words(10)]);
    assert_eq!(c.chunk("cats are mammals"), vec!["cats are mammals".to_string()]);
}

#[test]
fn chunk_count_matches_window_formula() {
    for (w, n, o) in [(11usize, 10usize, 3usize), (25, 10, 3), (100, 7, 2), (451, 450, 80), (1000, 450, 80), (9, 3, 0)] {
        let chunks = chunker(n, o).chunk(&words(w));
        let expected = (w - o).div_ceil(n - o);
        assert_eq!(chunks.len(), expected, "W={w} N={n} O={o}");
        for ch in &chunks { assert!(ch.split_whitespace().count() <= n); }
    }
}

#[test]
fn overlaps_reconstruct_the_word_sequence() {
    let (n, o) = (10usize, 4usize);
    let text = words(57);
    let chunks = chunker(n, o).chunk(&text);

    let mut rebuilt: Vec<String> = chunks[0].split_whitespace().map(str::to_string).collect();
    for pair in chunks.windows(2) {
        let prev: Vec<&str> = pair[0].split_whitespace().collect();
        let next: Vec<&str> = pair[1].split_whitespace().collect();
        assert_eq!(&prev[prev.len() - o..], &next[..o], "consecutive chunks share the overlap");
        rebuilt.extend(next[o..].iter().map(|s| s.to_string()));
    }
    let all_words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    assert_eq!(rebuilt, all_words);
}

#[test]
fn overlap_must_be_smaller_than_window() {
    assert!(ChunkingConfig::new(10, 10).is_err());
    assert!(ChunkingConfig::new(10, 11).is_err());
    assert!(ChunkingConfig::new(0, 0).is_err());
    assert!(ChunkingConfig::new(10, 9).is_ok());
}

#[test]
fn deserialized_chunking_is_validated() {
    let parse = |toml: &str| Figment::new().merge(Toml::string(toml)).extract::<ChunkingConfig>();

    assert!(parse("max_tokens = 3\noverlap = 3").is_err());
    assert!(parse("max_tokens = 0\noverlap = 0").is_err());
    let cfg = parse("max_tokens = 3\noverlap = 1").expect("valid chunking");
    assert_eq!(cfg, ChunkingConfig::new(3, 1).expect("chunking"));

    let c = Chunker::new(cfg);
    assert_eq!(c.config(), cfg);
    assert_eq!(c.chunk("a b c d e"), vec!["a b c", "c d e"]);
}

#[test]
fn chunking_profiles() {
    let general = ChunkingConfig::default();
    assert_eq!((general.max_tokens(), general.overlap()), (400, 50));
    let docs = ChunkingConfig::documents();
    assert_eq!((docs.max_tokens(), docs.overlap()), (450, 80));
}

#[test]
fn media_kind_prefers_declared_type() {
    let doc = Document::with_media_type("upload.bin", "application/pdf");
    assert_eq!(doc.media_kind(), Some(MediaKind::Pdf));
    let doc = Document::with_media_type(
        "upload.bin",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    );
    assert_eq!(doc.media_kind(), Some(MediaKind::Docx));
    let doc = Document::with_media_type("notes.pdf", "text/plain");
    assert_eq!(doc.media_kind(), Some(MediaKind::PlainText));
}

#[test]
fn media_kind_falls_back_to_extension() {
    assert_eq!(Document::new("a/b/report.PDF").media_kind(), Some(MediaKind::Pdf));
    assert_eq!(Document::new("notes.md").media_kind(), Some(MediaKind::PlainText));
    assert_eq!(Document::with_media_type("x.docx", "application/octet-stream").media_kind(), Some(MediaKind::Docx));
    assert_eq!(Document::new("photo.png").media_kind(), None);
    assert_eq!(Document::new("no_extension").media_kind(), None);
}

#[test]
fn config_file_sections_are_typed() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("ragctx.toml");
    fs::write(&path, "[rag]\nmax_tokens = 120\noverlap = 20\ntop_k = 3\nscope = \"per_document\"\n\n[embed]\nuse_fake = true\n").expect("write");

    let config = Config::from_file(&path).expect("config");
    let rag = config.rag_settings().expect("rag");
    assert_eq!(rag.top_k, 3);
    assert_eq!(rag.scope, ChunkScope::PerDocument);
    assert_eq!(rag.chunking().expect("chunking").max_tokens(), 120);
    let embed = config.embed_settings().expect("embed");
    assert!(embed.use_fake);
    assert_eq!(embed.max_len, 256);
}

#[test]
fn config_rejects_overlap_not_below_window() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("bad.toml");
    fs::write(&path, "[rag]\nmax_tokens = 50\noverlap = 50\n").expect("write");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn missing_sections_use_defaults() {
    let rag = RagSettings::default();
    assert_eq!((rag.max_tokens, rag.overlap, rag.top_k), (450, 80, 6));
    assert_eq!(rag.scope, ChunkScope::Concatenated);
}

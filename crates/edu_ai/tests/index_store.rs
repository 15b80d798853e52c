use std::fs;

use edu_ai::embeddings::{EmbeddingProvider, HashingEmbedder};
use edu_ai::index::{IndexEntry, VectorIndex, ENTRIES_FILE, INDEX_FORMAT_VERSION, MANIFEST_FILE};
use edu_core::domain::{Chunk, Provenance};
use edu_core::error::codes;
use pretty_assertions::assert_eq;

const TEXTS: [&str; 4] = [
    "Machine learning is a subfield of AI.",
    "Linear regression predicts a continuous target.",
    "Gradient descent updates parameters along the negative gradient.",
    "A confusion matrix tabulates predicted against actual classes.",
];

fn build(embedder: &HashingEmbedder) -> VectorIndex {
    let texts: Vec<String> = TEXTS.iter().map(|t| t.to_string()).collect();
    let vectors = embedder.embed_documents(&texts).expect("embed");
    let entries = texts
        .into_iter()
        .zip(vectors)
        .enumerate()
        .map(|(i, (text, vector))| {
            let chunk = Chunk::new(
                i as u32,
                text,
                Provenance {
                    source: "notes.docx".to_string(),
                    path: "data/notes.docx".to_string(),
                    page: None,
                    offset: 0,
                },
            );
            IndexEntry::from_chunk(chunk, vector)
        })
        .collect();
    VectorIndex::build(entries, embedder.model_id())
        .expect("build")
        .with_source_fingerprint("fp")
}

#[test]
fn save_load_roundtrip_returns_exact_match_first() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path().join("vector_store");
    let embedder = HashingEmbedder::new("hash", 128);
    build(&embedder).save(&dir).expect("save");

    let loaded = VectorIndex::load(&dir).expect("load");
    assert_eq!(loaded.len(), TEXTS.len());
    assert_eq!(loaded.manifest().format_version, INDEX_FORMAT_VERSION);
    assert_eq!(loaded.manifest().embedding_model, "hash");
    assert_eq!(loaded.manifest().dims, 128);
    assert_eq!(loaded.manifest().source_fingerprint.as_deref(), Some("fp"));
    assert!(loaded.manifest().entries_sha256.is_some());

    for text in TEXTS {
        let q = embedder.embed_query(text).expect("embed");
        let res = loaded.query(&q, 1).expect("query");
        assert_eq!(res.hits[0].text, text);
        assert!((res.hits[0].score - 1.0).abs() < 1e-5, "score={}", res.hits[0].score);
    }
}

#[test]
fn k_larger_than_index_returns_everything_best_first() {
    let embedder = HashingEmbedder::new("hash", 128);
    let index = build(&embedder);
    let q = embedder.embed_query("regression target").expect("embed");
    let res = index.query(&q, 50).expect("query");
    assert_eq!(res.len(), TEXTS.len());
    for pair in res.hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn fresh_path_is_index_not_found() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let err = VectorIndex::load(&tmp.path().join("nothing_here")).expect_err("missing");
    assert!(err.is(codes::INDEX_NOT_FOUND), "{err}");

    // An existing but empty directory is not an index either.
    let err = VectorIndex::load(tmp.path()).expect_err("empty dir");
    assert!(err.is(codes::INDEX_NOT_FOUND), "{err}");
}

#[test]
fn tampered_entries_are_index_corrupt() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path().join("idx");
    build(&HashingEmbedder::new("hash", 32)).save(&dir).expect("save");

    let entries_path = dir.join(ENTRIES_FILE);
    let mut raw = fs::read_to_string(&entries_path).expect("read");
    raw = raw.replacen("Machine", "Mashine", 1);
    fs::write(&entries_path, raw).expect("write");

    let err = VectorIndex::load(&dir).expect_err("corrupt");
    assert!(err.is(codes::INDEX_CORRUPT), "{err}");
}

#[test]
fn garbage_manifest_or_missing_entries_are_index_corrupt() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path().join("idx");
    build(&HashingEmbedder::new("hash", 32)).save(&dir).expect("save");

    fs::remove_file(dir.join(ENTRIES_FILE)).expect("rm");
    assert!(VectorIndex::load(&dir).expect_err("no entries").is(codes::INDEX_CORRUPT));

    fs::write(dir.join(MANIFEST_FILE), b"{ not json").expect("write");
    assert!(VectorIndex::load(&dir).expect_err("bad manifest").is(codes::INDEX_CORRUPT));
}

#[test]
fn unsupported_format_version_is_index_corrupt() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path().join("idx");
    build(&HashingEmbedder::new("hash", 32)).save(&dir).expect("save");

    let path = dir.join(MANIFEST_FILE);
    let mut manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(&path).expect("read")).expect("json");
    manifest["format_version"] = serde_json::json!(INDEX_FORMAT_VERSION + 1);
    fs::write(&path, serde_json::to_vec(&manifest).expect("encode")).expect("write");

    assert!(VectorIndex::load(&dir).expect_err("version").is(codes::INDEX_CORRUPT));
}

#[test]
fn interrupted_save_leaves_previous_index_loadable() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path().join("idx");
    build(&HashingEmbedder::new("hash", 32)).save(&dir).expect("save");

    // Half-written staging directory from a crashed run.
    let staging = tmp.path().join("idx.save_tmp");
    fs::create_dir_all(&staging).expect("mkdir");
    fs::write(staging.join(ENTRIES_FILE), b"[").expect("write");

    let loaded = VectorIndex::load(&dir).expect("old index still loads");
    assert_eq!(loaded.len(), TEXTS.len());

    // The next save cleans up the stale staging directory and replaces the index.
    let replacement = VectorIndex::build(
        vec![IndexEntry {
            chunk_id: "only".to_string(),
            text: "only entry".to_string(),
            provenance: Provenance {
                source: "x.docx".to_string(),
                path: "x.docx".to_string(),
                page: None,
                offset: 0,
            },
            vector: vec![1.0; 32],
        }],
        "hash",
    )
    .expect("build");
    replacement.save(&dir).expect("second save");
    assert!(!staging.exists());
    assert!(!tmp.path().join("idx.pre_save").exists());
    assert_eq!(VectorIndex::load(&dir).expect("load").len(), 1);
}

#[test]
fn crash_between_renames_recovers_from_pre_save_copy() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path().join("idx");
    build(&HashingEmbedder::new("hash", 32)).save(&dir).expect("save");

    fs::rename(&dir, tmp.path().join("idx.pre_save")).expect("rename");
    let loaded = VectorIndex::load(&dir).expect("recovered");
    assert_eq!(loaded.len(), TEXTS.len());
}

use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(p) = stack.pop() {
        let entries = match fs::read_dir(&p) {
            Ok(e) => e,
            Err(_) => continue,
        };
        for ent in entries.flatten() {
            let path = ent.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

#[test]
fn retrieval_core_does_not_talk_to_the_network() {
    // Chunking, indexing, retrieval and context assembly run offline; only the
    // embedding and generation adapters may issue HTTP calls.
    let src_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src");
    let core = [
        src_root.join("chunking.rs"),
        src_root.join("index"),
        src_root.join("retrieve"),
        src_root.join("context"),
        src_root.join("engines"),
        src_root.join("guardrails.rs"),
    ];

    let mut checked = 0;
    for root in core {
        let files = if root.is_dir() {
            collect_rs_files(&root)
        } else {
            vec![root]
        };
        for f in files {
            let text = fs::read_to_string(&f).unwrap_or_default();
            assert!(!text.is_empty(), "missing source {}", f.display());
            assert!(
                !text.contains("ureq::"),
                "network client used in {}",
                f.display()
            );
            checked += 1;
        }
    }
    assert!(checked >= 8);
}

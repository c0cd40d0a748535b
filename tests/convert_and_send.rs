//! End-to-end tests for the convert-then-assemble path, using `cp` as a
//! stand-in converter so no calibre installation is required.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use std::path::Path;
use tempfile::tempdir;

use kindle_courier::convert::BatchConverter;
use kindle_courier::exclude::ExclusionSet;
use kindle_courier::message::{attachments_in, OutgoingMessage};

fn touch(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn converted_tree_becomes_a_multipart_message() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("epubs");
    let out = dir.path().join("mobis");
    touch(&src.join("a.epub"), b"contents of a");
    touch(&src.join("b.epub"), b"contents of b");
    touch(&src.join("sub/a.epub"), b"excluded copy of a");

    let converter = BatchConverter::new(
        "cp",
        "epub",
        "mobi",
        ExclusionSet::new(vec!["sub".to_string()]),
    );

    // Stage 1: convert. The excluded subtree contributes nothing, so the
    // flat output directory ends up with exactly a.mobi and b.mobi.
    let plan = converter.plan(&src, &out).unwrap();
    assert_eq!(plan.jobs.len(), 2);
    let report = converter.run(plan).await;
    assert_eq!(report.converted.len(), 2);
    assert!(report.failed.is_empty());
    assert!(out.join("a.mobi").exists());
    assert!(out.join("b.mobi").exists());
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 2);

    // Stage 2: assemble. One binary part per attachment plus the text part.
    let attachments = attachments_in(&out).unwrap();
    assert_eq!(attachments.len(), 2);

    let encoded = OutgoingMessage::new(
        "sender@gmail.com",
        "reader@kindle.com",
        "Mobi Files",
        "",
        attachments,
    )
    .encode()
    .unwrap();

    let decoded = String::from_utf8(URL_SAFE.decode(&encoded.raw).unwrap()).unwrap();
    assert_eq!(decoded.matches("Content-Type: text/plain").count(), 1);
    assert_eq!(decoded.matches("Content-Disposition: attachment").count(), 2);
    assert!(decoded.contains("filename=\"a.mobi\""));
    assert!(decoded.contains("filename=\"b.mobi\""));
    assert!(decoded.contains("To: reader@kindle.com"));
    assert!(decoded.contains("Subject: Mobi Files"));
}

#[cfg(unix)]
#[tokio::test]
async fn second_run_spawns_no_conversions() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("epubs");
    let out = dir.path().join("mobis");
    touch(&src.join("a.epub"), b"a");
    touch(&src.join("b.epub"), b"b");

    let converter = BatchConverter::new("cp", "epub", "mobi", ExclusionSet::default());

    let first = converter.run(converter.plan(&src, &out).unwrap()).await;
    assert_eq!(first.converted.len(), 2);

    // Everything is already converted; the plan is empty and no process
    // would be spawned on a re-run.
    let second_plan = converter.plan(&src, &out).unwrap();
    assert!(second_plan.jobs.is_empty());
    assert_eq!(second_plan.skipped.len(), 2);

    let second = converter.run(second_plan).await;
    assert!(second.converted.is_empty());
    assert_eq!(second.skipped.len(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn partial_failure_still_attaches_successful_outputs() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("epubs");
    let out = dir.path().join("mobis");
    // With `sh` as the converter, each source runs as a script with the
    // destination as its argument: one job succeeds, one exits non-zero
    touch(&src.join("good.epub"), b"cp \"$0\" \"$1\"\n");
    touch(&src.join("broken.epub"), b"exit 1\n");

    let converter = BatchConverter::new("sh", "epub", "mobi", ExclusionSet::default());
    let plan = converter.plan(&src, &out).unwrap();
    let report = converter.run(plan).await;

    assert_eq!(report.converted.len(), 1);
    assert_eq!(report.failed.len(), 1);

    let attachments = attachments_in(&out).unwrap();
    assert_eq!(attachments.len(), 1);
    let encoded = OutgoingMessage::new("s@g.com", "r@k.com", "Subj", "", attachments)
        .encode()
        .unwrap();
    assert!(!encoded.raw.is_empty());
}

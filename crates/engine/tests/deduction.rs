//! End-to-end deduction runs against scripted probes.
//!
//! Every scenario pins the exact request sequence, which is meaningful
//! because file selection is fully deterministic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tagscan_engine::{NarrowReason, Outcome, Probe, ProbeError, ProbeReply, RunReport, VersionScanner};
use tagscan_hashdb::{FilterOptions, FingerprintDb};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy)]
enum Scripted {
    Tags(&'static [&'static str]),
    Status(u16),
    Fails,
    Unreachable,
}

struct ScriptedProbe {
    answers: HashMap<String, Scripted>,
}

impl ScriptedProbe {
    fn new(answers: &[(&str, Scripted)]) -> Arc<Self> {
        Arc::new(Self {
            answers: answers
                .iter()
                .map(|(file, a)| (file.to_string(), *a))
                .collect(),
        })
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn probe(&self, _target: &str, file: &str) -> Result<ProbeReply, ProbeError> {
        match self.answers.get(file) {
            Some(Scripted::Tags(tags)) => Ok(ProbeReply::hit(
                tags.iter().map(|t| t.to_string()).collect(),
            )),
            Some(Scripted::Status(status)) => Ok(ProbeReply::miss(*status)),
            Some(Scripted::Fails) => Err(ProbeError::Other("connection reset by peer".into())),
            Some(Scripted::Unreachable) => Err(ProbeError::Unreachable("no route to host".into())),
            None => Ok(ProbeReply::miss(404)),
        }
    }
}

fn db(value: serde_json::Value) -> Arc<FingerprintDb> {
    let filters = FilterOptions {
        prefer_files_in_root: true,
        ..FilterOptions::default()
    };
    Arc::new(FingerprintDb::from_json(value.to_string().as_bytes(), &filters).unwrap())
}

async fn scan(db: Arc<FingerprintDb>, probe: Arc<ScriptedProbe>, max_depth: usize) -> RunReport {
    let scanner = VersionScanner::new(db, probe).unwrap();
    scanner.set_request_delay(Duration::ZERO).await;
    scanner.set_max_depth(max_depth).await;

    let cancel = CancellationToken::new();
    scanner.analyze(&cancel, "http://example.local/").await
}

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

#[tokio::test]
async fn test_resolves_via_most_unique_witness() {
    let db = db(serde_json::json!({
        "license.txt": {
            "l1": ["5.6.9", "5.6.8", "5.6.7"],
            "l2": ["5.6.6", "5.6.5"],
        },
        "themes/backend/detail.js": {
            "d1": ["5.6.9"],
            "d2": ["5.6.8"],
            "d3": ["5.6.7"],
        },
    }));
    let probe = ScriptedProbe::new(&[
        ("license.txt", Scripted::Tags(&["5.6.9", "5.6.8", "5.6.7"])),
        ("themes/backend/detail.js", Scripted::Tags(&["5.6.9"])),
    ]);

    let report = scan(db, probe, 0).await;

    assert_eq!(report.outcome, Outcome::Resolved("5.6.9".into()));
    assert_eq!(report.iterations, 2);
    assert_eq!(
        report.requested,
        tags(&["license.txt", "themes/backend/detail.js"])
    );
}

#[tokio::test]
async fn test_ambiguous_set_ends_narrowed_not_resolved() {
    // robots.txt and js/app.js answer identically for all four tags;
    // css/app.css could split them but the deployment 404s it
    let db = db(serde_json::json!({
        "robots.txt": {
            "b6216d61c03e6ce0c9aea6ca7808f7ca": ["5.6.0", "5.6.7", "5.6.12", "5.6.21"],
        },
        "js/app.js": {
            "37fa6f83bcff373325438a9fdcb8b77c": ["5.6.0", "5.6.7", "5.6.12", "5.6.21"],
        },
        "css/app.css": {
            "c1": ["5.6.21"],
            "c2": ["5.6.12"],
            "c3": ["5.6.7"],
            "c4": ["5.6.0"],
        },
    }));
    let probe = ScriptedProbe::new(&[
        (
            "robots.txt",
            Scripted::Tags(&["5.6.0", "5.6.7", "5.6.12", "5.6.21"]),
        ),
        ("css/app.css", Scripted::Status(404)),
    ]);

    let report = scan(db, probe, 0).await;

    assert_eq!(
        report.outcome,
        Outcome::Narrowed {
            candidates: tags(&["5.6.21", "5.6.12", "5.6.7", "5.6.0"]),
            reason: NarrowReason::NoMoreFiles,
        }
    );
    assert_eq!(report.iterations, 2);
    // js/app.js was consumed by the skip-loop, not by a request
    assert_eq!(
        report.requested,
        tags(&["robots.txt", "css/app.css", "js/app.js"])
    );
}

#[tokio::test]
async fn test_single_hit_resolves_immediately() {
    let db = db(serde_json::json!({
        "core/MAINTAINERS.txt": {
            "24d955bc3a5d3a30d4d1e8ae603f6bd5": ["9.1.4"],
        },
    }));
    let probe = ScriptedProbe::new(&[("core/MAINTAINERS.txt", Scripted::Tags(&["9.1.4"]))]);

    let report = scan(db, probe, 0).await;

    assert_eq!(report.outcome, Outcome::Resolved("9.1.4".into()));
    assert_eq!(report.iterations, 1);
}

#[tokio::test]
async fn test_disjoint_answer_is_a_contradiction() {
    let db = db(serde_json::json!({
        "readme.html": {
            "h1": ["5.7", "5.6.2", "5.6.1"],
        },
        "js/main.js": {
            "j1": ["5.7"],
            "j2": ["5.6.2"],
            "j3": ["5.6.1"],
            "j4": ["5.4.2"],
        },
    }));
    let probe = ScriptedProbe::new(&[
        ("readme.html", Scripted::Tags(&["5.7", "5.6.2", "5.6.1"])),
        ("js/main.js", Scripted::Tags(&["5.4.2"])),
    ]);

    let report = scan(db, probe, 0).await;

    assert_eq!(
        report.outcome,
        Outcome::Contradiction {
            previous: tags(&["5.7", "5.6.2", "5.6.1"]),
            incoming: tags(&["5.4.2"]),
        }
    );
}

#[tokio::test]
async fn test_all_misses_stop_at_the_cap() {
    let mut files = serde_json::Map::new();
    for i in 0..25 {
        let mut digests = serde_json::Map::new();
        digests.insert(format!("h{i:02}"), serde_json::json!(["1.0"]));
        files.insert(format!("f{i:02}.txt"), serde_json::Value::Object(digests));
    }
    let db = db(serde_json::Value::Object(files));
    let probe = ScriptedProbe::new(&[]); // everything 404s

    let report = scan(db.clone(), probe, 0).await;

    assert_eq!(
        report.outcome,
        Outcome::TooManyNon200 { candidates: vec![] }
    );
    assert_eq!(report.iterations, 21);

    let expected: Vec<String> = (0..21)
        .map(|i| db.file_at(i).unwrap().to_string())
        .collect();
    assert_eq!(report.requested, expected);
}

#[tokio::test]
async fn test_depth_budget_returns_partial_candidates() {
    // three hits narrow four candidates down to two, a fourth useful
    // file exists but the budget is spent
    let db = db(serde_json::json!({
        "z.txt": {
            "z1": ["2.2", "2.1", "2.0", "1.9"],
            "z2": ["1.8", "1.7"],
        },
        "pa.txt": {
            "a1": ["2.2", "2.1", "2.0"],
            "a2": ["1.9"],
        },
        "pb.txt": {
            "b1": ["2.2", "2.1"],
            "b2": ["2.0"],
        },
        "pc.txt": {
            "c1": ["2.2"],
            "c2": ["2.1"],
        },
    }));
    let probe = ScriptedProbe::new(&[
        ("z.txt", Scripted::Tags(&["2.2", "2.1", "2.0", "1.9"])),
        ("pa.txt", Scripted::Tags(&["2.2", "2.1", "2.0"])),
        ("pb.txt", Scripted::Tags(&["2.2", "2.1"])),
        ("pc.txt", Scripted::Tags(&["2.2"])),
    ]);

    let report = scan(db, probe, 3).await;

    assert_eq!(
        report.outcome,
        Outcome::Narrowed {
            candidates: tags(&["2.2", "2.1"]),
            reason: NarrowReason::DepthReached,
        }
    );
    assert_eq!(report.iterations, 3);
    assert_eq!(report.requested, tags(&["z.txt", "pa.txt", "pb.txt"]));
}

#[tokio::test]
async fn test_unreachable_target_aborts() {
    let db = db(serde_json::json!({
        "readme.html": { "h1": ["1.0"] },
    }));
    let probe = ScriptedProbe::new(&[("readme.html", Scripted::Unreachable)]);

    let report = scan(db, probe, 0).await;

    assert!(matches!(report.outcome, Outcome::TargetUnreachable(_)));
    assert_eq!(report.iterations, 1);
    assert_eq!(report.requested, tags(&["readme.html"]));
}

#[tokio::test]
async fn test_probe_error_consumes_the_file_but_not_the_run() {
    // r1.txt has two digests so it sorts first; its probe fails, the
    // run falls through to r2.txt
    let db = db(serde_json::json!({
        "r1.txt": { "y1": ["3.0"], "y2": ["2.9"] },
        "r2.txt": { "x1": ["3.0", "2.9"] },
    }));
    let probe = ScriptedProbe::new(&[
        ("r1.txt", Scripted::Fails),
        ("r2.txt", Scripted::Tags(&["3.0", "2.9"])),
    ]);

    let report = scan(db, probe, 0).await;

    assert_eq!(
        report.outcome,
        Outcome::Narrowed {
            candidates: tags(&["3.0", "2.9"]),
            reason: NarrowReason::NoMoreFiles,
        }
    );
    // the failed file counts as requested and is never retried
    assert_eq!(report.requested, tags(&["r1.txt", "r2.txt"]));
    assert_eq!(report.iterations, 2);
}

#[tokio::test]
async fn test_probe_errors_do_not_count_toward_the_cap() {
    let mut files = serde_json::Map::new();
    let mut answers = Vec::new();
    for i in 0..25 {
        let mut digests = serde_json::Map::new();
        digests.insert(format!("h{i:02}"), serde_json::json!(["1.0"]));
        files.insert(format!("f{i:02}.txt"), serde_json::Value::Object(digests));
    }
    let db = db(serde_json::Value::Object(files));
    for i in 0..25 {
        answers.push((format!("f{i:02}.txt"), Scripted::Fails));
    }
    let answers: Vec<(&str, Scripted)> = answers.iter().map(|(f, a)| (f.as_str(), *a)).collect();
    let probe = ScriptedProbe::new(&answers);

    let report = scan(db, probe, 0).await;

    // 25 failed probes exceed the non-200 cap, but errors are not
    // misses: the run walks the whole list instead
    assert_eq!(
        report.outcome,
        Outcome::Narrowed {
            candidates: vec![],
            reason: NarrowReason::NoMoreFiles,
        }
    );
    assert_eq!(report.iterations, 25);
}

#[tokio::test]
async fn test_served_but_unknown_digest_is_not_a_miss() {
    let mut files = serde_json::Map::new();
    for i in 0..25 {
        let mut digests = serde_json::Map::new();
        digests.insert(format!("h{i:02}"), serde_json::json!(["1.0"]));
        files.insert(format!("f{i:02}.txt"), serde_json::Value::Object(digests));
    }
    let db = db(serde_json::Value::Object(files));

    let answers: Vec<(String, Scripted)> = (0..25)
        .map(|i| (format!("f{i:02}.txt"), Scripted::Status(200)))
        .collect();
    let answers: Vec<(&str, Scripted)> = answers.iter().map(|(f, a)| (f.as_str(), *a)).collect();
    let probe = ScriptedProbe::new(&answers);

    let report = scan(db, probe, 0).await;

    // customized bodies answer 200 with digests the database has never
    // seen; that must not trip the non-200 cap
    assert_eq!(
        report.outcome,
        Outcome::Narrowed {
            candidates: vec![],
            reason: NarrowReason::NoMoreFiles,
        }
    );
    assert_eq!(report.iterations, 25);
}

#[tokio::test]
async fn test_cancellation_before_the_first_probe() {
    let db = db(serde_json::json!({
        "readme.html": { "h1": ["1.0"] },
    }));
    let probe = ScriptedProbe::new(&[("readme.html", Scripted::Tags(&["1.0"]))]);

    let scanner = VersionScanner::new(db, probe).unwrap();
    scanner.set_request_delay(Duration::ZERO).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = scanner.analyze(&cancel, "http://example.local").await;

    assert_eq!(
        report.outcome,
        Outcome::Cancelled { candidates: vec![] }
    );
    assert_eq!(report.iterations, 0);
    assert!(report.requested.is_empty());
}

#[tokio::test]
async fn test_identical_runs_emit_identical_request_sequences() {
    let raw = serde_json::json!({
        "license.txt": {
            "l1": ["5.6.9", "5.6.8", "5.6.7"],
            "l2": ["5.6.6", "5.6.5"],
        },
        "themes/backend/detail.js": {
            "d1": ["5.6.9"],
            "d2": ["5.6.8"],
            "d3": ["5.6.7"],
        },
        "engine/services.xml": {
            "s1": ["5.6.9", "5.6.8"],
            "s2": ["5.6.7", "5.6.6", "5.6.5"],
        },
    });
    let answers = [
        ("license.txt", Scripted::Tags(&["5.6.9", "5.6.8", "5.6.7"])),
        ("themes/backend/detail.js", Scripted::Status(404)),
        ("engine/services.xml", Scripted::Tags(&["5.6.9", "5.6.8"])),
    ];

    let first = scan(db(raw.clone()), ScriptedProbe::new(&answers), 0).await;
    let second = scan(db(raw), ScriptedProbe::new(&answers), 0).await;

    assert_eq!(first.requested, second.requested);
    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.iterations, second.iterations);

    // and no file was ever charged twice
    let mut seen = first.requested.clone();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), first.requested.len());
}

//! End-to-end scans against a scripted oracle.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use semkon_core::{
    CheckRequest, Correctness, CorrectnessExplanation, ExtractionRequest, Oracle, OracleError,
    OracleResult, PropertyLocation, Proposition, ScanOptions, ScanProgress, Scanner, SemkonError,
};

const FOO_PY: &str = r#"from . import bar


def foo_func(n: int) -> int:
    """
    ::: {.theorem #foo_func}
    This function always returns a non-negative number.
    :::
    ::: {.proof}
    The square of any integer is non-negative, and
    bar.bar_func(n) is non-negative for any n.
    So the sum is non-negative.
    :::
    """
    return n**2 + bar.bar_func(n)
"#;

#[derive(Default)]
struct ScriptedOracle {
    propositions: HashMap<PathBuf, Vec<u64>>,
    verdicts: HashMap<PropertyLocation, (Correctness, Duration)>,
    failing: Option<PropertyLocation>,
    extract_calls: AtomicUsize,
    check_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    fn with_propositions(mut self, rel_path: &str, lines: &[u64]) -> Self {
        self.propositions.insert(PathBuf::from(rel_path), lines.to_vec());
        self
    }

    fn with_verdict(mut self, rel_path: &str, line: u64, c: Correctness, delay_ms: u64) -> Self {
        self.verdicts.insert(
            PropertyLocation::new(rel_path, line),
            (c, Duration::from_millis(delay_ms)),
        );
        self
    }

    fn failing_at(mut self, rel_path: &str, line: u64) -> Self {
        self.failing = Some(PropertyLocation::new(rel_path, line));
        self
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn extract(&self, request: &ExtractionRequest) -> OracleResult<Vec<Proposition>> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let lines = self
            .propositions
            .get(&request.rel_path)
            .cloned()
            .unwrap_or_default();
        Ok(lines
            .into_iter()
            .map(|line_number| Proposition {
                line_number,
                statement_text: "statement".into(),
                proof_text: "proof".into(),
            })
            .collect())
    }

    async fn check(&self, request: &CheckRequest) -> OracleResult<CorrectnessExplanation> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let (correctness, delay) = self
            .verdicts
            .get(&request.location)
            .copied()
            .unwrap_or((Correctness::Correct, Duration::from_millis(10)));
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.as_ref() == Some(&request.location) {
            return Err(OracleError::transport("connection reset"));
        }
        Ok(CorrectnessExplanation::new(
            correctness,
            format!("judged {}", request.location),
        ))
    }
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn scanner(oracle: &Arc<ScriptedOracle>, concurrency: usize) -> Scanner {
    let oracle: Arc<dyn Oracle> = oracle.clone();
    Scanner::new(
        oracle,
        ScanOptions {
            concurrency,
            ..ScanOptions::default()
        },
    )
}

#[tokio::test]
async fn files_without_proof_never_reach_the_oracle() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "README.md", "nothing to see, proofreading aside\n");
    write(dir.path(), "src/lib.rs", "pub fn f() {}\n");

    let oracle = Arc::new(ScriptedOracle::default());
    let report = scanner(&oracle, 2).run(dir.path()).await.unwrap();

    assert!(report.is_empty());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(oracle.extract_calls.load(Ordering::SeqCst), 0);
    assert_eq!(oracle.check_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn verdicts_pair_with_locations_regardless_of_completion_order() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.md", "Proof: left as an exercise.\n");
    write(dir.path(), "b.md", "Proof: obvious.\n");

    let oracle = Arc::new(
        ScriptedOracle::default()
            .with_propositions("a.md", &[1, 7])
            .with_propositions("b.md", &[3])
            .with_verdict("a.md", 1, Correctness::Correct, 300)
            .with_verdict("a.md", 7, Correctness::Incorrect, 200)
            .with_verdict("b.md", 3, Correctness::Unknown, 100),
    );
    let report = scanner(&oracle, 3).run(dir.path()).await.unwrap();

    let got: Vec<(String, Correctness, String)> = report
        .results
        .iter()
        .map(|r| {
            (
                r.property_location.to_string(),
                r.correctness_explanation.correctness,
                r.correctness_explanation.explanation.clone(),
            )
        })
        .collect();
    assert_eq!(
        got,
        vec![
            ("a.md:1".into(), Correctness::Correct, "judged a.md:1".into()),
            ("a.md:7".into(), Correctness::Incorrect, "judged a.md:7".into()),
            ("b.md:3".into(), Correctness::Unknown, "judged b.md:3".into()),
        ]
    );
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test(start_paused = true)]
async fn check_pool_never_exceeds_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "notes.md", "proof\n");

    let oracle = Arc::new(ScriptedOracle::default().with_propositions("notes.md", &[1, 2, 3, 4, 5]));
    let report = scanner(&oracle, 2).run(dir.path()).await.unwrap();

    assert_eq!(report.len(), 5);
    assert_eq!(oracle.check_calls.load(Ordering::SeqCst), 5);
    assert_eq!(oracle.max_in_flight.load(Ordering::SeqCst), 2);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test(start_paused = true)]
async fn oracle_failure_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "notes.md", "proof\n");

    let oracle = Arc::new(
        ScriptedOracle::default()
            .with_propositions("notes.md", &[1, 2])
            .failing_at("notes.md", 2),
    );
    let err = scanner(&oracle, 1).run(dir.path()).await.unwrap_err();

    match err {
        SemkonError::Oracle { location, source } => {
            assert_eq!(location, "notes.md:2");
            assert_eq!(source.kind, semkon_core::OracleErrorKind::Transport);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn filter_paths_and_topic_filter_shape_extraction() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "docs/theory.md", "Proof by induction.\n");
    write(dir.path(), "vendor/lib.md", "Proof by intimidation.\n");

    let oracle = Arc::new(ScriptedOracle::default().with_propositions("docs/theory.md", &[1]));
    let oracle_dyn: Arc<dyn Oracle> = oracle.clone();
    let scanner = Scanner::new(
        oracle_dyn,
        ScanOptions {
            filter_paths: vec!["vendor/".into()],
            topic_filter: Some("only induction proofs".into()),
            concurrency: 2,
        },
    );
    let report = scanner.run(dir.path()).await.unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(oracle.extract_calls.load(Ordering::SeqCst), 1);
    let prompts = oracle.prompts.lock().unwrap();
    assert!(prompts[0].contains("only induction proofs"));
    assert!(prompts[0].contains("docs/theory.md"));
    assert!(!prompts[0].contains("intimidation"));
}

#[derive(Default)]
struct Counting {
    files: AtomicUsize,
    scanned: AtomicUsize,
    finished_checks: AtomicUsize,
}

impl ScanProgress for Counting {
    fn files_discovered(&self, count: usize) {
        self.files.store(count, Ordering::SeqCst);
    }

    fn file_scanned(&self, _rel_path: &Path, _found: usize) {
        self.scanned.fetch_add(1, Ordering::SeqCst);
    }

    fn check_finished(&self, _location: &PropertyLocation, _verdict: &CorrectnessExplanation) {
        self.finished_checks.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn theorem_fixture_reports_one_location() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "foo.py", FOO_PY);
    write(dir.path(), "bar.py", "def bar_func(n):\n    return abs(n)\n");
    write(dir.path(), ".gitignore", "*.pyc\n");
    write(dir.path(), "foo.pyc", "proof\n");

    let oracle = Arc::new(
        ScriptedOracle::default()
            .with_propositions("foo.py", &[6])
            .with_verdict("foo.py", 6, Correctness::Correct, 50),
    );
    let progress = Arc::new(Counting::default());
    let report = scanner(&oracle, 2)
        .with_progress(progress.clone())
        .run(dir.path())
        .await
        .unwrap();

    assert_eq!(progress.files.load(Ordering::SeqCst), 3);
    assert_eq!(progress.scanned.load(Ordering::SeqCst), 3);
    assert_eq!(progress.finished_checks.load(Ordering::SeqCst), 1);
    assert_eq!(oracle.extract_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.exit_code(), 0);

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(
        value,
        serde_json::json!([{
            "property_location": {"rel_path": "foo.py", "line_num": 6},
            "correctness_explanation": {"correctness": "correct", "explanation": "judged foo.py:6"}
        }])
    );
}

/// Judges proofs by following "Proof: by <name>" references inside the file,
/// applying the circular-justification rule only when the prompt asks for it.
struct CitationOracle;

impl CitationOracle {
    fn citations(content: &str) -> HashMap<String, (u64, Option<String>)> {
        let lines = content.lines().collect::<Vec<_>>();
        let mut theorems = HashMap::new();
        for (i, line) in lines.iter().enumerate() {
            if let Some(name) = line.strip_prefix("Theorem ") {
                let name = name.trim_end_matches('.').to_string();
                let cites = lines
                    .get(i + 1)
                    .and_then(|next| next.strip_prefix("Proof: by "))
                    .map(|n| n.trim_end_matches('.').to_string());
                theorems.insert(name, (i as u64 + 1, cites));
            }
        }
        theorems
    }
}

#[async_trait]
impl Oracle for CitationOracle {
    fn name(&self) -> &str {
        "citation"
    }

    async fn extract(&self, request: &ExtractionRequest) -> OracleResult<Vec<Proposition>> {
        let source = request
            .prompt
            .lines()
            .filter_map(|l| l.split_once(" | ").map(|(_, rest)| rest))
            .collect::<Vec<_>>()
            .join("\n");
        let mut found = Self::citations(&source)
            .into_values()
            .map(|(line_number, _)| Proposition {
                line_number,
                statement_text: String::new(),
                proof_text: String::new(),
            })
            .collect::<Vec<_>>();
        found.sort_by_key(|p| p.line_number);
        Ok(found)
    }

    async fn check(&self, request: &CheckRequest) -> OracleResult<CorrectnessExplanation> {
        let content =
            fs::read_to_string(request.root.join(&request.location.relative_path)).unwrap();
        let theorems = Self::citations(&content);
        let start = theorems
            .iter()
            .find(|(_, (line, _))| *line == request.location.line_number)
            .map(|(name, _)| name.clone())
            .unwrap();

        let mut seen = vec![start.clone()];
        let mut current = start.clone();
        while let Some((_, Some(next))) = theorems.get(&current) {
            if *next == start && request.prompt.contains("cycle of dependencies") {
                return Ok(CorrectnessExplanation::new(
                    Correctness::Incorrect,
                    format!("{start} depends on itself through {}", seen.join(" -> ")),
                ));
            }
            if seen.contains(next) {
                break;
            }
            seen.push(next.clone());
            current = next.clone();
        }
        Ok(CorrectnessExplanation::new(Correctness::Correct, "no circular citation"))
    }
}

#[tokio::test]
async fn mutually_dependent_proofs_are_both_incorrect() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "theory.md",
        "Theorem A.\nProof: by B.\n\nTheorem B.\nProof: by A.\n\nTheorem C.\nProof: by A.\n",
    );

    let oracle: Arc<dyn Oracle> = Arc::new(CitationOracle);
    let report = Scanner::new(oracle, ScanOptions::default())
        .run(dir.path())
        .await
        .unwrap();

    let verdicts = report
        .results
        .iter()
        .map(|r| {
            (
                r.property_location.line_number,
                r.correctness_explanation.correctness,
            )
        })
        .collect::<Vec<_>>();
    assert_eq!(
        verdicts,
        vec![
            (1, Correctness::Incorrect),
            (4, Correctness::Incorrect),
            (7, Correctness::Correct),
        ]
    );
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn repeated_filtering_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    for rel in ["b/2.txt", "a/1.txt", "c.txt", "a/z/3.txt"] {
        write(dir.path(), rel, "x\n");
    }

    let first = semkon_core::eligible_files::<&str>(dir.path(), &[]).unwrap();
    let second = semkon_core::eligible_files::<&str>(dir.path(), &[]).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

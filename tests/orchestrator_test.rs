//! Integration tests for the run driver
//!
//! Materialization and command execution are replaced by fakes; everything
//! between them (filtering, scheduling, parameter derivation and the state
//! machine) is the real code.

mod common;

use std::cell::Cell;

use builddeps::config::RunOptions;
use builddeps::core::bookkeeping::RetrievalSummary;
use builddeps::core::orchestrator::{Bookkeeper, Orchestrator, RunState, SourceMaterializer};
use builddeps::core::platform::PlatformFamily;
use builddeps::error::{BookkeepingError, BuildError, ConfigurationError, OrchestratorError, Stage};
use builddeps::registry::{LibraryId, Registry};
use common::{FakeMaterializer, ScriptedRunner, TestWorkspace, CHAIN_REGISTRY};

fn ids(list: &[LibraryId]) -> Vec<&str> {
    list.iter().map(LibraryId::as_str).collect()
}

/// Counts calls and optionally fails them
#[derive(Default)]
struct CountingBookkeeper {
    calls: Cell<usize>,
    fail: bool,
}

impl Bookkeeper for CountingBookkeeper {
    fn record(&self, _summary: &RetrievalSummary) -> Result<(), BookkeepingError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            Err(BookkeepingError::Git {
                command: "git commit".to_string(),
                error: "exit code 1".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[tokio::test]
async fn test_dependency_is_retrieved_and_built_first() {
    let ws = TestWorkspace::new();
    let registry = Registry::from_toml(CHAIN_REGISTRY).unwrap();
    let config = ws.linux_config(RunOptions::default());
    let materializer = FakeMaterializer::new(&config.layout.parent_src_dir);
    let runner = ScriptedRunner::default();

    let mut orchestrator = Orchestrator::new(&registry, &config, &materializer, &runner);
    orchestrator.run().await.unwrap();
    let report = orchestrator.into_report();

    assert_eq!(ids(&report.build_order), vec!["x", "y"]);
    assert_eq!(*materializer.calls.borrow(), vec!["x", "y"]);
    assert_eq!(runner.lines(), vec!["echo build x", "echo build y"]);
    assert_eq!(ids(&report.built), vec!["x", "y"]);
    assert_eq!(report.state, RunState::Done);
}

#[tokio::test]
async fn test_cycle_fails_before_any_io() {
    let ws = TestWorkspace::new();
    let registry = Registry::from_toml(
        r#"
[[library]]
name = "x"
archive = "https://example.com/x.zip"
dependencies = ["y"]

[[library]]
name = "y"
archive = "https://example.com/y.zip"
dependencies = ["x"]
"#,
    )
    .unwrap();
    let config = ws.linux_config(RunOptions::default());
    let materializer = FakeMaterializer::new(&config.layout.parent_src_dir);
    let runner = ScriptedRunner::default();

    let mut orchestrator = Orchestrator::new(&registry, &config, &materializer, &runner);
    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::Configuration(ConfigurationError::CycleDetected { ordered: 0, .. })
    ));
    assert_eq!(err.stage(), Stage::Resolving);
    assert!(materializer.calls.borrow().is_empty());
    assert!(runner.calls.borrow().is_empty());

    let report = orchestrator.into_report();
    assert!(report.build_order.is_empty());
    assert!(matches!(
        report.state,
        RunState::Failed {
            stage: Stage::Resolving,
            ..
        }
    ));
}

#[tokio::test]
async fn test_build_only_skips_materialization() {
    let ws = TestWorkspace::new();
    let registry = Registry::from_toml(CHAIN_REGISTRY).unwrap();
    let config = ws.linux_config(RunOptions {
        build_only: true,
        ..RunOptions::default()
    });
    let materializer = FakeMaterializer::new(&config.layout.parent_src_dir);
    let runner = ScriptedRunner::default();
    let bookkeeper = CountingBookkeeper::default();

    let mut orchestrator = Orchestrator::new(&registry, &config, &materializer, &runner)
        .with_bookkeeper(&bookkeeper);
    orchestrator.run().await.unwrap();

    assert!(materializer.calls.borrow().is_empty());
    assert_eq!(bookkeeper.calls.get(), 0);
    assert_eq!(runner.lines().len(), 2);
    // sources were never created; the build runs against the absent tree
    assert!(!ws.file_exists("src/tp/x"));
}

#[tokio::test]
async fn test_failing_command_stops_library_and_run() {
    let ws = TestWorkspace::new();
    let registry = Registry::from_toml(
        r#"
[[library]]
name = "z"
archive = "https://example.com/z.zip"

[library.build]
unix = ["echo one", "false two", "echo three"]

[[library]]
name = "after"
archive = "https://example.com/after.zip"
dependencies = ["z"]

[library.build]
unix = ["echo after"]
"#,
    )
    .unwrap();
    let config = ws.linux_config(RunOptions {
        build_only: true,
        ..RunOptions::default()
    });
    let materializer = FakeMaterializer::new(&config.layout.parent_src_dir);
    let runner = ScriptedRunner::default();

    let mut orchestrator = Orchestrator::new(&registry, &config, &materializer, &runner);
    let err = orchestrator.run().await.unwrap_err();

    match &err {
        OrchestratorError::BuildCommand(BuildError::CommandFailed { library, index, .. }) => {
            assert_eq!(library, "z");
            assert_eq!(*index, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(runner.lines(), vec!["echo one", "false two"]);

    let report = orchestrator.into_report();
    assert!(report.built.is_empty());
    let failure = report.failure.unwrap();
    assert_eq!(failure.stage, Stage::Building);
    assert_eq!(failure.library.as_deref(), Some("z"));
}

#[tokio::test]
async fn test_retrieval_failure_aborts_remaining_libraries() {
    let ws = TestWorkspace::new();
    let registry = Registry::from_toml(CHAIN_REGISTRY).unwrap();
    let config = ws.linux_config(RunOptions::default());
    let materializer = FakeMaterializer::new(&config.layout.parent_src_dir).failing_on("x");
    let runner = ScriptedRunner::default();

    let mut orchestrator = Orchestrator::new(&registry, &config, &materializer, &runner);
    let err = orchestrator.run().await.unwrap_err();

    assert_eq!(err.stage(), Stage::Materializing);
    assert_eq!(err.library(), Some("x"));
    assert_eq!(*materializer.calls.borrow(), vec!["x"]);
    assert!(runner.calls.borrow().is_empty());
}

#[tokio::test]
async fn test_second_materialization_is_not_new() {
    let ws = TestWorkspace::new();
    let registry = Registry::from_toml(CHAIN_REGISTRY).unwrap();
    let materializer = FakeMaterializer::new(&ws.path().join("src/tp"));
    let record = registry.get(&LibraryId::new("x")).unwrap();

    let first = materializer.materialize(record).await.unwrap();
    let second = materializer.materialize(record).await.unwrap();
    assert!(first.newly_acquired);
    assert!(!second.newly_acquired);
    assert_eq!(first.local_path, second.local_path);
}

#[tokio::test]
async fn test_get_only_records_and_survives_bookkeeping_failure() {
    let ws = TestWorkspace::new();
    let registry = Registry::from_toml(CHAIN_REGISTRY).unwrap();
    let config = ws.linux_config(RunOptions {
        get_only: true,
        ..RunOptions::default()
    });
    let materializer = FakeMaterializer::new(&config.layout.parent_src_dir);
    let runner = ScriptedRunner::default();
    let bookkeeper = CountingBookkeeper {
        fail: true,
        ..CountingBookkeeper::default()
    };

    let mut orchestrator = Orchestrator::new(&registry, &config, &materializer, &runner)
        .with_bookkeeper(&bookkeeper);
    orchestrator.run().await.unwrap();
    let report = orchestrator.into_report();

    assert_eq!(bookkeeper.calls.get(), 1);
    assert!(report.bookkeeping_error.is_some());
    assert_eq!(report.retrieved.len(), 2);
    assert!(runner.calls.borrow().is_empty());
    assert!(ws.file_exists("src/tp/x"));
    assert_eq!(report.state, RunState::Done);
}

#[tokio::test]
async fn test_windows_override_and_platform_filter() {
    let ws = TestWorkspace::new();
    let registry = Registry::from_toml(
        r#"
[[library]]
name = "consumer"
archive = "https://example.com/consumer.zip"
dependencies = ["unixonly"]
windows_dependencies = []

[library.build]
windows = ["echo consumer"]

[[library]]
name = "unixonly"
archive = "https://example.com/unixonly.zip"
platform = "unix"
"#,
    )
    .unwrap();
    let config = ws.config(
        RunOptions {
            build_only: true,
            ..RunOptions::default()
        },
        PlatformFamily::Windows,
    );
    let materializer = FakeMaterializer::new(&config.layout.parent_src_dir);
    let runner = ScriptedRunner::default();

    let mut orchestrator = Orchestrator::new(&registry, &config, &materializer, &runner);
    orchestrator.run().await.unwrap();
    let report = orchestrator.into_report();

    assert_eq!(ids(&report.build_order), vec!["consumer"]);
    let calls = runner.calls.borrow();
    assert_eq!(calls[0].program, "cmd");
    assert_eq!(calls[0].args, vec!["/C", "echo consumer"]);
}

#[tokio::test]
async fn test_unknown_dependency_does_not_block_scheduling() {
    let ws = TestWorkspace::new();
    let registry = Registry::from_toml(
        r#"
[[library]]
name = "a"
archive = "https://example.com/a.zip"
dependencies = ["ghost"]

[library.build]
unix = ["echo a"]

[[library]]
name = "b"
archive = "https://example.com/b.zip"
dependencies = ["a"]

[library.build]
unix = ["echo b"]
"#,
    )
    .unwrap();
    let config = ws.linux_config(RunOptions {
        build_only: true,
        ..RunOptions::default()
    });
    let materializer = FakeMaterializer::new(&config.layout.parent_src_dir);
    let runner = ScriptedRunner::default();

    let mut orchestrator = Orchestrator::new(&registry, &config, &materializer, &runner);
    orchestrator.run().await.unwrap();
    assert_eq!(ids(&orchestrator.report().build_order), vec!["a", "b"]);
}

#[tokio::test]
async fn test_get_all_retrieves_every_library_but_builds_filtered_set() {
    let ws = TestWorkspace::new();
    let registry = Registry::from_toml(
        r#"
[[library]]
name = "winonly"
archive = "https://example.com/w.zip"
platform = "windows"

[library.build]
windows = ["echo w"]

[[library]]
name = "common"
archive = "https://example.com/c.zip"

[library.build]
unix = ["echo c"]
"#,
    )
    .unwrap();
    let config = ws.linux_config(RunOptions {
        get_all: true,
        ..RunOptions::default()
    });
    let materializer = FakeMaterializer::new(&config.layout.parent_src_dir);
    let runner = ScriptedRunner::default();

    let mut orchestrator = Orchestrator::new(&registry, &config, &materializer, &runner);
    orchestrator.run().await.unwrap();

    assert_eq!(*materializer.calls.borrow(), vec!["winonly", "common"]);
    assert_eq!(runner.lines(), vec!["echo c"]);
}

#[tokio::test]
async fn test_placeholders_resolve_to_layout_paths() {
    let ws = TestWorkspace::new();
    let registry = Registry::from_toml(
        r#"
[[library]]
name = "p"
archive = "https://example.com/p.zip"

[library.build]
unix = ["configure --prefix={install_dir} {unknown_flag}", "make -j {jobs}"]
"#,
    )
    .unwrap();
    let config = ws.linux_config(RunOptions {
        build_only: true,
        jobs: Some(3),
        ..RunOptions::default()
    });
    let materializer = FakeMaterializer::new(&config.layout.parent_src_dir);
    let runner = ScriptedRunner::default();

    let mut orchestrator = Orchestrator::new(&registry, &config, &materializer, &runner);
    orchestrator.run().await.unwrap();

    let install = ws.path().join("src/tp/install/p");
    assert_eq!(
        runner.lines(),
        vec![
            format!("configure --prefix={} {{unknown_flag}}", install.display()),
            "make -j 3".to_string(),
        ]
    );
    assert_eq!(runner.calls.borrow()[0].cwd, ws.path().join("src/tp/p"));
}

// tests/error_handling.rs

use std::io::Write;

use tempfile::NamedTempFile;

use buildweave::config::load_and_validate;
use buildweave::dag::{TaskGraphBuilder, TaskNode, CLEAN_TASK_ID};
use buildweave::errors::BuildError;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

const TOOLCHAIN: &str = r#"
[toolchain.rust]
capability = "compile"
program = "cargo"
"#;

#[test]
fn test_unknown_after_returns_config_error() {
    let file = config_file(&format!(
        r#"{TOOLCHAIN}
[task.A]
toolchain = "rust"
after = ["NonExistent"]
"#
    ));

    match load_and_validate(file.path()) {
        Err(BuildError::Config(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("NonExistent"));
        }
        Err(e) => panic!("Expected Config error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_toolchain_returns_config_error() {
    let file = config_file(
        r#"
[task.A]
toolchain = "zig"
"#,
    );

    match load_and_validate(file.path()) {
        Err(BuildError::Config(msg)) => assert!(msg.contains("unknown toolchain 'zig'")),
        other => panic!("Expected Config error, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_reserved_clean_id_is_rejected() {
    let file = config_file(&format!(
        r#"{TOOLCHAIN}
[task.{CLEAN_TASK_ID}]
toolchain = "rust"
"#
    ));

    match load_and_validate(file.path()) {
        Err(BuildError::Config(msg)) => assert!(msg.contains("reserved")),
        other => panic!("Expected Config error, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_uses_must_match_a_dependency() {
    let file = config_file(&format!(
        r#"{TOOLCHAIN}
[[repository]]
name = "local"
path = "repo"

[[dependency]]
name = "sdl2"
version = "2.0.20"

[task.native]
toolchain = "rust"
uses = ["sdl2@3.0.0"]
"#
    ));

    match load_and_validate(file.path()) {
        Err(BuildError::Config(msg)) => assert!(msg.contains("sdl2@3.0.0")),
        other => panic!("Expected Config error, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_dependency_with_unknown_repository_is_rejected() {
    let file = config_file(&format!(
        r#"{TOOLCHAIN}
[[dependency]]
name = "sdl2"
version = "2.0.20"
repositories = ["nowhere"]

[task.native]
toolchain = "rust"
"#
    ));

    match load_and_validate(file.path()) {
        Err(BuildError::Config(msg)) => assert!(msg.contains("unknown repository 'nowhere'")),
        other => panic!("Expected Config error, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_zero_jobs_and_bad_exclude_are_rejected() {
    let file = config_file(&format!(
        r#"{TOOLCHAIN}
[config]
jobs = 0

[task.native]
toolchain = "rust"
"#
    ));
    assert!(matches!(
        load_and_validate(file.path()),
        Err(BuildError::Config(msg)) if msg.contains("jobs")
    ));

    let file = config_file(&format!(
        r#"{TOOLCHAIN}
[task.native]
toolchain = "rust"
inputs = ["src"]
exclude = ["[unclosed"]
"#
    ));
    assert!(matches!(
        load_and_validate(file.path()),
        Err(BuildError::Config(msg)) if msg.contains("exclude")
    ));
}

#[test]
fn test_output_outside_project_is_rejected() {
    let file = config_file(&format!(
        r#"{TOOLCHAIN}
[task.native]
toolchain = "rust"
outputs = ["../elsewhere/lib.so"]
"#
    ));
    assert!(matches!(
        load_and_validate(file.path()),
        Err(BuildError::Config(msg)) if msg.contains("inside the project")
    ));
}

#[test]
fn test_invalid_toml_is_a_parse_error() {
    let file = config_file("[task.A\ntoolchain = ");
    assert!(matches!(load_and_validate(file.path()), Err(BuildError::TomlDe(_))));
}

#[test]
fn test_defaults_and_root_are_applied() {
    let file = config_file(&format!(
        r#"{TOOLCHAIN}
[task.native]
toolchain = "rust"
inputs = ["native/src"]
outputs = ["native/target/libmain.so"]
"#
    ));

    let cfg = load_and_validate(file.path()).unwrap();
    let parent = file.path().parent().unwrap();
    assert_eq!(cfg.root(), parent);
    assert!(!cfg.config.fail_fast);
    assert_eq!(cfg.config.jobs, None);
    assert_eq!(cfg.state_dir(), parent.join(".buildweave"));
    assert_eq!(cfg.lockfile_path(), parent.join("Buildweave.lock"));
}

#[test]
fn test_ambiguous_output_names_both_producers() {
    let mut builder = TaskGraphBuilder::new();
    builder
        .add_task(TaskNode::new("b", "tc").output("out/lib.so"))
        .add_task(TaskNode::new("a", "tc").output("./out/lib.so"));

    match builder.build() {
        Err(BuildError::AmbiguousOutput { output, producers }) => {
            assert_eq!(output.replace('\\', "/"), "out/lib.so");
            assert_eq!(producers, vec!["a", "b"]);
        }
        other => panic!("Expected AmbiguousOutput, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_cycle_names_every_task_in_it() {
    let mut builder = TaskGraphBuilder::new();
    builder
        .add_task(TaskNode::new("a", "tc").input("out/b").output("out/a"))
        .add_task(TaskNode::new("b", "tc").input("out/a").output("out/b"))
        .add_task(TaskNode::new("c", "tc").input("out/a").output("out/c"));

    match builder.build() {
        Err(BuildError::CyclicDependency { mut cycle }) => {
            cycle.sort();
            assert_eq!(cycle, vec!["a", "b"]);
        }
        other => panic!("Expected CyclicDependency, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_self_loop_is_a_cycle() {
    let mut builder = TaskGraphBuilder::new();
    builder.add_task(
        TaskNode::new("gen", "tc")
            .input("out/gen")
            .output("out/gen/file.rs"),
    );

    match builder.build() {
        Err(BuildError::CyclicDependency { cycle }) => assert_eq!(cycle, vec!["gen"]),
        other => panic!("Expected CyclicDependency, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_duplicate_task_id_is_a_config_error() {
    let mut builder = TaskGraphBuilder::new();
    builder
        .add_task(TaskNode::new("a", "tc"))
        .add_task(TaskNode::new("a", "tc"));
    assert!(matches!(builder.build(), Err(BuildError::Config(_))));

    let mut builder = TaskGraphBuilder::new();
    builder.add_task(TaskNode::new(CLEAN_TASK_ID, "tc"));
    assert!(matches!(
        builder.with_clean_node().build(),
        Err(BuildError::Config(_))
    ));
}

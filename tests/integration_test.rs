// tests/integration_test.rs
mod common;

use assert_cmd::Command;
use bem_pipeline::cli::Pipeline;
use bem_pipeline::domain::BumpKind;
use bem_pipeline::git::{Git2Repository, VersionControl};
use chrono::NaiveDate;
use git2::Repository;
use predicates::prelude::*;
use tempfile::TempDir;

use common::{config, project, read, write, CopyCompiler, ExistsRunner};

fn bem_pipeline() -> Command {
    Command::cargo_bin("bem-pipeline").unwrap()
}

fn init_repo(dir: &TempDir) -> Repository {
    let repo = Repository::init(dir.path()).unwrap();
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Release Bot").unwrap();
    config.set_str("user.email", "release@example.com").unwrap();
    repo
}

#[test]
fn test_bem_pipeline_help() {
    bem_pipeline()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bem-pipeline"))
        .stdout(predicate::str::contains("Test, build and release"));
}

#[test]
fn test_unknown_bump_kind_is_rejected() {
    bem_pipeline()
        .args(["release", "--versionBump", "huge"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("huge"));
}

#[test]
fn test_list_shows_tasks() {
    let dir = project();
    bem_pipeline()
        .arg("-C")
        .arg(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("sass → assertions"))
        .stdout(predicate::str::contains("release"));
}

#[test]
fn test_missing_manifest_fails() {
    let dir = TempDir::new().unwrap();
    bem_pipeline()
        .arg("-C")
        .arg(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR:"))
        .stderr(predicate::str::contains("package.json"));
}

#[cfg(unix)]
#[test]
fn test_build_with_external_tools() {
    let dir = project();
    write(
        dir.path(),
        "bem-pipeline.toml",
        &format!(
            "{}\n[sass]\nprogram = \"true\"\n\n[assertions]\nprogram = \"true\"\n",
            common::CONFIG
        ),
    );

    bem_pipeline()
        .arg("-C")
        .arg(dir.path())
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("_bem-constructor.scss"));

    let output = read(dir.path(), "dist/_bem-constructor.scss");
    assert!(output.starts_with("/*! bem-constructor - version: 1.0.0 - "));
    assert!(output.contains("@mixin element"));
}

#[cfg(unix)]
#[test]
fn test_failing_compiler_exits_non_zero() {
    let dir = project();
    write(
        dir.path(),
        "bem-pipeline.toml",
        &format!("{}\n[sass]\nprogram = \"false\"\n", common::CONFIG),
    );

    bem_pipeline()
        .arg("-C")
        .arg(dir.path())
        .arg("build")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("sass"));

    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_release_dry_run_changes_nothing() {
    let dir = project();
    init_repo(&dir);

    bem_pipeline()
        .arg("-C")
        .arg(dir.path())
        .args(["release", "--version-bump", "patch", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0.1"))
        .stdout(predicate::str::contains("v1.0.1"));

    assert!(read(dir.path(), "package.json").contains("\"version\": \"1.0.0\""));
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_release_commits_tags_and_pushes_to_remote() {
    let dir = project();
    let repo = init_repo(&dir);
    let remote_dir = TempDir::new().unwrap();
    Repository::init_bare(remote_dir.path()).unwrap();
    repo.remote("origin", remote_dir.path().to_str().unwrap())
        .unwrap();

    let mut vcs = Git2Repository::from_git2(repo);
    let root = dir.path().to_path_buf();
    vcs.commit(
        &[
            root.join("package.json").as_path(),
            root.join("bower.json").as_path(),
        ],
        "Initial commit",
    )
    .unwrap();
    let branch = vcs.current_branch().unwrap();

    let pipeline = Pipeline::new(dir.path(), config());
    let record = pipeline
        .release_with(
            BumpKind::Minor,
            &mut CopyCompiler::default(),
            &mut ExistsRunner::default(),
            &mut vcs,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
        .unwrap();
    assert!(record.pushed);

    let local = Repository::open(dir.path()).unwrap();
    let head = local.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.message().map(str::trim), Some("Release v1.1.0"));
    assert_eq!(head.parent_count(), 1);
    let tree = head.tree().unwrap();
    assert!(tree.get_path(std::path::Path::new("dist/_bem-constructor.scss")).is_ok());

    let tag = local
        .find_reference("refs/tags/v1.1.0")
        .unwrap()
        .peel_to_tag()
        .unwrap();
    assert_eq!(tag.message().map(str::trim), Some("Version 1.1.0"));
    assert_eq!(tag.target_id(), head.id());

    let remote = Repository::open_bare(remote_dir.path()).unwrap();
    let pushed_head = remote
        .find_reference(&format!("refs/heads/{}", branch))
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(pushed_head.id(), head.id());
    assert!(remote.find_reference("refs/tags/v1.1.0").is_ok());
}

#[test]
fn test_release_commit_leaves_other_staged_changes_out() {
    let dir = project();
    let repo = init_repo(&dir);
    let root = dir.path().to_path_buf();
    let mut vcs = Git2Repository::from_git2(repo);
    vcs.commit(&[root.join("bower.json").as_path()], "Initial commit")
        .unwrap();

    write(dir.path(), "notes.txt", "work in progress\n");
    let local = Repository::open(dir.path()).unwrap();
    let mut index = local.index().unwrap();
    index.add_path(std::path::Path::new("notes.txt")).unwrap();
    index.write().unwrap();

    write(
        dir.path(),
        "bower.json",
        "{\n  \"name\": \"bem-constructor\",\n  \"version\": \"1.1.0\"\n}\n",
    );
    let mut vcs = Git2Repository::open(dir.path()).unwrap();
    vcs.commit(&[root.join("bower.json").as_path()], "Release v1.1.0")
        .unwrap();

    let local = Repository::open(dir.path()).unwrap();
    let head = local.head().unwrap().peel_to_commit().unwrap();
    let tree = head.tree().unwrap();
    assert!(tree.get_path(std::path::Path::new("bower.json")).is_ok());
    assert!(tree.get_path(std::path::Path::new("notes.txt")).is_err());

    let status = local.status_file(std::path::Path::new("notes.txt")).unwrap();
    assert!(status.contains(git2::Status::INDEX_NEW));
    let bower = local.status_file(std::path::Path::new("bower.json")).unwrap();
    assert!(bower.is_empty());
}

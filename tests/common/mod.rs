#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use bem_pipeline::config::{parse_config, Config};
use bem_pipeline::error::{PipelineError, Result};
use bem_pipeline::tools::{AssertionRunner, Compiler};
use tempfile::TempDir;

pub const CONFIG: &str = r#"
[concat]
sources = ["stylesheets/_defaults.scss", "stylesheets/_block.scss", "stylesheets/_element.scss"]

[version]
targets = ["bower.json", "{dist}/_{name}.scss"]
"#;

pub fn write(root: &Path, name: &str, content: &str) -> PathBuf {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

pub fn read(root: &Path, name: &str) -> String {
    fs::read_to_string(root.join(name)).unwrap()
}

/// A small stylesheet library at version 1.0.0
pub fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "package.json",
        "{\n  \"name\": \"bem-constructor\",\n  \"version\": \"1.0.0\",\n  \"main\": \"dist/_bem-constructor.scss\"\n}\n",
    );
    write(root, "bower.json", "{\n  \"name\": \"bem-constructor\",\n  \"version\": \"1.0.0\"\n}\n");
    write(root, "stylesheets/_defaults.scss", "$bem-block-prefix: 'b-' !default;\n");
    write(root, "stylesheets/_block.scss", "@mixin block($name) { .#{$name} { @content; } }\n");
    write(root, "stylesheets/_element.scss", "@mixin element($name) { &__#{$name} { @content; } }\n");
    write(root, "test/tests.scss", "@import 'bootcamp';\n");
    write(root, "bem-pipeline.toml", CONFIG);
    dir
}

pub fn config() -> Config {
    parse_config(CONFIG).unwrap()
}

/// Stands in for the SCSS compiler by copying the input
#[derive(Default)]
pub struct CopyCompiler {
    pub runs: usize,
}

impl Compiler for CopyCompiler {
    fn compile(&mut self, input: &Path, output: &Path, _load_paths: &[PathBuf]) -> Result<()> {
        self.runs += 1;
        fs::create_dir_all(output.parent().unwrap())?;
        fs::copy(input, output)?;
        Ok(())
    }
}

pub struct BrokenCompiler;

impl Compiler for BrokenCompiler {
    fn compile(&mut self, _input: &Path, _output: &Path, _load_paths: &[PathBuf]) -> Result<()> {
        Err(PipelineError::ExternalTool {
            tool: "sass".to_string(),
            code: Some(65),
            stdout: String::new(),
            stderr: "Error: Undefined mixin.".to_string(),
        })
    }
}

/// Passes when the compiled stylesheet exists
#[derive(Default)]
pub struct ExistsRunner {
    pub runs: usize,
}

impl AssertionRunner for ExistsRunner {
    fn run(&mut self, css: &Path) -> Result<()> {
        self.runs += 1;
        if css.exists() {
            Ok(())
        } else {
            Err(PipelineError::tool("bootcamp", "no compiled stylesheet"))
        }
    }
}

pub struct FailingRunner;

impl AssertionRunner for FailingRunner {
    fn run(&mut self, _css: &Path) -> Result<()> {
        Err(PipelineError::ExternalTool {
            tool: "bootcamp".to_string(),
            code: Some(1),
            stdout: "Ran 3 tests. 1 failed.".to_string(),
            stderr: String::new(),
        })
    }
}

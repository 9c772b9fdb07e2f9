use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli() -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("texproj")?;
    cmd.env_remove("TEXPROJ_ENGINE_DIR");
    Ok(cmd)
}

fn run(args: &[&str]) -> Result<(), Box<dyn Error>> {
    cli()?.args(args).assert().success();
    Ok(())
}

fn s(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// 建立專案、加入內容並匯出。 / Builds a project through the CLI and exports it.
#[test]
fn build_and_export_project() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let project = dir.path().join("site.texproj");
    let export = dir.path().join("export");
    let engine = dir.path().join("engine");

    run(&["new", s(&project)])?;
    run(&["add-model", s(&project), "--text", "   "])?;
    run(&[
        "add-model",
        s(&project),
        "--format",
        "yaml",
        "--path",
        "data.yaml",
        "--text",
        "x: 1",
    ])?;
    run(&["set-template", s(&project), "--text", "{{x}}"])?;
    run(&["add-output", s(&project), "out.txt"])?;
    run(&["define", s(&project), "stage=beta"])?;

    cli()?
        .args(["--engine-dir", s(&engine), "export", s(&project), s(&export)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported"));

    assert!(!export.join("model0.json").exists());
    assert_eq!(fs::read_to_string(export.join("model1.yaml"))?, "x: 1");
    assert_eq!(fs::read_to_string(export.join("template.sbn"))?, "{{x}}");

    let args: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(export.join("args.json"))?)?;
    assert_eq!(args["models"], serde_json::json!(["model1.yaml"]));
    assert_eq!(args["template"], "template.sbn");
    assert_eq!(args["output"], serde_json::json!(["out.txt"]));
    assert_eq!(args["definitions"], serde_json::json!(["stage=beta"]));

    let render = fs::read_to_string(export.join("render.bat"))?;
    assert!(render.contains(s(&engine.join("textrude.exe"))));
    assert!(export.join("args.yaml").is_file());
    assert!(export.join("jsonrender.bat").is_file());
    assert!(export.join("yamlrender.bat").is_file());
    Ok(())
}

#[test]
fn command_line_uses_editor_paths() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let project = dir.path().join("p.texproj");
    run(&["new", s(&project)])?;
    run(&["add-model", s(&project), "--path", "data.json", "--text", "{}"])?;
    run(&["set-template", s(&project), "--path", "page.sbn"])?;
    run(&["add-output", s(&project), "page.html"])?;

    cli()?
        .env("TEXPROJ_ENGINE_DIR", "bin")
        .args(["command-line", s(&project)])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "render --models data.json --template page.sbn --output page.html",
        ));
    Ok(())
}

#[test]
fn show_lists_project_contents() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let project = dir.path().join("notes.texproj");
    run(&["new", s(&project)])?;
    run(&["include", s(&project), "partials"])?;
    run(&["add-model", s(&project), "--format", "csv", "--text", "a,b"])?;

    cli()?
        .args(["show", s(&project)])
        .assert()
        .success()
        .stdout(predicate::str::contains("notes.texproj - texproj"))
        .stdout(predicate::str::contains("[0] csv - (3 bytes)"))
        .stdout(predicate::str::contains("partials"));
    Ok(())
}

#[test]
fn new_refuses_to_overwrite_without_force() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let project = dir.path().join("keep.texproj");
    fs::write(&project, "precious")?;

    cli()?
        .args(["new", s(&project)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    assert_eq!(fs::read_to_string(&project)?, "precious");

    run(&["new", "--force", s(&project)])?;
    assert!(fs::read_to_string(&project)?.contains("format_version"));
    Ok(())
}

#[test]
fn malformed_project_reports_generic_failure() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let project = dir.path().join("broken.texproj");
    fs::write(&project, "{ this is not a project")?;

    cli()?
        .args(["add-output", s(&project), "x.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to open project"));
    assert_eq!(fs::read_to_string(&project)?, "{ this is not a project");
    Ok(())
}

#[test]
fn define_rejects_malformed_pairs() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let project = dir.path().join("d.texproj");
    run(&["new", s(&project)])?;

    cli()?
        .args(["define", s(&project), "novalue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME=VALUE"));
    Ok(())
}

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn download_writes_a_pdf_sheet() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let output = workspace.path().join("out").join("sheet.pdf");

    cli()?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "download",
            "--catalog",
            "demos/articles.json",
            "--select",
            "1=2",
            "--select",
            "3=1",
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 label(s)"));

    let bytes = fs::read(&output)?;
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(bytes.ends_with(b"%%EOF\n"));
    let pages = bytes
        .windows(b"/Type /Page ".len())
        .filter(|window| *window == b"/Type /Page ")
        .count();
    assert_eq!(pages, 2);
    Ok(())
}

#[test]
fn download_defaults_to_labels_pdf_in_workspace() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let selection = workspace.path().join("selection.json");
    fs::write(&selection, r#"{ "6": 1, "9": 2 }"#)?;

    cli()?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "download",
            "--catalog",
            "demos/articles.json",
            "--selection",
            selection.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert!(workspace.path().join("labels.pdf").exists());
    Ok(())
}

#[test]
fn empty_selection_is_rejected() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;

    cli()?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "download",
            "--catalog",
            "demos/articles.json",
            "--select",
            "1=0",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no labels selected"));

    assert!(!workspace.path().join("labels.pdf").exists());
    Ok(())
}

#[test]
fn catalog_search_lists_matching_items() -> Result<(), Box<dyn Error>> {
    cli()?
        .args(["catalog", "--catalog", "demos/articles.json", "--search", "fur-00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Conference Chair"))
        .stdout(predicate::str::contains("Bar Stool"))
        .stdout(predicate::str::contains("LED Spotlight").not());
    Ok(())
}

#[test]
fn print_requires_an_active_location() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;

    cli()?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "print",
            "--catalog",
            "demos/articles.json",
            "--select",
            "1=1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no printer location selected"));
    Ok(())
}

#[test]
fn print_reports_unconfigured_printers_per_channel() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let root = workspace.path().to_str().unwrap();

    cli()?
        .args(["--workspace", root, "locations", "use", "Default Location"])
        .assert()
        .success();

    cli()?
        .args([
            "--workspace",
            root,
            "print",
            "--catalog",
            "demos/articles.json",
            "--select",
            "1=1",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "permanent: failed: permanent printer is not configured",
        ))
        .stdout(predicate::str::contains("non-permanent: no labels"))
        .stderr(predicate::str::contains("1 channel(s) failed"));
    Ok(())
}

#[test]
fn download_counts_only_rendered_labels() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;

    cli()?
        .args([
            "--workspace",
            workspace.path().to_str().unwrap(),
            "download",
            "--catalog",
            "demos/articles.json",
            "--select",
            "1=2",
            "--select",
            "99=5",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 label(s)"));
    Ok(())
}

#[test]
fn permanent_override_reroutes_an_item() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let root = workspace.path().to_str().unwrap();

    cli()?
        .args(["--workspace", root, "locations", "use", "Default Location"])
        .assert()
        .success();

    cli()?
        .args([
            "--workspace",
            root,
            "print",
            "--catalog",
            "demos/articles.json",
            "--select",
            "3=1",
            "--permanent",
            "3",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "permanent: failed: permanent printer is not configured",
        ))
        .stdout(predicate::str::contains("non-permanent: no labels"));

    cli()?
        .args([
            "--workspace",
            root,
            "download",
            "--catalog",
            "demos/articles.json",
            "--select",
            "3=1",
            "--non-permanent",
            "42",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("item '42' is not in the catalog"));
    Ok(())
}

#[test]
fn configured_paths_are_stored_absolute() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let elsewhere = tempdir()?;
    let root = workspace.path().to_str().unwrap();

    let mut set_raster = Command::cargo_bin("tagsheet")?;
    set_raster
        .current_dir(elsewhere.path())
        .args(["--workspace", root, "config", "set-raster", "--font", "fonts/label.ttf"])
        .assert()
        .success();

    let mut set_broker = Command::cargo_bin("tagsheet")?;
    set_broker
        .current_dir(elsewhere.path())
        .args(["--workspace", root, "config", "set-broker", "--private-key", "keys/qz.pem"])
        .assert()
        .success();

    let cwd = fs::canonicalize(elsewhere.path())?;
    let config = fs::read_to_string(workspace.path().join("tagsheet.json"))?;
    let config: serde_json::Value = serde_json::from_str(&config)?;
    assert_eq!(
        config["fontPath"],
        cwd.join("fonts/label.ttf").to_str().unwrap()
    );
    assert_eq!(
        config["broker"]["privateKeyPath"],
        cwd.join("keys/qz.pem").to_str().unwrap()
    );
    Ok(())
}

fn cli() -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("tagsheet")?;
    cmd.current_dir(repo_root());
    Ok(cmd)
}

fn repo_root() -> PathBuf {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|dir| dir.parent())
        .expect("workspace root")
        .to_path_buf()
}

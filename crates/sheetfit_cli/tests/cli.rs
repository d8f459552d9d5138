use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

fn write_workbook(path: &Path, rows: &[&[&str]]) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, txt) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, *txt)
                .expect("write cell");
        }
    }
    workbook.save(path).expect("save fixture");
}

/// Binary isolated from the user's config directory.
fn sheetfit(tmp: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("sheetfit"));
    cmd.env("XDG_CONFIG_HOME", tmp.path().join("xdg"))
        .env("HOME", tmp.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn fits_one_file_next_to_input() {
    let tmp = TempDir::new().expect("tempdir");
    let path_in = tmp.path().join("report.xlsx");
    write_workbook(&path_in, &[&["ab", "AB中文"], &["x\ny\nz", ""]]);

    sheetfit(&tmp)
        .arg(&path_in)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[FIT] files=1 succeeded=1 failed=0 sheets=1",
        ));
    assert!(tmp.path().join("report_beautifuler.xlsx").is_file());
    assert!(path_in.is_file());
}

#[test]
fn explicit_output_path_is_honored() {
    let tmp = TempDir::new().expect("tempdir");
    let path_in = tmp.path().join("in.xlsx");
    let path_out = tmp.path().join("fitted.xlsx");
    write_workbook(&path_in, &[&["中文"]]);

    sheetfit(&tmp)
        .arg(&path_in)
        .arg("-o")
        .arg(&path_out)
        .args(["--enable-font-autofit", "--horizontal-alignment", "left"])
        .assert()
        .success();
    assert!(path_out.is_file());
}

#[test]
fn missing_file_fails_but_others_are_written() {
    let tmp = TempDir::new().expect("tempdir");
    let path_a = tmp.path().join("a.xlsx");
    let path_c = tmp.path().join("c.xlsx");
    write_workbook(&path_a, &[&["a"]]);
    write_workbook(&path_c, &[&["c"]]);

    sheetfit(&tmp)
        .arg(&path_a)
        .arg(tmp.path().join("missing.xlsx"))
        .arg(&path_c)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("FileNotFoundError"))
        .stdout(predicate::str::contains("succeeded=2 failed=1"));
    assert!(tmp.path().join("a_beautifuler.xlsx").is_file());
    assert!(tmp.path().join("c_beautifuler.xlsx").is_file());
}

#[test]
fn no_input_exits_with_failure() {
    let tmp = TempDir::new().expect("tempdir");
    sheetfit(&tmp)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No input files"));
}

#[test]
fn configuration_errors_exit_2_without_writing() {
    let tmp = TempDir::new().expect("tempdir");
    let path_a = tmp.path().join("a.xlsx");
    let path_b = tmp.path().join("b.xlsx");
    write_workbook(&path_a, &[&["a"]]);
    write_workbook(&path_b, &[&["b"]]);

    sheetfit(&tmp)
        .arg(&path_a)
        .args(["--min-width", "50", "--max-width", "10"])
        .assert()
        .code(2);

    sheetfit(&tmp)
        .arg(&path_a)
        .arg(&path_b)
        .arg("-o")
        .arg(tmp.path().join("out.xlsx"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("exactly one input"));

    sheetfit(&tmp)
        .arg(&path_a)
        .args(["--vertical-alignment", "middle"])
        .assert()
        .code(2);

    sheetfit(&tmp)
        .arg(&path_a)
        .args(["--enable-font-autofit", "--disable-font-autofit"])
        .assert()
        .code(2);

    sheetfit(&tmp)
        .arg(&path_a)
        .arg("--config")
        .arg(tmp.path().join("nope.toml"))
        .assert()
        .code(2);

    assert!(!tmp.path().join("a_beautifuler.xlsx").exists());
    assert!(!tmp.path().join("out.xlsx").exists());
}

#[test]
fn use_defaults_reads_preset_list_from_config() {
    let tmp = TempDir::new().expect("tempdir");
    let path_in = tmp.path().join("preset.xlsx");
    write_workbook(&path_in, &[&["preset"]]);

    let path_config = tmp.path().join("sheetfit.toml");
    std::fs::write(
        &path_config,
        format!(
            "width_factor = 1.5\ndefault_files = [{:?}]\n",
            tmp.path().join("*.xlsx").display().to_string()
        ),
    )
    .expect("write config");

    sheetfit(&tmp)
        .arg("--use-defaults")
        .arg("--config")
        .arg(&path_config)
        .assert()
        .success()
        .stdout(predicate::str::contains("files=1 succeeded=1"));
    assert!(tmp.path().join("preset_beautifuler.xlsx").is_file());
}

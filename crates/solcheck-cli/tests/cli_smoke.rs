use std::fs;
use std::process::Command;

use serde_json::Value;
use tempfile::tempdir;

const STATEMENT: &str =
    "Résoudre le système formé par les deux équations suivantes et vérifier la solution.";

fn solcheck() -> Command {
    Command::new(env!("CARGO_BIN_EXE_solcheck"))
}

#[test]
fn verify_exit_code_follows_report() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let statement = tmp.path().join("statement.txt");
    fs::write(&statement, STATEMENT)?;

    let good = tmp.path().join("good.txt");
    fs::write(
        &good,
        "SOLUTION:\nAddition des lignes.\n\nFINAL_ANSWER:\n{x: 2, y: -1}\n\nCHECK:\nSYSTEM; Eq(x+y,1); Eq(x-y,3)",
    )?;
    let output = solcheck()
        .args(["verify", "--topic", "systèmes", "--statement"])
        .arg(&statement)
        .arg("--solution")
        .arg(&good)
        .output()?;
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["ok"], Value::Bool(true));
    assert_eq!(report["kind"], Value::from("mixed"));

    let bad = tmp.path().join("bad.txt");
    fs::write(
        &bad,
        "SOLUTION:\nAddition des lignes.\n\nFINAL_ANSWER:\n{x: 1, y: 0}\n\nCHECK:\nSYSTEM; Eq(x+y,1); Eq(x-y,3)",
    )?;
    let output = solcheck()
        .args(["verify", "--statement"])
        .arg(&statement)
        .arg("--solution")
        .arg(&bad)
        .output()?;
    assert_eq!(output.status.code(), Some(1));
    Ok(())
}

#[test]
fn normalize_lists_fixes() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let statement = tmp.path().join("statement.txt");
    let solution = tmp.path().join("solution.txt");
    fs::write(&statement, "Résoudre 2x+1=5")?;
    fs::write(&solution, "x = 2")?;
    let output = solcheck()
        .arg("normalize")
        .arg("--statement")
        .arg(&statement)
        .arg("--solution")
        .arg(&solution)
        .output()?;
    assert!(output.status.success());
    let normalized: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(
        normalized["fixes"],
        serde_json::json!(["padded_statement", "synthesized_blocks"])
    );
    Ok(())
}

#[test]
fn blocks_prints_heading_map() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let solution = tmp.path().join("solution.txt");
    fs::write(&solution, "SOLUTION:\nx = 2\nFINAL_ANSWER:\n2")?;
    let output = solcheck().arg("blocks").arg(&solution).output()?;
    assert!(output.status.success());
    let blocks: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(blocks["FINAL_ANSWER"], Value::from("2"));
    assert_eq!(blocks["SOLUTION"], Value::from("x = 2"));
    Ok(())
}

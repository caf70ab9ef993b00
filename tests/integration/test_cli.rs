//! End-to-end tests driving the `molpipe` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

use crate::helpers::read_lines;

fn molpipe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_molpipe"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run molpipe")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_csv_dedup_and_sort_round_trip() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    let metrics = dir.path().join("stages.tsv");
    fs::write(
        &input,
        "id,SMILES,logP\na,CCO,-0.3\nb,CCO,1.0\nc,c1ccccc1,2.1\nd,C1CC,0.0\ne,CCN,n/a\n",
    )
    .unwrap();

    let result = molpipe(&[
        "run",
        "-i",
        path_str(&input),
        "-o",
        path_str(&output),
        "--deduplicate",
        "--sort-by-property",
        "logP",
        "desc",
        "--metrics",
        path_str(&metrics),
        "--mpu",
        "3",
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    assert_eq!(read_lines(&output), vec!["SMILES,id,logP", "c1ccccc1,c,2.1", "CCO,a,-0.3"]);

    let stages: Vec<String> = read_lines(&metrics)
        .iter()
        .skip(1)
        .map(|line| line.split('\t').next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(stages, vec!["load", "deduplicate", "sort-by-property", "save"]);
    assert!(read_lines(&metrics)[0].starts_with("stage\tinput_records\toutput_records"));
}

#[test]
fn test_smi_output_from_inline_smiles() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.smi");
    let result = molpipe(&[
        "run",
        "--smiles",
        "Cl.CCO,CCN",
        "-o",
        path_str(&output),
        "--desalt",
        "--quiet",
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    assert_eq!(read_lines(&output), vec!["CCO", "CCN"]);
}

#[test]
fn test_smi_input_names_are_carried_to_tsv() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.smi");
    let output = dir.path().join("out.txt");
    fs::write(&input, "CCO ethanol\nCCN ethylamine\n").unwrap();
    let result = molpipe(&[
        "run",
        "-i",
        path_str(&input),
        "-o",
        path_str(&output),
        "--output-format",
        "tsv",
        "--match",
        "N",
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    assert_eq!(
        read_lines(&output),
        vec!["SMILES\tMatch\tName", "CCO\t0\tethanol", "CCN\t1\tethylamine"]
    );
}

#[test]
fn test_worker_alias_precedence_is_logged() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.smi");
    let result = molpipe(&[
        "run",
        "--smiles",
        "CCO",
        "-o",
        path_str(&output),
        "--multiprocessing",
        "7",
        "--workers",
        "3",
        "--parallels",
        "5",
    ]);
    assert!(result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("Workers: 3"), "{stderr}");
}

#[test]
fn test_split_output_writes_three_files() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("data.smi");
    let smiles = (1..=10).map(|n| "C".repeat(n)).collect::<Vec<_>>().join(",");
    let result = molpipe(&[
        "run",
        "--smiles",
        &smiles,
        "-o",
        path_str(&output),
        "--split-output",
        "0.5,0.3,0.2",
        "--seed",
        "42",
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    let counts: Vec<usize> = ["train", "test", "validation"]
        .iter()
        .map(|name| read_lines(&dir.path().join(format!("data_{name}.csv"))).len() - 1)
        .collect();
    assert_eq!(counts, vec![5, 3, 2]);
    assert!(!output.exists());
}

#[test]
fn test_split_command_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.smi");
    fs::write(&input, (1..=20).map(|n| "C".repeat(n) + "\n").collect::<String>()).unwrap();
    let run = |base: &str| {
        let output = dir.path().join(format!("{base}.csv"));
        let result = molpipe(&[
            "split",
            "-i",
            path_str(&input),
            "-o",
            path_str(&output),
            "--ratios",
            "3,1",
            "--seed",
            "7",
        ]);
        assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
        (
            read_lines(&dir.path().join(format!("{base}_train.csv"))),
            read_lines(&dir.path().join(format!("{base}_test.csv"))),
        )
    };
    let (train, test) = run("first");
    assert_eq!((train.len() - 1, test.len() - 1), (15, 5));
    assert_eq!(run("second"), (train, test));
}

#[test]
fn test_top_level_errors_exit_with_one() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");
    let missing = dir.path().join("missing.csv");
    let cases: [Vec<&str>; 4] = [
        vec!["run", "-i", path_str(&missing), "-o", path_str(&output)],
        vec!["run", "--smiles", "CCO", "-o", path_str(&output), "--fragment", "shatter"],
        vec!["run", "--smiles", "CCO", "-o", path_str(&output), "--match", "C1CC"],
        vec!["run", "--smiles", "CCO,C(", "-o", path_str(&output)],
    ];
    for args in &cases {
        let result = molpipe(args);
        assert_eq!(result.status.code(), Some(1), "{args:?}");
    }
    assert!(!output.exists());
}

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write input");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_activeregion"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run activeregion")
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn regions_prints_one_line_per_region() {
    let dir = TempDir::new().unwrap();
    let dict = write(&dir, "dict.tsv", "1\t1000\n");
    let intervals = write(&dir, "intervals.tsv", "# contig start stop\n1\t1\t40\n");
    let reads = write(&dir, "reads.tsv", "r1\t1\t5\t15\nr2\t1\t18\t30\n");
    let track: String = (21..=40).map(|pos| format!("1\t{pos}\t0.0\n")).collect();
    let track = write(&dir, "track.tsv", &track);

    let output = run(&[
        "regions",
        "--dict",
        arg(&dict),
        "--intervals",
        arg(&intervals),
        "--reads",
        arg(&reads),
        "--activity-track",
        arg(&track),
        "--states",
        "primary,nonprimary,extended",
    ]);

    assert_eq!(
        stdout_lines(&output),
        vec![
            "1:1-20\tactive\t1:1-40\tr1:PRIMARY,r2:NONPRIMARY",
            "1:21-40\tinactive\t1:1-40\tr1:EXTENDED,r2:PRIMARY",
        ]
    );
}

#[test]
fn regions_reports_primary_reads_by_default() {
    let dir = TempDir::new().unwrap();
    let dict = write(&dir, "dict.tsv", "1\t1000\n");
    let intervals = write(&dir, "intervals.tsv", "1\t100\t109\n");
    let reads = write(&dir, "reads.tsv", "inside\t1\t102\t104\n");

    let output = run(&[
        "regions",
        "--dict",
        arg(&dict),
        "--intervals",
        arg(&intervals),
        "--reads",
        arg(&reads),
        "--extension",
        "0",
    ]);

    assert_eq!(
        stdout_lines(&output),
        vec!["1:100-109\tactive\t1:100-109\tinside:PRIMARY"]
    );
}

#[test]
fn regions_rejects_unsorted_intervals() {
    let dir = TempDir::new().unwrap();
    let dict = write(&dir, "dict.tsv", "1\t1000\n");
    let intervals = write(&dir, "intervals.tsv", "1\t50\t60\n1\t10\t20\n");

    let output = run(&["regions", "--dict", arg(&dict), "--intervals", arg(&intervals)]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid interval list"));
}

#[test]
fn downsample_keeps_survivors_and_logs_removed_reads() {
    let dir = TempDir::new().unwrap();
    let pileup = write(
        &dir,
        "pileup.tsv",
        "a0\t90\tA\t30\tNA12878\tlib1\tPU1\t0\n\
         c0\t91\tC\t30\tNA12878\tlib1\tPU1\t0\n\
         a1\t92\tA\t30\tNA12878\tlib1\tPU1\t0\n\
         a2\t93\ta\t30\tNA12878\tlib1\tPU1\t0\n",
    );
    let removed = dir.path().join("removed.tsv");

    // 4 elements at 0.25: one A removed, the lone C removed whole.
    let output = run(&[
        "downsample",
        "--locus",
        "20:100",
        "--pileup",
        arg(&pileup),
        "--fraction",
        "0.25",
        "--seed",
        "7",
        "--removed-log",
        arg(&removed),
    ]);

    let kept = stdout_lines(&output);
    assert_eq!(kept.len(), 2);
    assert!(kept.iter().all(|line| line.ends_with("\tA")), "{kept:?}");

    let log = fs::read_to_string(&removed).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('a'));
    assert_eq!(lines[1], "c0\tNA12878\tlib1\tPU1");
    for line in &lines {
        let name = line.split('\t').next().unwrap_or_default();
        assert!(!kept.iter().any(|k| k.starts_with(&format!("{name}\t"))));
    }
}

#[test]
fn downsample_rejects_reads_longer_than_the_span_limit() {
    let dir = TempDir::new().unwrap();
    let pileup = write(&dir, "pileup.tsv", "huge\t1\tA\t30\tS\tL\tPU\t0\n");

    let output = run(&[
        "downsample",
        "--locus",
        "1:4000000000",
        "--pileup",
        arg(&pileup),
        "--fraction",
        "0.5",
    ]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("limit 100000"));
}

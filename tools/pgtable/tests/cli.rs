use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const MAP: &str = "\
# Juno-like board
0x80000000, 2G,  NORMAL, DRAM
0x1C090000, 4K,  DEVICE, UART0
";

fn pgtable(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pgtable"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to spawn pgtable")
}

fn path(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn writes_assembly_and_reports_buffer_size() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("board.mmap");
    let output = dir.path().join("mmu_on.S");
    fs::write(&input, MAP).unwrap();

    let out = pgtable(&[
        "-i", path(&input), "-o", path(&output), "-ttb", "0x90000000", "-tg", "64K",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("a total of 2 translation tables"), "{stdout}");

    let asm = fs::read_to_string(&output).unwrap();
    assert!(asm.contains(".global mmu_on"));
    assert!(asm.contains("-tg 64K"));
    assert!(asm.contains("MSR     tcr_el2, x1"));
}

#[test]
fn strict_alignment_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("board.mmap");
    let output = dir.path().join("mmu_on.S");
    fs::write(&input, MAP).unwrap();

    let out = pgtable(&[
        "-i", path(&input), "-o", path(&output), "-ttb", "0x90000000", "-tg", "64K",
        "--strict-align",
    ]);
    assert!(!out.status.success());
    assert!(!output.exists());

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("UART0"), "{stderr}");
}

#[test]
fn overlapping_regions_fail_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("overlap.mmap");
    let output = dir.path().join("mmu_on.S");
    fs::write(&input, "0x1000, 0x2000, NORMAL, A\n0x1800, 0x1000, NORMAL, B\n").unwrap();

    let out = pgtable(&["-i", path(&input), "-o", path(&output), "-ttb", "0x80000000"]);
    assert!(!out.status.success());
    assert!(!output.exists());
}

#[test]
fn missing_input_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("absent.mmap");
    let output = dir.path().join("mmu_on.S");

    let out = pgtable(&["-i", path(&input), "-o", path(&output), "-ttb", "0x80000000"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to read memory map"));
    assert!(!output.exists());
}

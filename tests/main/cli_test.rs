//! CLI contract tests.

use assert_cmd::Command;

fn ppsgui() -> Command {
    match Command::cargo_bin("ppsgui") {
        Ok(cmd) => cmd,
        Err(err) => panic!("ppsgui binary should build: {err}"),
    }
}

#[test]
fn help_lists_every_option_and_exits_zero() {
    let output = ppsgui().arg("--help").output().expect("run --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for option in [
        "--context",
        "--from",
        "--name",
        "--verbosity",
        "--autoconnect",
        "--tactile",
        "--pps",
        "--gain",
    ] {
        assert!(stdout.contains(option), "help should mention {option}");
    }
}

#[test]
fn invalid_switch_value_is_rejected() {
    ppsgui().args(["--tactile", "maybe"]).assert().failure();
}

#[cfg(unix)]
#[test]
fn unavailable_network_exits_minus_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("offline.ini");
    std::fs::write(&path, "[network]\nhost = \"not-a-host.invalid\"\n").expect("write config");

    ppsgui()
        .arg("--from")
        .arg(&path)
        .assert()
        .code(255);
}

#[cfg(unix)]
#[test]
fn negative_verbosity_is_accepted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("offline.ini");
    std::fs::write(&path, "[network]\nhost = \"not-a-host.invalid\"\n").expect("write config");

    // Parsing succeeds, so the run reaches the network check.
    ppsgui()
        .args(["--verbosity", "-1", "--from"])
        .arg(&path)
        .assert()
        .code(255);
}

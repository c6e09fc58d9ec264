//! End-to-end tests for the tcpreasm binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::net::SocketAddr;
use tcpreasm_core::segment::{PacketBuilder, TcpFlags};
use tempfile::TempDir;

fn tcpreasm() -> Command {
    let mut cmd = Command::cargo_bin("tcpreasm").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("TCPREASM_CONFIG");
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const REORDERED_SCRIPT: &str = r#"
initial_seq = 100

[[segment]]
seq = 110
text = "BBBBB"

[[segment]]
seq = 100
hex = "41414141414141414141"

[[segment]]
seq = 100
text = "AAAAA"
"#;

#[test]
fn test_replay_writes_ordered_stream() {
    let dir = TempDir::new().unwrap();
    let script = write(&dir, "script.toml", REORDERED_SCRIPT);

    tcpreasm()
        .arg("replay")
        .arg(&script)
        .assert()
        .success()
        .stdout("AAAAAAAAAABBBBB");
}

#[test]
fn test_replay_stats_on_stderr() {
    let dir = TempDir::new().unwrap();
    let script = write(&dir, "script.toml", REORDERED_SCRIPT);

    tcpreasm()
        .args(["-q", "replay"])
        .arg(&script)
        .arg("--stats")
        .assert()
        .success()
        .stdout("AAAAAAAAAABBBBB")
        .stderr(predicate::str::contains("\"bytes_delivered\": 15"))
        .stderr(predicate::str::contains("\"duplicates\": 1"));
}

#[test]
fn test_replay_to_file() {
    let dir = TempDir::new().unwrap();
    let script = write(&dir, "script.toml", REORDERED_SCRIPT);
    let out = dir.path().join("stream.bin");

    tcpreasm()
        .arg("replay")
        .arg(&script)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout("");

    assert_eq!(fs::read(&out).unwrap(), b"AAAAAAAAAABBBBB");
}

#[test]
fn test_replay_honors_pending_limits() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "tcpreasm.toml", "[reassembly]\nmax_pending_segments = 1\n");
    let script = write(
        &dir,
        "script.toml",
        r#"
initial_seq = 0

[[segment]]
seq = 3
text = "d"

[[segment]]
seq = 5
text = "f"

[[segment]]
seq = 0
text = "abc"
"#,
    );

    tcpreasm()
        .arg("replay")
        .arg(&script)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout("abcd");
}

#[test]
fn test_replay_invalid_script() {
    let dir = TempDir::new().unwrap();
    let script = write(&dir, "script.toml", "initial_seq = 0\n[[segment]]\nseq = 0\n");

    tcpreasm()
        .arg("replay")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing 'text' or 'hex' payload"));
}

#[test]
fn test_replay_missing_script() {
    let dir = TempDir::new().unwrap();

    tcpreasm()
        .arg("replay")
        .arg(dir.path().join("nope.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load script"));
}

fn packet_line(src: &str, dst: &str, seq: u32, flags: TcpFlags, payload: &[u8]) -> String {
    let src: SocketAddr = src.parse().unwrap();
    let dst: SocketAddr = dst.parse().unwrap();
    let packet = PacketBuilder::tcp(src, dst)
        .seq(seq)
        .flags(flags)
        .payload(payload)
        .build();
    hex::encode(packet)
}

#[test]
fn test_packets_follows_first_direction() {
    let client = "10.0.0.1:40000";
    let server = "10.0.0.2:80";

    let dump = [
        "# client handshake".to_string(),
        packet_line(client, server, 999, TcpFlags::SYN, b""),
        packet_line(server, client, 5000, TcpFlags::SYN | TcpFlags::ACK, b""),
        String::new(),
        packet_line(client, server, 1005, TcpFlags::ACK, b" world"),
        packet_line(server, client, 5001, TcpFlags::ACK, b"ignored reply"),
        packet_line(client, server, 1000, TcpFlags::ACK | TcpFlags::PSH, b"hello"),
        packet_line(client, server, 1000, TcpFlags::ACK, b"hello"),
        packet_line(client, server, 1011, TcpFlags::FIN | TcpFlags::ACK, b""),
    ]
    .join("\n");

    let dir = TempDir::new().unwrap();
    let file = write(&dir, "dump.hex", &dump);

    tcpreasm()
        .arg("packets")
        .arg(&file)
        .arg("--stats")
        .assert()
        .success()
        .stdout("hello world")
        .stderr(predicate::str::contains("\"next_seq\": 1011"));
}

#[test]
fn test_packets_restarts_on_new_connection() {
    let client = "10.0.0.1:40000";
    let server = "10.0.0.2:80";

    let dump = [
        packet_line(client, server, 999, TcpFlags::SYN, b""),
        packet_line(client, server, 1000, TcpFlags::ACK, b"hello"),
        packet_line(client, server, 1005, TcpFlags::FIN | TcpFlags::ACK, b""),
        packet_line(client, server, 7000, TcpFlags::SYN, b""),
        packet_line(client, server, 7001, TcpFlags::ACK, b"again"),
    ]
    .join("\n");

    let dir = TempDir::new().unwrap();
    let file = write(&dir, "dump.hex", &dump);

    tcpreasm()
        .args(["-q", "packets"])
        .arg(&file)
        .arg("--stats")
        .assert()
        .success()
        .stdout("helloagain")
        .stderr(predicate::str::contains("\"next_seq\": 7006"))
        .stderr(predicate::str::contains("\"bytes_delivered\": 5"));
}

#[test]
fn test_packets_rejects_bad_hex() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "dump.hex", "not hex at all\n");

    tcpreasm()
        .arg("packets")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("dump.hex:1: invalid hex"));
}

#[test]
fn test_config_generate_then_validate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tcpreasm.toml");

    tcpreasm()
        .args(["config", "generate", "--output"])
        .arg(&path)
        .assert()
        .success();

    tcpreasm()
        .args(["config", "validate"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Max pending segments: unlimited"));

    // Refuses to clobber without --force.
    tcpreasm()
        .args(["config", "generate", "--output"])
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn test_config_validate_rejects_zero_cap() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "bad.toml", "[reassembly]\nmax_pending_bytes = 0\n");

    tcpreasm()
        .args(["config", "validate"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("reassembly.max_pending_bytes"));
}

#[test]
fn test_config_show_reflects_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "tcpreasm.toml",
        "[reassembly]\noverflow_policy = \"evict-furthest\"\n",
    );

    tcpreasm()
        .args(["config", "show", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("evict-furthest"));
}

#[test]
fn test_completions() {
    tcpreasm()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tcpreasm"));
}

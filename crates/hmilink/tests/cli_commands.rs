#![cfg(all(unix, feature = "cli"))]

use std::io;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use hmilink::frame::{build_read_command, FrameCodec};
use hmilink::session::Panel;
use hmilink::transport::FdChannel;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/hmilink-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn hmilink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hmilink"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("hmilink should run")
}

fn json_stdout(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be json")
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn spawn_simulator(sock_path: &Path, extra: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_hmilink"))
        .arg("--log-level")
        .arg("error")
        .arg("simulate")
        .arg(sock_path)
        .args(extra)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("simulate command should start")
}

fn wait_for_connect(path: &Path, timeout: Duration) -> io::Result<Panel<FdChannel<UnixStream>>> {
    let start = Instant::now();
    loop {
        match FdChannel::connect(path) {
            Ok(channel) => return Ok(Panel::new(channel)),
            Err(err) => {
                if start.elapsed() >= timeout {
                    return Err(io::Error::other(format!("connect timeout: {err}")));
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> Option<std::process::ExitStatus> {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if let Ok(Some(status)) = child.try_wait() {
            return Some(status);
        }
        thread::sleep(Duration::from_millis(25));
    }
    None
}

#[test]
fn encode_read_matches_library_frame() {
    let output = hmilink(&["encode", "read", "0x5000", "--words", "2"]);
    let json = json_stdout(&output);

    let expected = build_read_command(0x5000, 2).expect("frame should build");
    assert_eq!(json["kind"], "read_command");
    assert_eq!(json["opcode"], "read");
    assert_eq!(json["address"], "0x5000");
    assert_eq!(json["length"], 9);
    assert_eq!(json["bytes"], hex(expected.as_bytes()));
}

#[test]
fn encode_write_words_are_big_endian() {
    let output = hmilink(&["encode", "write", "20480", "--words", "0x1234,0x00FF"]);
    let json = json_stdout(&output);
    let bytes = json["bytes"].as_str().expect("bytes should be a string");
    assert!(bytes.starts_with("5A A5 09 82 50 00 12 34 00 FF"));
}

#[test]
fn encode_rejects_read_counts_outside_the_cap() {
    let output = hmilink(&["encode", "read", "0x0000", "--words", "130"]);
    assert_eq!(output.status.code(), Some(64));

    let output = hmilink(&["encode", "read", "0x0000", "--words", "0"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn crc_of_check_string() {
    let output = hmilink(&["crc", "31 32 33 34 35 36 37 38 39"]);
    let json = json_stdout(&output);
    assert_eq!(json["checksum"], "0x4B37");
    assert_eq!(json["wire"], "37 4B");
}

#[test]
fn decode_accepts_write_ack() {
    let ack = FrameCodec::new().build_write_ack();
    let output = hmilink(&["decode", &hex(ack.as_bytes())]);
    let json = json_stdout(&output);
    assert_eq!(json["kind"], "write_ack");
}

#[test]
fn decode_reports_read_data() {
    let reply = FrameCodec::new()
        .build_read_reply(0x5000, &[0x12, 0x34])
        .expect("reply should build");
    let output = hmilink(&["decode", &hex(reply.as_bytes())]);
    let json = json_stdout(&output);
    assert_eq!(json["kind"], "read_data");
    assert_eq!(json["address"], "0x5000");
    assert_eq!(json["word_count"], 1);
    assert_eq!(json["data"], "12 34");
}

#[test]
fn decode_rejects_corrupted_reply() {
    let ack = FrameCodec::new().build_write_ack();
    let mut bytes = ack.as_bytes().to_vec();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    let output = hmilink(&["decode", &hex(&bytes)]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("decode failed"));
}

#[test]
fn simulate_serves_reads_and_writes() {
    let dir = unique_temp_dir("simulate");
    let sock_path = dir.join("panel.sock");
    let sock = sock_path.to_str().expect("temp path should be utf-8");

    let mut child = spawn_simulator(
        &sock_path,
        &["--set", "0x0010=0x00FF", "--idle-timeout", "200ms"],
    );

    {
        let mut panel = wait_for_connect(&sock_path, Duration::from_secs(3))
            .expect("client should connect to simulator");
        assert_eq!(panel.read_word(0x0010).expect("preset should read"), 0x00FF);
        panel
            .write_words(0x5000, &[0x1234, 0xABCD])
            .expect("write should be acknowledged");
    }

    let output = hmilink(&["read", sock, "0x5000", "--words", "2", "--timeout", "1s"]);
    let json = json_stdout(&output);
    assert_eq!(json["address"], "0x5000");
    assert_eq!(json["words"], serde_json::json!([0x1234, 0xABCD]));

    let output = hmilink(&[
        "write", sock, "0x6000", "--text", "HELLO", "--timeout", "1s",
    ]);
    let json = json_stdout(&output);
    assert_eq!(json["text"], "HELLO");

    let output = hmilink(&[
        "read", sock, "0x6000", "--words", "4", "--text", "--timeout", "1s",
    ]);
    let json = json_stdout(&output);
    assert_eq!(json["text"], "HELLO");

    let _ = child.kill();
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulate_exits_after_count_and_removes_socket() {
    let dir = unique_temp_dir("simulate-count");
    let sock_path = dir.join("panel.sock");

    let mut child = spawn_simulator(&sock_path, &["--count", "1"]);

    let mut panel = wait_for_connect(&sock_path, Duration::from_secs(3))
        .expect("client should connect to simulator");
    assert_eq!(panel.read_word(0x0000).expect("read should succeed"), 0);

    let status = wait_for_exit(&mut child, Duration::from_secs(5));
    if status.is_none() {
        let _ = child.kill();
        let _ = child.wait();
    }
    let status = status.expect("simulator should exit after one request");
    assert!(status.success());
    assert!(!sock_path.exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulate_stops_on_interrupt_while_idle() {
    let dir = unique_temp_dir("simulate-interrupt");
    let sock_path = dir.join("panel.sock");

    let mut child = spawn_simulator(&sock_path, &[]);
    let start = Instant::now();
    while !sock_path.exists() && start.elapsed() < Duration::from_secs(3) {
        thread::sleep(Duration::from_millis(25));
    }
    assert!(sock_path.exists(), "simulator should bind its socket");

    let killed = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("kill should run");
    assert!(killed.success());

    let status = wait_for_exit(&mut child, Duration::from_secs(5));
    if status.is_none() {
        let _ = child.kill();
        let _ = child.wait();
    }
    let status = status.expect("simulator should exit on interrupt with no client");
    assert!(status.success());
    assert!(!sock_path.exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn read_beyond_one_reply_is_usage_error() {
    let dir = unique_temp_dir("read-cap");
    let sock_path = dir.join("panel.sock");
    let sock = sock_path.to_str().expect("temp path should be utf-8");

    let mut child = spawn_simulator(&sock_path, &["--idle-timeout", "200ms"]);
    drop(
        wait_for_connect(&sock_path, Duration::from_secs(3))
            .expect("client should connect to simulator"),
    );

    let output = hmilink(&["read", sock, "0x0000", "--words", "128", "--timeout", "1s"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("read word count"));

    let _ = child.kill();
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn read_from_missing_socket_is_transport_error() {
    let dir = unique_temp_dir("missing");
    let sock_path = dir.join("absent.sock");
    let output = hmilink(&["read", sock_path.to_str().expect("utf-8 path"), "0x0000"]);
    assert_eq!(output.status.code(), Some(3));
    let _ = std::fs::remove_dir_all(&dir);
}

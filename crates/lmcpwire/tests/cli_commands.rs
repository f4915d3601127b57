#![cfg(all(unix, feature = "cli"))]

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use lmcpwire::frame::{decode_envelope, DEFAULT_MAX_ENVELOPE};

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("ephemeral bind should succeed")
        .local_addr()
        .expect("bound socket has an address")
        .port()
}

fn wait_for_listener(port: u16, timeout: Duration) {
    let start = Instant::now();
    loop {
        if TcpStream::connect(("127.0.0.1", port)).is_ok() {
            return;
        }
        if start.elapsed() >= timeout {
            panic!("listener did not come up on port {port}");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn spawn_listen(port: u16, count: usize) -> Child {
    let child = Command::new(env!("CARGO_BIN_EXE_lmcpwire"))
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("json")
        .arg("listen")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--count")
        .arg(count.to_string())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen command should start");
    wait_for_listener(port, Duration::from_secs(5));
    child
}

#[test]
fn send_is_received_by_listen() {
    let port = free_port();
    let listener = spawn_listen(port, 1);

    let output = Command::new(env!("CARGO_BIN_EXE_lmcpwire"))
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("json")
        .arg("send")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--name")
        .arg("afrl.cmasi.AirVehicleState")
        .arg("--data")
        .arg("hello amase")
        .output()
        .expect("send should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"message_name\":\"afrl.cmasi.AirVehicleState\""));
    assert!(stdout.contains("\"payload_size\":11"));

    let received = listener.wait_with_output().expect("listen should exit");
    assert!(received.status.success());
    let stdout = String::from_utf8_lossy(&received.stdout);
    assert!(stdout.contains("\"message_name\":\"afrl.cmasi.AirVehicleState\""));
    assert!(stdout.contains("\"payload\":\"hello amase\""));
    assert!(stdout.contains("\"format\":\"lmcp\""));
}

#[test]
fn send_to_closed_port_fails() {
    let port = free_port();

    let output = Command::new(env!("CARGO_BIN_EXE_lmcpwire"))
        .arg("--log-level")
        .arg("error")
        .arg("send")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--name")
        .arg("afrl.cmasi.Ping")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("send failed"));
}

#[test]
fn send_rejects_bad_message_name() {
    let output = Command::new(env!("CARGO_BIN_EXE_lmcpwire"))
        .arg("send")
        .arg("--name")
        .arg("afrl|cmasi")
        .output()
        .expect("send should run");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn stream_sends_configuration_then_states() {
    let server = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let port = server.local_addr().expect("local addr").port();

    let reader = thread::spawn(move || {
        let (mut stream, _) = server.accept().expect("stream should connect");
        let mut wire = Vec::new();
        stream.read_to_end(&mut wire).expect("read until sender exits");
        wire
    });

    let output = Command::new(env!("CARGO_BIN_EXE_lmcpwire"))
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("json")
        .arg("stream")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--config-delay")
        .arg("0s")
        .arg("--interval")
        .arg("10ms")
        .arg("--count")
        .arg("3")
        .output()
        .expect("stream should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"sent\":3"));

    let wire = reader.join().expect("reader thread");
    let mut buf = BytesMut::from(wire.as_slice());
    let mut names = Vec::new();
    while let Some(envelope) =
        decode_envelope(&mut buf, DEFAULT_MAX_ENVELOPE).expect("well-formed envelopes")
    {
        names.push(envelope.name.as_str().to_string());
    }

    assert_eq!(
        names,
        [
            "afrl.cmasi.AirVehicleConfiguration",
            "afrl.cmasi.AirVehicleState",
            "afrl.cmasi.AirVehicleState",
            "afrl.cmasi.AirVehicleState",
        ]
    );
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_lmcpwire"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("lmcpwire {}", env!("CARGO_PKG_VERSION")));
}

//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};

/// Start the service binary with the given mode on `addr`, JSON logs on stdout.
pub fn spawn_service(mode: &str, addr: SocketAddr) -> Child {
    spawn_service_at_level(mode, addr, "info")
}

/// Like [`spawn_service`] with `--log-level` set to `level`.
pub fn spawn_service_at_level(mode: &str, addr: SocketAddr, level: &str) -> Child {
    Command::new(env!("CARGO_BIN_EXE_hello-logging"))
        .args([
            "--mode",
            mode,
            "--bind",
            &addr.to_string(),
            "--log-format",
            "json",
            "--log-level",
            level,
        ])
        .env_remove("RUST_LOG")
        .env_remove("K_SERVICE")
        .env_remove("DEPLOYMENT_MODE")
        .env_remove("GOOGLE_CLOUD_PROJECT")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .expect("failed to spawn hello-logging")
}

/// Poll `GET /` until the service answers or the deadline passes.
pub async fn wait_until_ready(client: &reqwest::Client, addr: SocketAddr) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    loop {
        if let Ok(res) = client.get(format!("http://{}/", addr)).send().await {
            if res.status().is_success() {
                return;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "service on {} never became ready",
            addr
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Send a signal (e.g. "INT", "TERM") to the child.
pub fn send_signal(child: &Child, signal: &str) {
    let pid = child.id().expect("child already exited");
    let status = std::process::Command::new("kill")
        .args([format!("-{}", signal), pid.to_string()])
        .status()
        .expect("failed to run kill");
    assert!(status.success(), "kill -{} {} failed", signal, pid);
}

/// Wait for the child to exit, bounded.
pub async fn wait_for_exit(child: Child) -> Output {
    tokio::time::timeout(Duration::from_secs(10), child.wait_with_output())
        .await
        .expect("service did not exit in time")
        .expect("failed to collect service output")
}

/// Stdout parsed as one JSON object per line; non-JSON lines are skipped.
pub fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

//! Shared harness for black-box `sentinelctl` specs: spawns the real
//! binary as a subprocess and asserts on its exit code and output,
//! exactly the way the daemon/engine crates' own `#[cfg(test)]` modules
//! assert on in-process behavior, but from outside the process boundary.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::process::Output;

pub use assert_cmd::Command;

/// A `sentinelctl` invocation, not yet run.
pub fn cli() -> Command {
    Command::cargo_bin("sentinelctl").expect("sentinelctl binary builds")
}

/// The result of running a [`Command`] to completion, asserted against.
pub struct Assert {
    output: Output,
}

impl Assert {
    pub fn success(self) -> Self {
        assert!(
            self.output.status.success(),
            "expected success, got {:?}\nstdout: {}\nstderr: {}",
            self.output.status.code(),
            self.stdout_string(),
            self.stderr_string()
        );
        self
    }

    pub fn failure(self) -> Self {
        assert!(!self.output.status.success(), "expected failure, process exited successfully");
        self
    }

    pub fn code(self, expected: i32) -> Self {
        assert_eq!(self.output.status.code(), Some(expected), "unexpected exit code");
        self
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        let stdout = self.stdout_string();
        assert!(stdout.contains(needle), "stdout did not contain {needle:?}:\n{stdout}");
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        let stderr = self.stderr_string();
        assert!(stderr.contains(needle), "stderr did not contain {needle:?}:\n{stderr}");
        self
    }

    fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }
}

/// Extension trait adding the `passes()`/`fails()` terminal calls the specs
/// chain off of, mirroring `assert_cmd::Command::assert()` but without
/// pulling in the `predicates` crate for simple substring checks.
pub trait CommandExt {
    fn passes(&mut self) -> Assert;
    fn fails(&mut self) -> Assert;
}

impl CommandExt for Command {
    fn passes(&mut self) -> Assert {
        let output = self.output().expect("sentinelctl process runs");
        Assert { output }.success()
    }

    fn fails(&mut self) -> Assert {
        let output = self.output().expect("sentinelctl process runs");
        Assert { output }.failure()
    }
}

/// A throwaway HTTP/1.1 server standing in for `sentineld`'s external
/// interface. Routes are matched on the request path only; each route
/// serves the same canned body to every request.
pub struct FakeDaemon {
    port: u16,
}

impl FakeDaemon {
    /// Binds an ephemeral port and serves `routes` (path -> (status line,
    /// JSON body)) from a background thread until the test process exits.
    pub fn start(routes: Vec<(&'static str, &'static str, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        let port = listener.local_addr().expect("local addr").port();

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut buf = [0u8; 2048];
                let Ok(n) = stream.read(&mut buf) else { continue };
                let request = String::from_utf8_lossy(&buf[..n]);
                let path = request.lines().next().and_then(|line| line.split_whitespace().nth(1)).unwrap_or("/");

                let matched = routes.iter().find(|(route, _, _)| *route == path);
                let (status_line, body) = match matched {
                    Some((_, status, body)) => (*status, body.clone()),
                    None => ("404 Not Found", String::new()),
                };
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        Self { port }
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

/// An address nothing listens on: binds then immediately drops the
/// listener, freeing the port while guaranteeing connection-refused
/// rather than a flaky "maybe something else is there" port guess.
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

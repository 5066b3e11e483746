//! Loopback fake gpsd for integration tests.

#![allow(dead_code)]

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const BANNER: &str = r#"{"class":"VERSION","release":"3.25","rev":"3.25","proto_major":3,"proto_minor":15}"#;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// One scripted server action.
pub enum Step {
    /// Write raw bytes.
    Send(String),
    /// Block until the client sends a command.
    AwaitCommand,
    /// Keep the connection open until the fake is dropped.
    Hold,
}

impl Step {
    /// A newline-terminated line.
    pub fn line(json: &str) -> Self {
        Step::Send(format!("{json}\n"))
    }
}

pub struct FakeGpsd {
    pub addr: String,
    commands: Receiver<String>,
    seen: Arc<Mutex<Vec<String>>>,
    release: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FakeGpsd {
    /// Accept one client, send the banner, then run `steps`.
    ///
    /// After the last step the write half is shut down.
    pub fn start(steps: Vec<Step>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (command_tx, command_rx) = unbounded();
        let (release_tx, release_rx) = unbounded::<()>();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let server_commands = command_rx.clone();
        let server_seen = Arc::clone(&seen);
        let thread = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(format!("{BANNER}\n").as_bytes()).unwrap();

            let reader = stream.try_clone().unwrap();
            thread::spawn(move || read_commands(reader, command_tx));

            for step in steps {
                match step {
                    Step::Send(data) => {
                        if stream.write_all(data.as_bytes()).is_err() {
                            return;
                        }
                    }
                    Step::AwaitCommand => {
                        if let Ok(command) = server_commands.recv_timeout(TIMEOUT) {
                            server_seen.lock().push(command);
                        }
                    }
                    Step::Hold => {
                        let _ = release_rx.recv();
                    }
                }
            }

            let _ = stream.flush();
            let _ = stream.shutdown(Shutdown::Write);
        });

        Self {
            addr,
            commands: command_rx,
            seen,
            release: Some(release_tx),
            thread: Some(thread),
        }
    }

    /// Wait until at least `count` commands have arrived.
    pub fn wait_for_commands(&self, count: usize) -> Vec<String> {
        let deadline = Instant::now() + TIMEOUT;
        loop {
            while let Ok(command) = self.commands.try_recv() {
                self.seen.lock().push(command);
            }
            let seen = self.seen.lock().clone();
            if seen.len() >= count || Instant::now() >= deadline {
                return seen;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for FakeGpsd {
    fn drop(&mut self) {
        self.release.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn read_commands(mut stream: TcpStream, sender: Sender<String>) {
    let mut pending = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                while let Some(end) = pending.iter().position(|&b| b == b';') {
                    let command: Vec<u8> = pending.drain(..=end).collect();
                    let _ = sender.send(String::from_utf8_lossy(&command).into_owned());
                }
            }
        }
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

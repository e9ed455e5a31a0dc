//! Bounded child waits and stream draining.
//!
//! Shared by the sandbox executor and the test harness: both wait on external
//! processes with a hard deadline and collect their output without blocking
//! the waiting thread.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, ExitStatus};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Result of a deadline-bounded wait.
#[derive(Debug)]
pub enum WaitVerdict {
    Completed(ExitStatus),
    TimedOut,
}

/// Poll the child until it exits or the deadline elapses. The child is not
/// killed here; the caller owns the force-kill decision.
pub fn wait_with_deadline(child: &mut Child, timeout: Duration) -> std::io::Result<WaitVerdict> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(WaitVerdict::Completed(status));
        }
        if Instant::now() >= deadline {
            return Ok(WaitVerdict::TimedOut);
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Drain a stream line-by-line on a background thread. Each line is appended
/// with a trailing newline, matching what a line-oriented consumer sees.
pub fn spawn_line_reader<R: Read + Send + 'static>(stream: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        let mut text = String::new();
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    text.push_str(&line);
                    text.push('\n');
                }
                Err(_) => break,
            }
        }
        text
    })
}

/// Join a reader thread, treating a panicked reader as empty output.
pub fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    match handle {
        Some(handle) => handle.join().unwrap_or_default(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    #[test]
    fn completed_wait_returns_status() {
        let mut child = Command::new("true").spawn().unwrap();
        match wait_with_deadline(&mut child, Duration::from_secs(5)).unwrap() {
            WaitVerdict::Completed(status) => assert!(status.success()),
            WaitVerdict::TimedOut => panic!("true(1) should not time out"),
        }
    }

    #[test]
    fn slow_child_times_out() {
        let mut child = Command::new("sleep").arg("10").spawn().unwrap();
        let start = Instant::now();
        match wait_with_deadline(&mut child, Duration::from_millis(100)).unwrap() {
            WaitVerdict::TimedOut => {}
            WaitVerdict::Completed(_) => panic!("sleep should still be running"),
        }
        assert!(start.elapsed() < Duration::from_secs(5));
        let _ = child.kill();
        let _ = child.wait();
    }

    #[test]
    fn line_reader_appends_newlines() {
        let child = Command::new("printf")
            .arg("a\\nb")
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let handle = spawn_line_reader(child.stdout.unwrap());
        assert_eq!(join_reader(Some(handle)), "a\nb\n");
    }
}

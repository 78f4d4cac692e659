//! Keeps log lines from tearing through the bulk progress bar.
//!
//! While a bar is registered, every line the tracing subscriber writes is
//! printed above the bar with [`ProgressBar::println`]; otherwise it goes
//! straight to stderr.

use indicatif::ProgressBar;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

static BULK_PROGRESS_BAR: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn slot() -> MutexGuard<'static, Option<ProgressBar>> {
    // a panic while holding the lock leaves a plain Option behind
    BULK_PROGRESS_BAR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn set_bulk_progress_bar(pb: ProgressBar) {
    *slot() = Some(pb);
}

pub fn clear_bulk_progress_bar() {
    *slot() = None;
}

fn bulk_progress_bar() -> Option<ProgressBar> {
    slot().clone()
}

fn emit(line: &str) -> std::io::Result<()> {
    match bulk_progress_bar() {
        Some(pb) => {
            pb.println(line);
            Ok(())
        }
        None => {
            let mut stderr = std::io::stderr();
            stderr.write_all(line.as_bytes())?;
            stderr.write_all(b"\n")
        }
    }
}

/// Buffers partial writes and emits complete lines.
pub struct ProgressWriter {
    buffer: Vec<u8>,
}

impl ProgressWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }
}

impl Default for ProgressWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line_str = String::from_utf8_lossy(&line);
            emit(line_str.trim_end_matches('\n'))?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            let line_str = String::from_utf8_lossy(&self.buffer).into_owned();
            self.buffer.clear();
            let trimmed = line_str.trim_end();
            if !trimmed.is_empty() {
                emit(trimmed)?;
            }
        }
        Ok(())
    }
}

impl Drop for ProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Hands the tracing subscriber a fresh [`ProgressWriter`] per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressWriterFactory;

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for ProgressWriterFactory {
    type Writer = ProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ProgressWriter::new()
    }
}

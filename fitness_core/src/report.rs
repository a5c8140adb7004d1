//! Reporting collaborators for finished sessions.
//!
//! Completed sessions are handed to a [`SessionReporter`] as in-memory
//! records. Nothing here is read back.

use crate::{CompletedSession, Result};
use std::io::Write;

/// Receives every session the controller finalizes
pub trait SessionReporter {
    fn report(&mut self, session: &CompletedSession) -> Result<()>;
}

/// Collects reported sessions in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    sessions: Vec<CompletedSession>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[CompletedSession] {
        &self.sessions
    }
}

impl SessionReporter for MemoryReporter {
    fn report(&mut self, session: &CompletedSession) -> Result<()> {
        self.sessions.push(session.clone());
        Ok(())
    }
}

/// Writes each session as one JSON line to a writer
pub struct JsonLinesReporter<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesReporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SessionReporter for JsonLinesReporter<W> {
    fn report(&mut self, session: &CompletedSession) -> Result<()> {
        let line = serde_json::to_string(session)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        tracing::debug!("Reported session {}", session.id());
        Ok(())
    }
}

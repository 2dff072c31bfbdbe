use crate::domain::payload::DropinEvent;
use crate::error::Result;
use std::io::Write;

/// Writes events as JSON lines, one `{"event": ..., "detail": ...}` object per line.
pub struct EventWriter<W: Write> {
    writer: W,
}

impl<W: Write> EventWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_event(&mut self, event: &DropinEvent) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Writes every event and flushes the underlying sink.
    pub fn write_events<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a DropinEvent>,
    ) -> Result<()> {
        for event in events {
            self.write_event(event)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

//! Event renderers for stdout

use std::io::{self, Write};
use watcher::{DecodedEvent, Render};

/// Human-readable block per event
pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Render for TextRenderer<W> {
    fn begin_read(&mut self) -> io::Result<()> {
        writeln!(self.out, "Completed one read...")
    }

    fn event(&mut self, event: &DecodedEvent) -> io::Result<()> {
        writeln!(self.out, "Event info:")?;
        writeln!(self.out, "   Watch descriptor.... {}", event.wd)?;
        writeln!(self.out, "   Mask................ {}", event.mask)?;
        writeln!(self.out, "   Cookie.............. {}", event.cookie)?;
        writeln!(self.out, "   Length of name...... {}", event.len)?;
        writeln!(self.out, "   Name................ {}", event.name)?;

        writeln!(self.out, "Event mask includes:")?;
        for label in &event.labels {
            writeln!(self.out, "   - {}", label)?;
        }

        writeln!(self.out)
    }

    fn end_read(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        writeln!(self.out, "Ending program...")?;
        self.out.flush()
    }
}

/// One JSON object per line, nothing else on stdout
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Render for JsonRenderer<W> {
    fn event(&mut self, event: &DecodedEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        writeln!(self.out)
    }

    fn end_read(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

//! Destinations for streamed messages.
//!
//! The runner hands every delta, tool-call and tool-result message to a
//! [`MessageSink`] as soon as it exists. A failing sink is logged and
//! skipped; it never aborts the invocation.

use std::io;
use std::str::FromStr;

use thiserror::Error;
use tokio::sync::mpsc;
use toolweave_core::Message;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Sink serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink closed")]
    Closed,
}

/// Receives messages while an invocation is running.
pub trait MessageSink: Send {
    fn send(&mut self, message: &Message) -> Result<(), SinkError>;
}

impl MessageSink for Vec<Message> {
    fn send(&mut self, message: &Message) -> Result<(), SinkError> {
        self.push(message.clone());
        Ok(())
    }
}

/// Framing used by [`JsonWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriterFormat {
    /// One JSON object per line.
    #[default]
    Raw,
    /// `data: {json}` events separated by a blank line.
    Sse,
}

impl WriterFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriterFormat::Raw => "raw",
            WriterFormat::Sse => "sse",
        }
    }
}

impl std::fmt::Display for WriterFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriterFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(WriterFormat::Raw),
            "sse" => Ok(WriterFormat::Sse),
            other => Err(format!("Unknown writer format: {other} (expected raw or sse)")),
        }
    }
}

/// Writes each message as JSON to an [`io::Write`].
pub struct JsonWriter<W: io::Write> {
    writer: W,
    format: WriterFormat,
}

impl<W: io::Write> JsonWriter<W> {
    pub fn new(writer: W, format: WriterFormat) -> Self {
        Self { writer, format }
    }

    pub fn format(&self) -> WriterFormat {
        self.format
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write + Send> MessageSink for JsonWriter<W> {
    fn send(&mut self, message: &Message) -> Result<(), SinkError> {
        let json = serde_json::to_string(message)?;
        match self.format {
            WriterFormat::Raw => writeln!(self.writer, "{json}")?,
            WriterFormat::Sse => write!(self.writer, "data: {json}\n\n")?,
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Forwards messages into an unbounded tokio channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Message>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx }
    }

    /// A sink together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl MessageSink for ChannelSink {
    fn send(&mut self, message: &Message) -> Result<(), SinkError> {
        self.tx.send(message.clone()).map_err(|_| SinkError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_collects_messages() {
        let mut sink: Vec<Message> = Vec::new();
        sink.send(&Message::assistant("a")).unwrap();
        sink.send(&Message::assistant("b")).unwrap();
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn raw_writer_emits_json_lines() {
        let mut writer = JsonWriter::new(Vec::new(), WriterFormat::Raw);
        writer.send(&Message::assistant("Hi")).unwrap();
        writer.send(&Message::assistant("").finalized()).unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"role":"assistant","content":[{"text":"Hi"}],"final":false}"#,
                r#"{"role":"assistant","content":[{"text":""}],"final":true}"#,
            ]
        );
    }

    #[test]
    fn sse_writer_frames_events() {
        let mut writer = JsonWriter::new(Vec::new(), WriterFormat::Sse);
        writer.send(&Message::assistant("Hi")).unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert!(out.starts_with("data: {"));
        assert!(out.ends_with("}\n\n"));
    }

    #[test]
    fn channel_sink_forwards_until_closed() {
        let (mut sink, mut rx) = ChannelSink::channel();
        sink.send(&Message::assistant("Hi")).unwrap();
        assert_eq!(rx.try_recv().unwrap().text(), "Hi");

        drop(rx);
        assert!(matches!(sink.send(&Message::assistant("x")), Err(SinkError::Closed)));
    }

    #[test]
    fn writer_format_parses() {
        assert_eq!("SSE".parse::<WriterFormat>().unwrap(), WriterFormat::Sse);
        assert_eq!("raw".parse::<WriterFormat>().unwrap(), WriterFormat::Raw);
        assert!("xml".parse::<WriterFormat>().is_err());
    }
}

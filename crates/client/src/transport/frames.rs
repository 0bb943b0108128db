//! Newline-delimited frame parsing for the subscription stream

use crate::error::Result;
use relay_common::ServerEvent;

/// Incremental parser; chunks may split frames anywhere.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every frame it completes. Blank lines are
    /// heartbeats and produce nothing.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<ServerEvent>> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            events.push(ServerEvent::from_frame(text).map_err(Into::into));
        }
        events
    }

    /// Bytes of an incomplete trailing frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_split_across_chunks() {
        let mut parser = FrameParser::new();
        let frame = r#"{"event":"chatUpdated","chat":{"id":"u1-u2","participantIds":["u1","u2"],"messages":[]}}"#;
        let (head, tail) = frame.split_at(20);

        assert!(parser.feed(head.as_bytes()).is_empty());
        assert_eq!(parser.buffered(), 20);

        let events = parser.feed(format!("{}\n", tail).as_bytes());
        assert_eq!(events.len(), 1);
        match events.into_iter().next().unwrap().unwrap() {
            ServerEvent::ChatUpdated { chat } => assert_eq!(chat.id, "u1-u2"),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn test_heartbeats_and_bad_frames() {
        let mut parser = FrameParser::new();
        let events = parser.feed(b"\n\r\nnot json\n{\"event\":\"state\",\"users\":[],\"chats\":[]}\n");
        assert_eq!(events.len(), 2);
        assert!(events[0].is_err());
        assert!(matches!(events[1], Ok(ServerEvent::State(_))));
    }
}

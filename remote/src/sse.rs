/// One parsed server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type; `message` when the stream does not name one.
    pub event: String,
    /// Data payload; multi-line `data:` fields are joined with newlines.
    pub data: String,
}

/// Incremental parser for a `text/event-stream` body.
///
/// Feed raw chunks as they arrive; complete events come back at each
/// blank-line boundary. Comment lines and unknown fields are skipped, and an
/// event without any `data:` line is discarded, per the event-stream format.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    event: String,
    data: Vec<String>,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return every event completed by it.
    pub fn push(&mut self, chunk: &str) -> Vec<SseEvent> {
        self.buffer.push_str(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\r', '\n']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    let event = if self.event.is_empty() {
                        "message".to_string()
                    } else {
                        std::mem::take(&mut self.event)
                    };
                    events.push(SseEvent {
                        event,
                        data: self.data.join("\n"),
                    });
                }
                self.event.clear();
                self.data.clear();
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = value.to_string(),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut parser = SseParser::new();
        let events = parser.push("event: put\ndata: {\"path\":\"/\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "put");
        assert_eq!(events[0].data, "{\"path\":\"/\"}");
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.push("event: pu").is_empty());
        assert!(parser.push("t\ndata: null\n").is_empty());
        let events = parser.push("\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "put");
        assert_eq!(events[0].data, "null");
    }

    #[test]
    fn test_multi_line_data_joined_with_newlines() {
        let mut parser = SseParser::new();
        let events = parser.push("data: first\ndata: second\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "first\nsecond");
    }

    #[test]
    fn test_default_event_type_is_message() {
        let mut parser = SseParser::new();
        let events = parser.push("data: hello\n\n");
        assert_eq!(events[0].event, "message");
    }

    #[test]
    fn test_comment_lines_are_skipped() {
        let mut parser = SseParser::new();
        let events = parser.push(": keep-alive comment\n\nevent: put\ndata: null\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "put");
    }

    #[test]
    fn test_event_without_data_is_discarded() {
        let mut parser = SseParser::new();
        assert!(parser.push("event: lonely\n\n").is_empty());
        // The discarded type must not leak into the next event.
        let events = parser.push("data: x\n\n");
        assert_eq!(events[0].event, "message");
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut parser = SseParser::new();
        let events = parser.push("event: put\r\ndata: null\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "put");
        assert_eq!(events[0].data, "null");
    }

    #[test]
    fn test_two_events_in_one_chunk() {
        let mut parser = SseParser::new();
        let events = parser.push("event: put\ndata: a\n\nevent: patch\ndata: b\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "put");
        assert_eq!(events[1].event, "patch");
    }
}

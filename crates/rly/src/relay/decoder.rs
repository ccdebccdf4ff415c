//! Incremental decoder for upstream SSE bytes.

use tracing::warn;

use super::events::UpstreamEvent;

/// One decoded upstream frame.
#[derive(Debug, Clone)]
pub enum StreamFrame {
    Event(UpstreamEvent),
    /// The literal `[DONE]` end-of-stream marker.
    Done,
}

/// Accumulates network chunks and yields complete frames.
///
/// Chunk boundaries carry no alignment guarantee: a delivery may end in the
/// middle of a payload or inside a multi-byte UTF-8 sequence, so buffering
/// is byte-level and lines are only decoded once their newline has arrived.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every frame it completed. After the
    /// `[DONE]` marker the rest of the chunk is discarded and the decoder
    /// stays exhausted.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        if self.done {
            return Vec::new();
        }

        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let mut line = &line[..line.len() - 1];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }

            match self.decode_line(&String::from_utf8_lossy(line)) {
                Some(StreamFrame::Done) => {
                    self.done = true;
                    self.buffer.clear();
                    frames.push(StreamFrame::Done);
                    break;
                }
                Some(frame) => frames.push(frame),
                None => {}
            }
        }

        frames
    }

    /// Decode one complete line. Non-data lines (blank separators, `event:`
    /// fields, comments) produce nothing; malformed payloads are logged and
    /// dropped so the stream keeps flowing.
    fn decode_line(&self, line: &str) -> Option<StreamFrame> {
        let payload = line.strip_prefix("data: ")?;
        if payload == "[DONE]" {
            return Some(StreamFrame::Done);
        }

        match serde_json::from_str::<UpstreamEvent>(payload) {
            Ok(event) => Some(StreamFrame::Event(event)),
            Err(err) => {
                warn!("Skipping malformed stream payload: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &[u8] = b"event: message_start\n\
data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" world\"}}\n\n\
data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":7}}\n\n\
data: {\"type\":\"message_stop\"}\n\n\
data: [DONE]\n\n";

    fn kinds(frames: &[StreamFrame]) -> Vec<String> {
        frames
            .iter()
            .map(|f| match f {
                StreamFrame::Done => "done".to_string(),
                StreamFrame::Event(e) => format!("{e:?}"),
            })
            .collect()
    }

    fn decode_in_chunks(input: &[u8], chunk_size: usize) -> Vec<StreamFrame> {
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for chunk in input.chunks(chunk_size.max(1)) {
            frames.extend(decoder.feed(chunk));
        }
        frames
    }

    #[test]
    fn test_decodes_whole_stream() {
        let frames = decode_in_chunks(STREAM, STREAM.len());
        assert_eq!(frames.len(), 6);
        assert!(matches!(frames[0], StreamFrame::Event(UpstreamEvent::MessageStart)));
        assert!(matches!(frames[4], StreamFrame::Event(UpstreamEvent::MessageStop)));
        assert!(matches!(frames[5], StreamFrame::Done));
    }

    #[test]
    fn test_fragmentation_invariance() {
        // Every chunk size, down to byte-at-a-time delivery, must produce
        // the identical frame sequence.
        let reference = kinds(&decode_in_chunks(STREAM, STREAM.len()));
        for chunk_size in 1..=STREAM.len() {
            let frames = kinds(&decode_in_chunks(STREAM, chunk_size));
            assert_eq!(frames, reference, "chunk_size {chunk_size}");
        }
    }

    #[test]
    fn test_split_inside_multibyte_char() {
        let input = "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"caf\u{e9}\"}}\n".as_bytes();
        // Split at every byte offset, including mid-UTF-8.
        for split in 0..input.len() {
            let mut decoder = FrameDecoder::new();
            let mut frames = decoder.feed(&input[..split]);
            frames.extend(decoder.feed(&input[split..]));
            assert_eq!(frames.len(), 1, "split {split}");
            match &frames[0] {
                StreamFrame::Event(UpstreamEvent::ContentBlockDelta { delta }) => {
                    assert_eq!(delta.as_ref().unwrap().text.as_deref(), Some("caf\u{e9}"));
                }
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    #[test]
    fn test_malformed_payload_does_not_stop_stream() {
        let input = b"data: {not json}\n\
data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"ok\"}}\n";
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(input);
        assert_eq!(frames.len(), 1);
        assert!(matches!(
            frames[0],
            StreamFrame::Event(UpstreamEvent::ContentBlockDelta { .. })
        ));
    }

    #[test]
    fn test_done_short_circuits_rest_of_chunk() {
        let input = b"data: [DONE]\n\
data: {\"type\":\"message_stop\"}\n";
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(input);
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], StreamFrame::Done));

        // Later chunks are ignored too.
        assert!(decoder.feed(b"data: {\"type\":\"message_stop\"}\n").is_empty());
    }

    #[test]
    fn test_incomplete_line_is_retained() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":\"mess").is_empty());
        let frames = decoder.feed(b"age_stop\"}\n");
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], StreamFrame::Event(UpstreamEvent::MessageStop)));
    }

    #[test]
    fn test_crlf_lines_decode() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"data: {\"type\":\"message_stop\"}\r\n");
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], StreamFrame::Event(UpstreamEvent::MessageStop)));
    }

    #[test]
    fn test_non_data_lines_are_skipped() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"event: ping\n: comment\n\ndata: {\"type\":\"ping\"}\n");
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], StreamFrame::Event(UpstreamEvent::Ignored)));
    }
}

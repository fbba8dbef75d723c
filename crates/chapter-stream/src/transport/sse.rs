//! Server-sent-events framing for the generation stream.
//!
//! Only `data:` lines matter here; the backend sends one JSON event per
//! frame and does not use named events or ids.

/// Splits a byte stream into the `data` payloads of complete frames.
///
/// Bytes stay buffered until a blank line closes the frame, so a frame cut
/// across network chunks (even inside a UTF-8 sequence) decodes intact.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    /// Feeds one network chunk and returns the payloads it completed.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some((end, delimiter)) = frame_end(&self.buf) {
            let frame: Vec<u8> = self.buf.drain(..end + delimiter).collect();
            payloads.extend(frame_data(&frame[..end]));
        }
        payloads
    }

    /// Payload of a trailing frame the server closed without a blank line.
    pub fn finish(&mut self) -> Option<String> {
        frame_data(&std::mem::take(&mut self.buf))
    }
}

/// Offset and length of the first frame delimiter in `buf`.
fn frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|at| (at, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|at| (at, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Joins the `data:` lines of one frame; `None` for comment-only frames.
fn frame_data(frame: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(frame);
    let lines: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_split_across_chunks_is_reassembled() {
        let mut decoder = SseDecoder::default();
        assert!(
            decoder
                .push_chunk(b"event: message\ndata: {\"type\":\"CONTENT\",\"content_chunk\":\"hel")
                .is_empty()
        );
        let payloads = decoder.push_chunk(b"lo\"}\n\n");
        assert_eq!(
            payloads,
            vec![r#"{"type":"CONTENT","content_chunk":"hello"}"#.to_string()]
        );
    }

    #[test]
    fn multibyte_text_split_mid_character_survives() {
        let payload = "data: {\"type\":\"CONTENT\",\"content_chunk\":\"风雨\"}\n\n".as_bytes();
        let split = payload
            .iter()
            .position(|b| *b >= 0x80)
            .expect("multibyte")
            + 1;
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(&payload[..split]).is_empty());
        let payloads = decoder.push_chunk(&payload[split..]);
        assert!(payloads[0].contains("风雨"));
    }

    #[test]
    fn crlf_frames_and_comments() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.push_chunk(
            b": keep-alive\r\n\r\ndata: {\"type\":\"PROGRESS\",\"progress\":0.5}\r\n\r\n",
        );
        assert_eq!(payloads, vec![r#"{"type":"PROGRESS","progress":0.5}"#.to_string()]);
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.push_chunk(b"data: {\"type\":\ndata: \"COMPLETE\"}\n\n");
        assert_eq!(payloads, vec!["{\"type\":\n\"COMPLETE\"}".to_string()]);
    }

    #[test]
    fn finish_flushes_unterminated_frame() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("[DONE]"));
        assert!(decoder.finish().is_none());
    }
}

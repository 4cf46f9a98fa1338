use tracing::{debug, trace, warn};

use crate::codec::MAX_PACKET_SIZE;
use crate::slip;

/// Where the assembler is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// No partial frame is buffered.
    Idle,
    /// Bytes have been collected since the last delimiter.
    Accumulating,
    /// The previous byte was an escape; the next one is translated.
    EscapePending,
}

/// Cumulative receive-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    /// Completed frame bodies handed to the sink.
    pub frames: u64,
    /// Escape sequences with an unknown continuation byte.
    pub unknown_escapes: u64,
    /// Bytes dropped because the buffer was full.
    pub overflowed_bytes: u64,
}

/// Fixed-capacity byte buffer; never grows after construction.
struct RxBuffer {
    data: Box<[u8]>,
    len: usize,
}

impl RxBuffer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Returns `false` when the buffer is full and `byte` was not stored.
    fn push(&mut self, byte: u8) -> bool {
        match self.data.get_mut(self.len) {
            Some(slot) => {
                *slot = byte;
                self.len += 1;
                true
            }
            None => false,
        }
    }

    fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    fn reset(&mut self) {
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

/// Stateful SLIP de-framer for one connection.
///
/// Bytes may be fed in any fragmentation; state carries over between calls,
/// so a frame can span any number of [`feed`](Self::feed) invocations. Not
/// safe for concurrent feeding: callers that receive from more than one
/// context must serialize access (the link keeps it behind a mutex).
pub struct ReceiveAssembler {
    buf: RxBuffer,
    escape_pending: bool,
    overflowed: bool,
    stats: AssemblerStats,
}

impl ReceiveAssembler {
    /// Create an assembler sized for the largest wire frame.
    pub fn new() -> Self {
        Self::with_capacity(MAX_PACKET_SIZE)
    }

    /// Create an assembler with an explicit buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: RxBuffer::with_capacity(capacity),
            escape_pending: false,
            overflowed: false,
            stats: AssemblerStats::default(),
        }
    }

    /// Consume raw received bytes, calling `on_frame` with each completed
    /// (unescaped, still checksummed) body.
    ///
    /// Returns the number of input bytes consumed, which is always all of
    /// them: bytes that do not fit the buffer are dropped, not deferred.
    pub fn feed<F>(&mut self, data: &[u8], mut on_frame: F) -> usize
    where
        F: FnMut(&[u8]),
    {
        trace!(len = data.len(), "receive");

        for &byte in data {
            if self.escape_pending {
                self.escape_pending = false;
                match slip::unescape(byte) {
                    Some(unescaped) => self.append(unescaped),
                    None => {
                        self.stats.unknown_escapes += 1;
                        warn!(
                            byte = format_args!("{byte:#04x}"),
                            "ignoring unknown escape sequence"
                        );
                    }
                }
                continue;
            }

            match byte {
                slip::ESC => self.escape_pending = true,
                slip::END => self.finish_frame(&mut on_frame),
                other => self.append(other),
            }
        }

        data.len()
    }

    /// Current position within the frame being assembled.
    pub fn state(&self) -> AssemblerState {
        if self.escape_pending {
            AssemblerState::EscapePending
        } else if self.buf.is_empty() && !self.overflowed {
            AssemblerState::Idle
        } else {
            AssemblerState::Accumulating
        }
    }

    /// Bytes of the current partial frame held in the buffer.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Fixed buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Counters accumulated since construction.
    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    /// Drop any partial frame and return to [`AssemblerState::Idle`].
    pub fn reset(&mut self) {
        self.buf.reset();
        self.escape_pending = false;
        self.overflowed = false;
    }

    fn append(&mut self, byte: u8) {
        if self.buf.push(byte) {
            return;
        }
        if !self.overflowed {
            warn!(
                capacity = self.buf.capacity(),
                "receive buffer full, dropping bytes"
            );
            self.overflowed = true;
        }
        self.stats.overflowed_bytes += 1;
    }

    fn finish_frame<F>(&mut self, on_frame: &mut F)
    where
        F: FnMut(&[u8]),
    {
        if self.overflowed {
            debug!(
                kept = self.buf.len(),
                "discarding frame that overflowed the receive buffer"
            );
        } else if self.buf.is_empty() {
            return;
        } else {
            self.stats.frames += 1;
            on_frame(self.buf.as_slice());
        }
        self.buf.reset();
        self.overflowed = false;
    }
}

impl Default for ReceiveAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReceiveAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiveAssembler")
            .field("state", &self.state())
            .field("buffered", &self.buf.len())
            .field("capacity", &self.buf.capacity())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use proptest::prelude::*;

    use super::*;
    use crate::codec::{decode_frame, encode_frame, Frame, MAX_PAYLOAD};
    use crate::slip::{END, ESC, ESC_END, ESC_ESC};

    fn collect(assembler: &mut ReceiveAssembler, data: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let consumed = assembler.feed(data, |body| frames.push(body.to_vec()));
        assert_eq!(consumed, data.len());
        frames
    }

    fn collect_chunked(data: &[u8], chunk: usize) -> Vec<Vec<u8>> {
        let mut assembler = ReceiveAssembler::new();
        let mut frames = Vec::new();
        for piece in data.chunks(chunk.max(1)) {
            frames.extend(collect(&mut assembler, piece));
        }
        frames
    }

    fn wire(frames: &[Frame]) -> BytesMut {
        let mut out = BytesMut::new();
        for frame in frames {
            encode_frame(frame.dst_id, frame.msg_id, &frame.payload, &mut out).unwrap();
        }
        out
    }

    #[test]
    fn single_frame() {
        let mut assembler = ReceiveAssembler::new();
        let frames = collect(&mut assembler, &[END, 0x01, 0x02, 0x03, END]);
        assert_eq!(frames, vec![vec![0x01, 0x02, 0x03]]);
        assert_eq!(assembler.state(), AssemblerState::Idle);
        assert_eq!(assembler.stats().frames, 1);
    }

    #[test]
    fn delimiters_alone_are_ignored() {
        let mut assembler = ReceiveAssembler::new();
        assert!(collect(&mut assembler, &[END, END, END]).is_empty());
        assert_eq!(assembler.state(), AssemblerState::Idle);

        let frames = collect(&mut assembler, &[END, END, 0x42, END, END]);
        assert_eq!(frames, vec![vec![0x42]]);
    }

    #[test]
    fn missing_leading_delimiter_still_frames() {
        let mut assembler = ReceiveAssembler::new();
        let frames = collect(&mut assembler, &[0x10, 0x20, END]);
        assert_eq!(frames, vec![vec![0x10, 0x20]]);
    }

    #[test]
    fn escapes_are_translated() {
        let mut assembler = ReceiveAssembler::new();
        let frames = collect(
            &mut assembler,
            &[END, 0x01, ESC, ESC_END, ESC, ESC_ESC, 0x02, END],
        );
        assert_eq!(frames, vec![vec![0x01, END, ESC, 0x02]]);
    }

    #[test]
    fn escape_split_across_feeds() {
        let mut assembler = ReceiveAssembler::new();
        assert!(collect(&mut assembler, &[END, 0x01, ESC]).is_empty());
        assert_eq!(assembler.state(), AssemblerState::EscapePending);
        assert_eq!(assembler.buffered_len(), 1);

        assert!(collect(&mut assembler, &[ESC_END]).is_empty());
        assert_eq!(assembler.state(), AssemblerState::Accumulating);

        let frames = collect(&mut assembler, &[END]);
        assert_eq!(frames, vec![vec![0x01, END]]);
    }

    #[test]
    fn unknown_escape_drops_only_that_byte() {
        let mut assembler = ReceiveAssembler::new();
        let frames = collect(&mut assembler, &[END, 0x01, ESC, 0x55, 0x02, END]);
        assert_eq!(frames, vec![vec![0x01, 0x02]]);
        assert_eq!(assembler.stats().unknown_escapes, 1);
    }

    #[test]
    fn escaped_delimiter_is_swallowed_as_unknown_escape() {
        let mut assembler = ReceiveAssembler::new();
        let frames = collect(&mut assembler, &[END, 0x01, ESC, END, 0x02, END]);
        assert_eq!(frames, vec![vec![0x01, 0x02]]);
        assert_eq!(assembler.stats().unknown_escapes, 1);
    }

    #[test]
    fn overflow_drops_excess_and_discards_frame() {
        let mut assembler = ReceiveAssembler::with_capacity(4);
        let frames = collect(&mut assembler, &[END, 1, 2, 3, 4, 5, 6]);
        assert!(frames.is_empty());
        assert_eq!(assembler.buffered_len(), 4);
        assert_eq!(assembler.stats().overflowed_bytes, 2);

        assert!(collect(&mut assembler, &[END]).is_empty());
        assert_eq!(assembler.state(), AssemblerState::Idle);

        let frames = collect(&mut assembler, &[7, 8, END]);
        assert_eq!(frames, vec![vec![7, 8]]);
    }

    #[test]
    fn full_but_not_overflowed_frame_is_delivered() {
        let mut assembler = ReceiveAssembler::with_capacity(3);
        let frames = collect(&mut assembler, &[END, 1, 2, 3, END]);
        assert_eq!(frames, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn reset_clears_partial_state() {
        let mut assembler = ReceiveAssembler::new();
        collect(&mut assembler, &[END, 0x01, 0x02, ESC]);
        assembler.reset();
        assert_eq!(assembler.state(), AssemblerState::Idle);
        assert_eq!(assembler.buffered_len(), 0);

        let frames = collect(&mut assembler, &[ESC_END, END]);
        assert_eq!(frames, vec![vec![ESC_END]]);
    }

    #[test]
    fn largest_fully_escaped_frame_fits() {
        let payload = vec![END; MAX_PAYLOAD];
        let stream = wire(&[Frame::new(0xC0, 0xDB, payload.clone())]);
        assert!(stream.len() <= MAX_PACKET_SIZE);

        let frames = collect_chunked(&stream, stream.len());
        assert_eq!(frames.len(), 1);
        let frame = decode_frame(&frames[0]).unwrap();
        assert_eq!(frame.payload.as_ref(), payload.as_slice());
    }

    fn frame_strategy() -> impl Strategy<Value = Frame> {
        (
            any::<u8>(),
            any::<u8>(),
            proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD),
        )
            .prop_map(|(dst, msg, payload)| Frame::new(dst, msg, payload))
    }

    fn short_frame_strategy() -> impl Strategy<Value = Frame> {
        (
            any::<u8>(),
            any::<u8>(),
            proptest::collection::vec(any::<u8>(), 0..48),
        )
            .prop_map(|(dst, msg, payload)| Frame::new(dst, msg, payload))
    }

    proptest! {
        #[test]
        fn roundtrip_any_chunking(frame in frame_strategy(), chunk in 1usize..64) {
            let stream = wire(std::slice::from_ref(&frame));
            let bodies = collect_chunked(&stream, chunk);
            prop_assert_eq!(bodies.len(), 1);
            prop_assert_eq!(decode_frame(&bodies[0]).unwrap(), frame);
        }

        #[test]
        fn roundtrip_byte_at_a_time(frames in proptest::collection::vec(frame_strategy(), 1..4)) {
            let stream = wire(&frames);
            let decoded: Vec<Frame> = collect_chunked(&stream, 1)
                .iter()
                .map(|body| decode_frame(body).unwrap())
                .collect();
            prop_assert_eq!(decoded, frames);
        }

        #[test]
        fn split_position_does_not_matter(frames in proptest::collection::vec(short_frame_strategy(), 1..4)) {
            let stream = wire(&frames);
            let whole = collect_chunked(&stream, stream.len());

            for split in 0..=stream.len() {
                let mut assembler = ReceiveAssembler::new();
                let mut bodies = collect(&mut assembler, &stream[..split]);
                bodies.extend(collect(&mut assembler, &stream[split..]));
                prop_assert_eq!(&bodies, &whole);
            }
        }

        #[test]
        fn single_bit_flip_fails_validation(
            frame in frame_strategy(),
            bit in any::<proptest::sample::Index>(),
        ) {
            let stream = wire(std::slice::from_ref(&frame));
            let mut body = collect_chunked(&stream, stream.len()).remove(0);

            let bit = bit.index(body.len() * 8);
            body[bit / 8] ^= 1 << (bit % 8);
            prop_assert!(decode_frame(&body).is_err());
        }
    }
}

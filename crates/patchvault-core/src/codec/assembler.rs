//! Reassembly of sysex frames split across transport messages

use crate::errors::{PatchVaultError, Result};
use crate::midi::{MidiMessage, SYSEX_END, SYSEX_START};

/// Default cap for one buffered frame
pub const DEFAULT_MAX_BUFFERED_BYTES: usize = 64 * 1024;

#[derive(Debug)]
enum State {
    Idle,
    Collecting(Vec<u8>),
    /// Frame overflowed; drop bytes until it ends
    Discarding,
}

/// Incremental `F0 ... F7` frame assembler
///
/// Bytes outside a frame are ignored, as are real-time bytes (`F8`..`FF`)
/// interleaved inside one.
#[derive(Debug)]
pub struct SysexAssembler {
    limit: usize,
    state: State,
}

impl SysexAssembler {
    pub fn new(max_buffered_bytes: usize) -> Self {
        Self {
            limit: max_buffered_bytes,
            state: State::Idle,
        }
    }

    /// Feed a chunk and collect every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<MidiMessage>> {
        let mut frames = Vec::new();
        for &byte in chunk {
            if byte >= 0xF8 {
                continue;
            }
            if byte == SYSEX_START {
                if let State::Collecting(buffer) = &self.state {
                    frames.push(Err(PatchVaultError::IncompleteFrame {
                        buffered: buffer.len(),
                    }));
                }
                self.state = State::Collecting(vec![SYSEX_START]);
                continue;
            }
            match &mut self.state {
                State::Idle => {}
                State::Discarding => {
                    if byte == SYSEX_END {
                        self.state = State::Idle;
                    }
                }
                State::Collecting(buffer) => {
                    buffer.push(byte);
                    if byte == SYSEX_END {
                        let frame = std::mem::take(buffer);
                        self.state = State::Idle;
                        frames.push(Ok(MidiMessage::new(frame)));
                    } else if buffer.len() > self.limit {
                        self.state = State::Discarding;
                        frames.push(Err(PatchVaultError::BufferLimitExceeded {
                            limit: self.limit,
                        }));
                    }
                }
            }
        }
        frames
    }

    /// Number of bytes of an unfinished frame, if one is open
    pub fn pending_len(&self) -> Option<usize> {
        match &self.state {
            State::Collecting(buffer) => Some(buffer.len()),
            _ => None,
        }
    }
}

/// Split a byte stream (e.g. the contents of a `.syx` file) into frames
pub fn split_frames(bytes: &[u8], max_buffered_bytes: usize) -> Vec<Result<MidiMessage>> {
    let mut assembler = SysexAssembler::new(max_buffered_bytes);
    let mut frames = assembler.push(bytes);
    if let Some(buffered) = assembler.pending_len() {
        frames.push(Err(PatchVaultError::IncompleteFrame { buffered }));
    }
    frames
}

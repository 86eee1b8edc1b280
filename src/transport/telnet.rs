//! Telnet option filter
//!
//! The controller's shell may open with telnet option negotiation. We run the
//! session in plain line mode, so every offered option is refused and all IAC
//! sequences are removed from the data stream.

use bytes::BytesMut;

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterState {
    Data,
    Iac,
    Negotiate(u8),
    Sub,
    SubIac,
}

/// Streaming IAC stripper
///
/// State is kept across calls, so sequences split between reads are handled.
#[derive(Debug)]
pub struct TelnetFilter {
    state: FilterState,
}

impl Default for TelnetFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self {
            state: FilterState::Data,
        }
    }

    /// Forget any partial sequence (new session)
    pub fn reset(&mut self) {
        self.state = FilterState::Data;
    }

    /// Filter `input`, appending payload bytes to `data` and refusals to `replies`
    pub fn feed(&mut self, input: &[u8], data: &mut BytesMut, replies: &mut Vec<u8>) {
        for &byte in input {
            self.state = match self.state {
                FilterState::Data => match byte {
                    IAC => FilterState::Iac,
                    0 => FilterState::Data,
                    _ => {
                        data.extend_from_slice(&[byte]);
                        FilterState::Data
                    }
                },
                FilterState::Iac => match byte {
                    IAC => {
                        data.extend_from_slice(&[IAC]);
                        FilterState::Data
                    }
                    DO | DONT | WILL | WONT => FilterState::Negotiate(byte),
                    SB => FilterState::Sub,
                    _ => FilterState::Data,
                },
                FilterState::Negotiate(verb) => {
                    match verb {
                        DO => replies.extend_from_slice(&[IAC, WONT, byte]),
                        WILL => replies.extend_from_slice(&[IAC, DONT, byte]),
                        _ => {}
                    }
                    tracing::trace!("refused telnet option {} ({})", byte, verb);
                    FilterState::Data
                }
                FilterState::Sub => match byte {
                    IAC => FilterState::SubIac,
                    _ => FilterState::Sub,
                },
                FilterState::SubIac => match byte {
                    SE => FilterState::Data,
                    _ => FilterState::Sub,
                },
            };
        }
    }
}

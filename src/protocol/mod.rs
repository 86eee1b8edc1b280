//! Protocol Module
//!
//! Defines the controller's line protocol.
//!
//! ## Commands
//! - `query <id> o|m|h|f` - power, mode code, setpoint, fan level
//! - `on <id>` / `off <id>` - power
//! - `cool|heat|auto|dry|fan <id>` - operating mode
//! - `temp <id> <value>` - setpoint
//! - `fspeed <id> l|m|h|a|t` - fan speed
//! - `ls2 <id>` - full state line
//!
//! ## Responses
//! Every response ends with the shell prompt. Only the first line carries
//! meaning: a number for queries, `OK` for set commands, a state line for
//! `ls2`, or an `ERROR ...` line when the controller refuses the command.

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType, FanCode, QueryField};
pub use response::{DeviceStateRecord, FanMode, OnOff, OperatingMode};
pub use codec::{
    check_rejection, decode_ack, decode_command, decode_scalar, decode_state, encode_command,
    encode_state, first_line, format_temperature, parse_temperature, LINE_TERMINATOR,
    STATE_FIELD_COUNT, TEMPERATURE_WIDTH,
};

pub mod command_stream;
pub mod error;

pub use command_stream::{capture_command, is_tool_installed};
pub use error::{CommandError, Result, VmError};

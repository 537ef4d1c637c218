use crate::Frame;

/// Represents an "unknown" command. This is not a real command; it exists
/// so an unrecognized command name still gets a well-formed error reply
/// instead of closing the connection.
#[derive(Debug)]
pub(crate) struct Unknown {
    command_name: String,
}

impl Unknown {
    pub(crate) fn new(key: impl ToString) -> Unknown {
        Unknown { command_name: key.to_string() }
    }

    pub(crate) fn get_name(&self) -> &str {
        &self.command_name
    }

    pub(crate) fn apply(&self) -> Frame {
        Frame::Error(format!("ERR unknown command '{}'", self.command_name))
    }
}

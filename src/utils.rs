use crate::Frame;

pub(crate) fn resp_invalid_arguments() -> Frame {
    Frame::Error("SYNTAX invalid number of arguments".to_string())
}
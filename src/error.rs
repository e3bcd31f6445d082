use thiserror::Error;

/// Errors reported synchronously to the (non-realtime) caller.
///
/// The render path never returns these; it falls back to silence instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SynthError {
    #[error("wavetable length {0} is not a power of two in 2^15..=2^20")]
    InvalidTableLength(usize),

    #[error("morph breakpoints {points:?} must be non-decreasing and below {len}")]
    InvalidBreakpoints { points: [usize; 6], len: usize },

    #[error("program {0} does not exist")]
    NoSuchProgram(usize),

    #[error("message queue is full")]
    QueueFull,
}

pub type Result<T> = std::result::Result<T, SynthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let errors = [
            SynthError::InvalidTableLength(1000),
            SynthError::InvalidBreakpoints {
                points: [0, 1, 2, 3, 4, 9],
                len: 8,
            },
            SynthError::NoSuchProgram(7),
            SynthError::QueueFull,
        ];
        for error in errors {
            let message = error.to_string();
            match error {
                SynthError::InvalidTableLength(len) => assert!(message.contains(&len.to_string())),
                SynthError::InvalidBreakpoints { len, .. } => {
                    assert!(message.contains(&len.to_string()))
                }
                SynthError::NoSuchProgram(program) => {
                    assert!(message.contains(&program.to_string()))
                }
                SynthError::QueueFull => assert!(message.contains("full")),
            }
        }
    }
}

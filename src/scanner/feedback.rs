//! Scan acknowledgment: a short tone and, where a device supports it, a
//! vibration. Both are best effort; a failure is logged and forgotten.

use std::io::stdout;

use crossterm::execute;
use crossterm::style::Print;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("{0} is not supported here")]
    Unsupported(&'static str),
    #[error("feedback output failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Side channels used to acknowledge a scan.
pub trait Feedback {
    /// Play the acknowledgment tone.
    fn tone(&self) -> Result<(), FeedbackError>;

    /// Pulse the device's haptics.
    fn vibrate(&self) -> Result<(), FeedbackError> {
        Err(FeedbackError::Unsupported("vibration"))
    }
}

/// Rings the terminal bell.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl Feedback for TerminalBell {
    fn tone(&self) -> Result<(), FeedbackError> {
        execute!(stdout(), Print('\x07'))?;
        Ok(())
    }
}

/// No acknowledgment at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Feedback for Silent {
    fn tone(&self) -> Result<(), FeedbackError> {
        Ok(())
    }

    fn vibrate(&self) -> Result<(), FeedbackError> {
        Ok(())
    }
}

/// Run both side channels, swallowing failures.
pub fn acknowledge(feedback: &dyn Feedback) {
    if let Err(err) = feedback.tone() {
        debug!(%err, "scan tone unavailable");
    }
    if let Err(err) = feedback.vibrate() {
        debug!(%err, "scan vibration unavailable");
    }
}

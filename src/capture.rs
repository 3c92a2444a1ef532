//! Exclusive keyboard capture toggled on console show/hide.
//!
//! While capture is held the host application stops receiving its normal key
//! input; releasing restores the host's input path. Failures are reported to
//! the caller and never abort a state transition (fail-open so a broken hook
//! cannot soft-lock the host).

use anyhow::{Context, Result};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Scoped capability over the OS input layer. Acquire on show, release on
/// hide; repeat calls on the same edge are no-ops.
pub trait InputCapture: Send {
    fn acquire(&mut self) -> Result<()>;
    fn release(&mut self) -> Result<()>;
}

/// Terminal raw-mode capture for hosts that read input through a terminal.
#[derive(Debug, Default)]
pub struct RawModeCapture {
    active: bool,
}

impl RawModeCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl InputCapture for RawModeCapture {
    fn acquire(&mut self) -> Result<()> {
        if self.active {
            return Ok(());
        }
        enable_raw_mode().context("registering exclusive keyboard capture")?;
        self.active = true;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        disable_raw_mode().context("unregistering exclusive keyboard capture")?;
        self.active = false;
        Ok(())
    }
}

/// Capture stand-in for headless hosts and tests.
#[derive(Debug, Default)]
pub struct NoopCapture;

impl InputCapture for NoopCapture {
    fn acquire(&mut self) -> Result<()> {
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

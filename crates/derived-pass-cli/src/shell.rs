//! Pass state for one invocation: whether the wallet holds the derived pass,
//! whether the requested action completed, and the message it failed with.
//!
//! Each invocation performs at most one action and never retries it.

use std::io::{self, Write};

use derived_pass_client::{user_message, DerivedPassResult};
use serde::Serialize;
use termcolor::{Color, WriteColor};

use crate::output::{self, Reported};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassStatus {
    pub pass_held: bool,
    pub done: bool,
    pub error: Option<String>,
}

impl PassStatus {
    pub fn new(pass_held: bool) -> Self {
        Self { pass_held, ..Self::default() }
    }

    /// Record the outcome of the action. A successful action that grants the
    /// pass marks it held.
    pub fn record<T>(&mut self, outcome: &DerivedPassResult<T>, grants_pass: bool) {
        match outcome {
            Ok(_) => {
                self.done = true;
                self.pass_held |= grants_pass;
                self.error = None;
            }
            Err(err) => {
                self.done = false;
                self.error = Some(user_message(err));
            }
        }
    }

    /// Refuse the action without submitting anything.
    pub fn refuse(&mut self, message: impl Into<String>) {
        self.done = false;
        self.error = Some(message.into());
    }

    /// Exit status for the recorded outcome, once it has been printed.
    pub fn settle(&self) -> anyhow::Result<()> {
        match &self.error {
            Some(message) => Err(Reported(message.clone()).into()),
            None => Ok(()),
        }
    }

    pub fn render(&self, out: &mut dyn WriteColor) -> io::Result<()> {
        let held = if self.pass_held { "yes" } else { "no" };
        output::field(out, "pass held", held)?;
        match (&self.error, self.done) {
            (Some(message), _) => {
                output::colored(out, Color::Red, "error")?;
                writeln!(out, ": {message}")
            }
            (None, true) => {
                output::colored(out, Color::Green, "done")?;
                writeln!(out)
            }
            (None, false) => Ok(()),
        }
    }
}

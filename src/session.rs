//! Interactive question loop.
//!
//! Reads questions until an empty line or end of input, routing each one
//! through the [`Router`]. A failed question is reported and the loop
//! continues; only empty input terminates the session.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::router::Router;

/// Run the interactive loop over arbitrary input and output streams.
///
/// `initial_prompt` is shown before the first question; subsequent
/// questions are prompted with "Ask another question: ". The first empty
/// line (or end of input) terminates the loop without a route call.
pub async fn run_session<R: BufRead, W: Write>(
    router: &Router,
    mut input: R,
    output: &mut W,
    initial_prompt: &str,
) -> Result<()> {
    let mut first = true;

    loop {
        let prompt = if first {
            initial_prompt
        } else {
            "Ask another question: "
        };
        write!(output, "{}", prompt).context("Failed to write prompt")?;
        output.flush().context("Failed to flush output")?;

        let mut line = String::new();
        let bytes = input.read_line(&mut line).context("Failed to read input")?;
        let question = line.trim();
        if bytes == 0 || question.is_empty() {
            return Ok(());
        }
        first = false;

        match router.answer(question).await {
            Ok(answer) => {
                writeln!(output, "{}", answer.text).context("Failed to write answer")?;
            }
            Err(err) => {
                writeln!(output, "Error: {:#}", anyhow::Error::from(err))
                    .context("Failed to write error")?;
            }
        }
    }
}

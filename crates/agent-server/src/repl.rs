//! Interactive command prompt.

use std::io::{self, BufRead, Write};

const PROMPT: &str = "User: ";
const FAREWELL: &str = "Goodbye!";

/// Read prompts from `input` until `exit` or end of input.
///
/// Blank lines are skipped. Every other line goes to `ask` and its answer
/// is written to `output`.
pub fn run<R, W, F>(input: R, mut output: W, mut ask: F) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    F: FnMut(&str) -> String,
{
    let mut lines = input.lines();

    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let Some(line) = lines.next().transpose()? else {
            writeln!(output)?;
            writeln!(output, "{FAREWELL}")?;
            return Ok(());
        };

        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt.eq_ignore_ascii_case("exit") {
            writeln!(output, "{FAREWELL}")?;
            return Ok(());
        }

        let answer = ask(prompt);
        writeln!(output, "\n{answer}\n")?;
    }
}

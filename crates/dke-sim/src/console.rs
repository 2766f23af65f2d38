//! Interactive learner reading answers from a terminal or any `BufRead`.

use std::io::{BufRead, Write};

use dke_core::model::Item;
use dke_core::traits::ResponseSource;

/// Prompts for each item on `output` and reads the answer from `input`.
///
/// Multiple-choice items accept a letter (`A`, `b`, ...) or a 1-based
/// number; items without choices accept `y`/`n`. `q` or end of input
/// cancels the session.
pub struct ConsoleResponder<R, W> {
    input: R,
    output: W,
    asked: usize,
}

impl<R: BufRead, W: Write> ConsoleResponder<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            asked: 0,
        }
    }

    /// Recover the output sink, e.g. to inspect what was printed.
    pub fn into_output(self) -> W {
        self.output
    }

    fn prompt(&mut self, item: &Item) -> std::io::Result<()> {
        self.asked += 1;
        let stem = if item.text.is_empty() {
            item.id.as_str()
        } else {
            item.text.as_str()
        };
        writeln!(self.output, "\nQ{} [{}] {}", self.asked, item.skill, stem)?;
        match &item.choices {
            Some(choices) => {
                for (i, choice) in choices.iter().enumerate() {
                    writeln!(self.output, "  {}) {}", choice_label(i), choice)?;
                }
                write!(self.output, "answer (letter, q to quit): ")?;
            }
            None => write!(self.output, "did you answer correctly? (y/n, q to quit): ")?,
        }
        self.output.flush()
    }

    fn read_answer(&mut self, item: &Item) -> std::io::Result<Option<bool>> {
        loop {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let answer = line.trim();
            if answer.eq_ignore_ascii_case("q") {
                return Ok(None);
            }
            let parsed = match (&item.choices, item.correct_index) {
                (Some(choices), Some(key)) => {
                    parse_choice(answer, choices.len()).map(|picked| picked == key)
                }
                _ => parse_yes_no(answer),
            };
            match parsed {
                Some(correct) => return Ok(Some(correct)),
                None => write!(self.output, "unrecognized answer '{answer}', try again: ")?,
            }
            self.output.flush()?;
        }
    }
}

impl<R: BufRead, W: Write> ResponseSource for ConsoleResponder<R, W> {
    fn respond(&mut self, item: &Item) -> Option<bool> {
        let result = self.prompt(item).and_then(|_| self.read_answer(item));
        match result {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "console I/O failed, ending session");
                None
            }
        }
    }
}

fn choice_label(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

/// Zero-based choice index from a letter or 1-based number.
fn parse_choice(answer: &str, count: usize) -> Option<usize> {
    let index = match answer.parse::<usize>() {
        Ok(n) if n >= 1 => n - 1,
        Ok(_) => return None,
        Err(_) => {
            let mut chars = answer.chars();
            let c = chars.next()?.to_ascii_uppercase();
            if chars.next().is_some() || !c.is_ascii_uppercase() {
                return None;
            }
            (c as u8 - b'A') as usize
        }
    };
    (index < count).then_some(index)
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

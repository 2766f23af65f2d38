//! Replay of a fixed outcome sequence.

use std::collections::VecDeque;

use dke_core::model::Item;
use dke_core::traits::ResponseSource;

/// Returns the scripted outcomes in order, then `None`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResponder {
    outcomes: VecDeque<bool>,
}

impl ScriptedResponder {
    pub fn new(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
        }
    }

    /// Parse a script such as `"1 0 1"` or `"c,i,c"`.
    ///
    /// `1`, `c`, `y`, `t` count as correct; `0`, `i`, `n`, `f` as incorrect.
    pub fn parse(script: &str) -> Option<Self> {
        script
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|tok| !tok.is_empty())
            .map(|tok| match tok.to_ascii_lowercase().as_str() {
                "1" | "c" | "y" | "t" | "true" => Some(true),
                "0" | "i" | "n" | "f" | "false" => Some(false),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(Self::new)
    }

    pub fn remaining(&self) -> usize {
        self.outcomes.len()
    }
}

impl ResponseSource for ScriptedResponder {
    fn respond(&mut self, _item: &Item) -> Option<bool> {
        self.outcomes.pop_front()
    }
}

//! Console input abstraction.

use std::collections::VecDeque;

use async_trait::async_trait;
use dialoguer::{Input, Password};
use tokio::task;

use super::SetupError;

/// Source of interactive answers.
///
/// The binary uses [`ConsolePrompter`]; tests feed scripted answers.
#[async_trait]
pub trait Prompter: Send {
    /// Asks for a line of text. When `allow_empty` is false the prompt is
    /// repeated until something non-blank is entered.
    async fn input(&mut self, prompt: &str, allow_empty: bool) -> Result<String, SetupError>;

    /// Asks for a secret without echoing it.
    async fn password(&mut self, prompt: &str) -> Result<String, SetupError>;

    /// Shows a line of text to the user.
    fn say(&mut self, text: &str);
}

/// Terminal prompter backed by `dialoguer`.
///
/// Each read happens on the blocking pool, so the awaiting task can still be
/// raced against Ctrl+C.
#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl ConsolePrompter {
    /// Creates a new console prompter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prompter for ConsolePrompter {
    async fn input(&mut self, prompt: &str, allow_empty: bool) -> Result<String, SetupError> {
        let prompt = prompt.to_owned();
        let value: String = task::spawn_blocking(move || {
            Input::new()
                .with_prompt(prompt)
                .allow_empty(allow_empty)
                .interact_text()
        })
        .await??;
        Ok(value.trim().to_owned())
    }

    async fn password(&mut self, prompt: &str) -> Result<String, SetupError> {
        let prompt = prompt.to_owned();
        let value =
            task::spawn_blocking(move || Password::new().with_prompt(prompt).interact()).await??;
        Ok(value.trim().to_owned())
    }

    fn say(&mut self, text: &str) {
        println!("{text}");
    }
}

/// Prompter that replays a fixed list of answers.
///
/// Every message shown through [`Prompter::say`] is recorded so callers can
/// inspect what the user would have seen.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    said: Vec<String>,
}

impl ScriptedPrompter {
    /// Creates a prompter answering with `answers` in order.
    #[must_use]
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| (*a).to_owned()).collect(),
            said: Vec::new(),
        }
    }

    /// Lines shown so far.
    #[must_use]
    pub fn said(&self) -> &[String] {
        &self.said
    }

    /// Number of answers not consumed yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next_answer(&mut self, prompt: &str) -> Result<String, SetupError> {
        self.answers
            .pop_front()
            .ok_or_else(|| SetupError::InputClosed(prompt.to_owned()))
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn input(&mut self, prompt: &str, _allow_empty: bool) -> Result<String, SetupError> {
        self.next_answer(prompt)
    }

    async fn password(&mut self, prompt: &str) -> Result<String, SetupError> {
        self.next_answer(prompt)
    }

    fn say(&mut self, text: &str) {
        self.said.push(text.to_owned());
    }
}

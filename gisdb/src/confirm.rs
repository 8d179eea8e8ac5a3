//! Confirmation avant toute modification de la base

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

/// Stratégie de confirmation injectable
pub trait Confirm {
    /// Retourne `true` si l'opération décrite par `prompt` est acceptée
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// `yes` ou `y`, sans tenir compte de la casse ni des espaces
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}

/// Demande sur un flux interactif (stdin/stdout en pratique)
pub struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl PromptConfirm<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        write!(self.output, "{} (yes/no): ", prompt).context("Failed to write prompt")?;
        self.output.flush().context("Failed to flush prompt")?;

        let mut answer = String::new();
        // EOF = refus
        self.input
            .read_line(&mut answer)
            .context("Failed to read confirmation")?;
        Ok(is_affirmative(&answer))
    }
}

/// Accepte toujours (`--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl Confirm for AutoApprove {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Adapte une closure en [`Confirm`]
pub struct ConfirmWith<F>(pub F);

impl<F: FnMut(&str) -> bool> Confirm for ConfirmWith<F> {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok((self.0)(prompt))
    }
}

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Yes/no prompt shown to the operator.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn open(&self, message: &str) -> bool;
}

/// Answers prompts from a fixed script, then falls back to a default answer.
#[derive(Debug)]
pub struct StaticConfirmation {
    answers: Mutex<VecDeque<bool>>,
    fallback: bool,
    asked: Mutex<Vec<String>>,
}

impl StaticConfirmation {
    pub fn always(answer: bool) -> Self {
        Self::scripted(Vec::new(), answer)
    }

    pub fn scripted(answers: Vec<bool>, fallback: bool) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            fallback,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked
            .lock()
            .map(|asked| asked.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConfirmationPrompt for StaticConfirmation {
    async fn open(&self, message: &str) -> bool {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(message.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .unwrap_or(self.fallback)
    }
}

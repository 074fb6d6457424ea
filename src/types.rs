//! Common type definitions shared by providers, the engine and the web demo

use serde::{Deserialize, Serialize};

/// One completed `(user, bot)` exchange, unrendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub bot: String,
}

/// Multi-turn context handed back into `evaluate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    exchanges: Vec<Exchange>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, user: impl Into<String>, bot: impl Into<String>) {
        self.exchanges.push(Exchange {
            user: user.into(),
            bot: bot.into(),
        });
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }
}

/// Label picked by a classify provider, with the normalized score of every label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub scores: Vec<(String, f32)>,
}

impl Classification {
    /// Pick the highest scoring label. Ties go to the label listed first.
    pub fn from_scores(labels: &[String], scores: &[f32]) -> Option<Self> {
        let (best, _) = scores
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (idx, &score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((idx, score)),
            })?;

        Some(Self {
            label: labels.get(best)?.clone(),
            scores: labels.iter().cloned().zip(scores.iter().copied()).collect(),
        })
    }
}

/// Output of a provider's `evaluate`, shaped by its task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Response {
    Text { text: String },
    Label(Classification),
}

impl Response {
    pub fn text(text: impl Into<String>) -> Self {
        Response::Text { text: text.into() }
    }

    /// The text shown to a user: the generation itself or the chosen label.
    pub fn as_text(&self) -> &str {
        match self {
            Response::Text { text } => text,
            Response::Label(classification) => &classification.label,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Response::Text { text } => text,
            Response::Label(classification) => classification.label,
        }
    }
}

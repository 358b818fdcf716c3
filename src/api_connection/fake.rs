//! Scripted gateway for tests and offline runs.
//!
//! Responses are matched by checking whether the prompt contains a registered
//! substring (case-insensitive, first registered rule wins). Each rule can carry a
//! queue of one-shot replies or failures that are consumed before its standing
//! reply is used.

use super::{ApiConnectionError, LlmGateway};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail(String),
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    queued: VecDeque<Scripted>,
    standing: Option<String>,
    calls: usize,
}

#[derive(Debug, Default)]
pub struct FakeGateway {
    rules: Mutex<Vec<Rule>>,
    default_response: Option<String>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway that answers `response` to every prompt containing `prompt_contains`.
    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let gateway = Self::new();
        gateway.add_response(prompt_contains, response);
        gateway
    }

    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Set the standing reply for prompts containing `prompt_contains`.
    pub fn add_response(&self, prompt_contains: &str, response: &str) {
        let mut rules = self.rules.lock();
        let rule = rule_for(&mut rules, prompt_contains);
        rule.standing = Some(response.to_string());
    }

    /// Queue a one-shot reply, consumed before the standing reply.
    pub fn push_response(&self, prompt_contains: &str, response: &str) {
        let mut rules = self.rules.lock();
        rule_for(&mut rules, prompt_contains)
            .queued
            .push_back(Scripted::Reply(response.to_string()));
    }

    /// Queue a one-shot transport failure.
    pub fn push_failure(&self, prompt_contains: &str, message: &str) {
        let mut rules = self.rules.lock();
        rule_for(&mut rules, prompt_contains)
            .queued
            .push_back(Scripted::Fail(message.to_string()));
    }

    /// How many prompts were answered by the rule registered for `prompt_contains`.
    pub fn call_count(&self, prompt_contains: &str) -> usize {
        self.rules
            .lock()
            .iter()
            .find(|rule| rule.pattern == prompt_contains.to_lowercase())
            .map_or(0, |rule| rule.calls)
    }

    /// Canned answers for every pipeline stage, used by the binary's offline mode.
    pub fn with_demo_responses() -> Self {
        let gateway = Self::new();
        gateway.add_response(
            "meal recipe",
            r#"```json
{
  "Name": "Lemon Garlic Chickpea Pasta",
  "CookingTime": "25 minutes",
  "RequiredTools": ["large pot", "skillet", "colander"],
  "Ingredients": {
    "spaghetti": {"amount": 200, "unit": "grams"},
    "chickpeas": {"amount": 1, "unit": "cups"},
    "garlic": {"amount": 3, "unit": "piece"},
    "olive oil": {"amount": 2, "unit": "tablespoons"},
    "lemon juice": {"amount": 30, "unit": "ml"}
  },
  "Step-by-step directions": [
    "Boil the spaghetti in salted water until al dente, then drain.",
    "Warm the olive oil in a skillet and fry the sliced garlic until golden.",
    "Add the chickpeas and cook for 5 minutes.",
    "Toss the pasta with the chickpeas and lemon juice and serve."
  ]
}
```"#,
        );
        gateway.add_response(
            "food technologist",
            r#"{"calories": 1240, "protein": 42, "fat": 38, "carbohydrates": 180, "totalWeight": 620}"#,
        );
        gateway.add_response("professional chef", "Yes");
        gateway
    }
}

fn rule_for<'a>(rules: &'a mut Vec<Rule>, pattern: &str) -> &'a mut Rule {
    let pattern = pattern.to_lowercase();
    let index = match rules.iter().position(|rule| rule.pattern == pattern) {
        Some(index) => index,
        None => {
            rules.push(Rule {
                pattern,
                queued: VecDeque::new(),
                standing: None,
                calls: 0,
            });
            rules.len() - 1
        }
    };
    &mut rules[index]
}

#[async_trait]
impl LlmGateway for FakeGateway {
    async fn complete(&self, prompt: &str) -> Result<String, ApiConnectionError> {
        let prompt_lower = prompt.to_lowercase();
        let scripted = {
            let mut rules = self.rules.lock();
            rules
                .iter_mut()
                .find(|rule| prompt_lower.contains(&rule.pattern))
                .and_then(|rule| {
                    rule.calls += 1;
                    rule.queued
                        .pop_front()
                        .or_else(|| rule.standing.clone().map(Scripted::Reply))
                })
        };

        match scripted.or_else(|| self.default_response.clone().map(Scripted::Reply)) {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Fail(message)) => Err(ApiConnectionError::RequestFailed(message)),
            None => Err(ApiConnectionError::RequestFailed(format!(
                "FakeGateway: no response configured for prompt (first 60 chars): {}",
                prompt.chars().take(60).collect::<String>()
            ))),
        }
    }

    fn gateway_name(&self) -> &'static str {
        "fake"
    }
}

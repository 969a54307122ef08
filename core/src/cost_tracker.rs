//! Minimal per-decision token/cost accounting consumed by [`crate::trace`]
//! when finalising a reasoning trace.

#[derive(Debug, Clone, Copy, Default)]
pub struct CostSnapshot {
    pub token_count: u64,
    pub estimated_cost: f64,
}

/// Accumulates token usage across the LLM calls made within a single
/// decision and converts it to an estimated dollar cost at flush time.
#[derive(Debug, Clone, Default)]
pub struct CostTracker {
    prompt_tokens: u64,
    completion_tokens: u64,
    cost_per_1k_prompt: f64,
    cost_per_1k_completion: f64,
}

impl CostTracker {
    pub fn new(cost_per_1k_prompt: f64, cost_per_1k_completion: f64) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            cost_per_1k_prompt,
            cost_per_1k_completion,
        }
    }

    pub fn record_usage(&mut self, prompt_tokens: u64, completion_tokens: u64) {
        self.prompt_tokens += prompt_tokens;
        self.completion_tokens += completion_tokens;
    }

    pub fn snapshot(&self) -> CostSnapshot {
        let token_count = self.prompt_tokens + self.completion_tokens;
        let estimated_cost = (self.prompt_tokens as f64 / 1000.0) * self.cost_per_1k_prompt
            + (self.completion_tokens as f64 / 1000.0) * self.cost_per_1k_completion;
        CostSnapshot {
            token_count,
            estimated_cost,
        }
    }
}

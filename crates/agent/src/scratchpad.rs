//! Scratchpad rendering for prompts.
//!
//! The scratchpad itself is append-only; this module decides how much of
//! it reaches the model. Over budget, failed steps are dropped first,
//! then the earliest remaining steps, and the omission is stated.

use docweave_core::text::ellipsize;
use docweave_core::trace::{ReasoningStep, Scratchpad};

/// Shown when there is nothing to render.
pub const NO_OBSERVATIONS: &str = "(no observations yet)";

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Render one step as a prompt block.
pub fn render_step(step: &ReasoningStep, max_observation_chars: usize) -> String {
    let obs = &step.observation;
    let mut block = format!(
        "[Step {} | {} ({})]\nInput: {}\n",
        step.iteration, step.tool_name, step.tool_kind, obs.input
    );
    if obs.success {
        block.push_str("Result:\n");
        block.push_str(&ellipsize(obs.result.trim(), max_observation_chars));
    } else {
        block.push_str("FAILED: ");
        block.push_str(&ellipsize(obs.error.as_deref().unwrap_or("unknown error"), max_observation_chars));
    }
    block
}

/// Render the scratchpad's steps within `max_chars`.
pub fn render(scratchpad: &Scratchpad, max_chars: usize, max_observation_chars: usize) -> String {
    let blocks: Vec<(bool, String)> = scratchpad
        .steps()
        .iter()
        .map(|s| (s.observation.success, render_step(s, max_observation_chars)))
        .collect();
    if blocks.is_empty() {
        return NO_OBSERVATIONS.to_string();
    }

    let mut keep = vec![true; blocks.len()];
    // Room for the omission note once anything is dropped
    const NOTE_CHARS: usize = 32;
    let cost = |keep: &[bool]| -> usize {
        let note = if keep.iter().all(|k| *k) { 0 } else { NOTE_CHARS };
        note + blocks
            .iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|((_, b), _)| b.len() + 2)
            .sum::<usize>()
    };

    // Failed steps go first, oldest first; the newest step is never dropped
    for i in 0..blocks.len().saturating_sub(1) {
        if cost(&keep) <= max_chars {
            break;
        }
        if !blocks[i].0 {
            keep[i] = false;
        }
    }
    // Then the earliest steps, always keeping the newest one
    for i in 0..blocks.len().saturating_sub(1) {
        if cost(&keep) <= max_chars {
            break;
        }
        keep[i] = false;
    }

    let omitted = keep.iter().filter(|k| !**k).count();
    let mut out = String::new();
    if omitted > 0 {
        out.push_str(&format!("({omitted} earlier steps omitted)\n\n"));
    }
    let kept: Vec<&str> = blocks
        .iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|((_, b), _)| b.as_str())
        .collect();
    out.push_str(&kept.join("\n\n"));

    if out.len() > max_chars {
        ellipsize(&out, max_chars)
    } else {
        out
    }
}

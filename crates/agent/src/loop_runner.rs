//! The reasoning loop: select → execute → observe → decide, repeated until
//! the query is answerable or the hop budget runs out.
//!
//! Each hop ranks the registry for the current focus (the original query,
//! or the sub-question asked for by the last decision), invokes candidates
//! in rank order until one succeeds, records every attempt, and asks the
//! model whether it can answer. Tool failures stay inside the scratchpad;
//! only an inference failure while deciding or answering ends a run with
//! an error.

use docweave_core::agent::ReasoningConfig;
use docweave_core::event::{ReasoningEvent, ReasoningEventBus};
use docweave_core::error::InferenceError;
use docweave_core::provider::{CompletionRequest, Embedder, InferenceService};
use docweave_core::trace::{Observation, ReasoningStep, Scratchpad, Verdict};
use docweave_tools::{Tool, ToolRegistry, ToolRequest};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::decision::{Decision, decision_schema, parse_decision};
use crate::error::AgentError;
use crate::prompt::{ANSWER_SYSTEM, DECISION_SYSTEM, decision_prompt, direct_prompt, synthesis_prompt};
use crate::scratchpad::{estimate_tokens, render};
use crate::selector::{Candidate, ToolSelector};

/// How the final answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// The deciding step wrote the answer.
    Decided,
    /// No tool was relevant; answered from the bare query.
    Direct,
    /// Synthesized from the scratchpad before the hop budget ran out.
    Synthesized,
    /// Synthesized after the hop budget ran out, with the incompleteness caveat.
    Degraded,
}

impl AnswerKind {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded)
    }
}

impl fmt::Display for AnswerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Decided => "answer",
            Self::Direct => "direct answer (no relevant tools)",
            Self::Synthesized => "synthesized answer",
            Self::Degraded => "degraded answer (reasoning incomplete)",
        })
    }
}

/// The result of a reasoning run.
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningOutcome {
    pub run_id: String,
    pub answer: String,
    pub kind: AnswerKind,
    /// Hops that invoked at least one tool
    pub iterations: u32,
    pub scratchpad: Scratchpad,
}

impl ReasoningOutcome {
    pub fn steps(&self) -> &[ReasoningStep] {
        self.scratchpad.steps()
    }

    pub fn is_degraded(&self) -> bool {
        self.kind.is_degraded()
    }
}

/// What the answering state should do.
#[derive(Debug)]
enum AnswerMode {
    /// No tool cleared the threshold on the first hop
    Direct,
    /// Synthesize from what has been gathered
    FromScratchpad,
    /// The deciding step already wrote the answer
    Final(String),
    /// Hop budget exhausted without an answerable verdict
    Exhausted,
}

#[derive(Debug)]
enum LoopState {
    Selecting,
    Executing(Vec<Candidate>),
    Observing(Vec<ReasoningStep>),
    Deciding,
    Answering(AnswerMode),
}

/// Drives one query at a time over a prebuilt registry. Stateless between
/// runs; concurrent runs share nothing mutable.
pub struct ReasoningLoop {
    inference: Arc<dyn InferenceService>,
    embedder: Arc<dyn Embedder>,
    config: Arc<ReasoningConfig>,
    event_bus: Option<Arc<ReasoningEventBus>>,
}

/// Per-run mutable state.
struct Run<'a> {
    id: String,
    registry: &'a ToolRegistry,
    scratchpad: Scratchpad,
    selector: ToolSelector,
    iteration: u32,
    /// Reasoning given by the last "continue" decision
    last_reasoning: Option<String>,
}

impl ReasoningLoop {
    pub fn new(
        inference: Arc<dyn InferenceService>,
        embedder: Arc<dyn Embedder>,
        config: Arc<ReasoningConfig>,
    ) -> Self {
        Self {
            inference,
            embedder,
            config,
            event_bus: None,
        }
    }

    /// Publish progress events to `bus`.
    pub fn with_event_bus(mut self, bus: Arc<ReasoningEventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }

    /// Answer `query` using the tools in `registry`.
    pub async fn run(&self, query: &str, registry: &ToolRegistry) -> Result<ReasoningOutcome, AgentError> {
        let mut run = Run {
            id: uuid::Uuid::new_v4().to_string(),
            registry,
            scratchpad: Scratchpad::new(query),
            selector: ToolSelector::new(Arc::clone(&self.embedder), &self.config),
            iteration: 0,
            last_reasoning: None,
        };

        info!(
            run_id = %run.id,
            query_chars = query.len(),
            tools = registry.len(),
            max_iterations = self.config.max_iterations,
            "Reasoning run started"
        );
        self.publish(ReasoningEvent::RunStarted {
            run_id: run.id.clone(),
            query: query.to_string(),
            tool_count: registry.len(),
            timestamp: Utc::now(),
        });

        match self.drive(&mut run).await {
            Ok(outcome) => {
                info!(
                    run_id = %outcome.run_id,
                    iterations = outcome.iterations,
                    steps = outcome.steps().len(),
                    kind = ?outcome.kind,
                    "Reasoning run finished"
                );
                self.publish(ReasoningEvent::RunFinished {
                    run_id: outcome.run_id.clone(),
                    iterations: outcome.iterations,
                    degraded: outcome.is_degraded(),
                    timestamp: Utc::now(),
                });
                Ok(outcome)
            }
            Err(e) => {
                warn!(run_id = %run.id, error = %e, "Reasoning run failed");
                self.publish(ReasoningEvent::RunFailed {
                    run_id: run.id.clone(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    async fn drive(&self, run: &mut Run<'_>) -> Result<ReasoningOutcome, AgentError> {
        let mut state = LoopState::Selecting;

        loop {
            debug!(run_id = %run.id, iteration = run.iteration, state = state_name(&state), "Loop state");

            state = match state {
                // ── SELECTING ──
                LoopState::Selecting => {
                    let candidates = run.selector.select(&run.scratchpad, run.registry).await;
                    if candidates.is_empty() {
                        if run.iteration == 0 {
                            LoopState::Answering(AnswerMode::Direct)
                        } else {
                            LoopState::Answering(AnswerMode::FromScratchpad)
                        }
                    } else {
                        run.iteration += 1;
                        LoopState::Executing(candidates)
                    }
                }

                // ── EXECUTING ──
                LoopState::Executing(candidates) => {
                    let steps = self.execute_hop(run, &candidates).await;
                    LoopState::Observing(steps)
                }

                // ── OBSERVING ──
                LoopState::Observing(steps) => {
                    for step in steps {
                        let obs = &step.observation;
                        if obs.success {
                            info!(run_id = %run.id, iteration = step.iteration, tool = %step.tool_name, attempts = obs.attempts, "Observation recorded");
                        } else {
                            warn!(run_id = %run.id, iteration = step.iteration, tool = %step.tool_name, attempts = obs.attempts, error = obs.error.as_deref().unwrap_or(""), "Tool failed");
                        }
                        self.publish(ReasoningEvent::ObservationRecorded {
                            run_id: run.id.clone(),
                            iteration: step.iteration,
                            tool_name: step.tool_name.clone(),
                            success: obs.success,
                            duration_ms: obs.duration_ms,
                            timestamp: Utc::now(),
                        });
                        run.scratchpad.record(step);
                    }
                    LoopState::Deciding
                }

                // ── DECIDING ──
                LoopState::Deciding => {
                    let decision = self.decide(run).await?;
                    self.publish(ReasoningEvent::DecisionMade {
                        run_id: run.id.clone(),
                        iteration: run.iteration,
                        answerable: decision.is_final(),
                        timestamp: Utc::now(),
                    });
                    debug!(run_id = %run.id, iteration = run.iteration, answerable = decision.is_final(), "Decision made");

                    match decision {
                        Decision::Final { answer, .. } => {
                            run.scratchpad.set_verdict(Verdict::CanAnswer);
                            match answer {
                                Some(answer) => LoopState::Answering(AnswerMode::Final(answer)),
                                None => LoopState::Answering(AnswerMode::FromScratchpad),
                            }
                        }
                        Decision::Continue { sub_question, reasoning } => {
                            run.last_reasoning = reasoning.clone();
                            run.scratchpad.set_verdict(Verdict::NeedsMore {
                                sub_question,
                                reasoning,
                            });
                            if run.iteration >= self.config.max_iterations {
                                warn!(run_id = %run.id, iterations = run.iteration, "Hop budget exhausted");
                                LoopState::Answering(AnswerMode::Exhausted)
                            } else {
                                LoopState::Selecting
                            }
                        }
                    }
                }

                // ── ANSWERING ──
                LoopState::Answering(mode) => {
                    let (answer, kind) = match mode {
                        AnswerMode::Final(answer) => (answer, AnswerKind::Decided),
                        AnswerMode::Direct => {
                            let prompt = direct_prompt(run.scratchpad.query());
                            (self.complete(run, "answering", ANSWER_SYSTEM, prompt, false).await?, AnswerKind::Direct)
                        }
                        AnswerMode::FromScratchpad => (self.synthesize(run).await?, AnswerKind::Synthesized),
                        AnswerMode::Exhausted => {
                            let answer = self.synthesize(run).await?;
                            (
                                format!("{}\n\n{}", answer.trim_end(), self.config.incomplete_caveat),
                                AnswerKind::Degraded,
                            )
                        }
                    };
                    return Ok(ReasoningOutcome {
                        run_id: run.id.clone(),
                        answer,
                        kind,
                        iterations: run.iteration,
                        scratchpad: run.scratchpad.clone(),
                    });
                }
            };
        }
    }

    /// Try candidates in rank order until one succeeds or the per-hop
    /// candidate limit is reached. Every attempted candidate yields a step.
    async fn execute_hop(&self, run: &Run<'_>, candidates: &[Candidate]) -> Vec<ReasoningStep> {
        let focus = run.scratchpad.current_focus().to_string();
        let limit = self.config.max_candidates_per_hop.max(1);
        let mut steps = Vec::new();

        for candidate in candidates.iter().take(limit) {
            let entry = &run.registry.entries()[candidate.position];
            let tool = &entry.tool;

            debug!(
                run_id = %run.id,
                iteration = run.iteration,
                tool = %tool.name(),
                score = candidate.score,
                deprioritized = candidate.is_deprioritized(),
                "Tool selected"
            );
            self.publish(ReasoningEvent::ToolSelected {
                run_id: run.id.clone(),
                iteration: run.iteration,
                tool_name: tool.name().to_string(),
                score: candidate.score,
                timestamp: Utc::now(),
            });

            let observation = self.invoke_with_retries(tool, &focus).await;
            let success = observation.success;
            steps.push(ReasoningStep {
                iteration: run.iteration,
                tool_name: tool.name().to_string(),
                tool_kind: tool.kind(),
                score: candidate.score,
                rationale: Some(rationale(candidate, run.last_reasoning.as_deref())),
                observation,
            });
            if success {
                break;
            }
        }
        steps
    }

    /// Invoke a tool, retrying with the previous error attached.
    async fn invoke_with_retries(&self, tool: &Tool, focus: &str) -> Observation {
        let attempts = self.config.attempts_per_tool();
        let started = Instant::now();
        let mut request = ToolRequest::new(focus);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match tool.invoke(&request).await {
                Ok(result) => {
                    return Observation::success(tool.name(), focus, result)
                        .with_attempts(attempt)
                        .with_duration_ms(started.elapsed().as_millis() as u64);
                }
                Err(e) => {
                    debug!(tool = %tool.name(), attempt, error = %e, "Tool attempt failed");
                    last_error = e.to_string();
                    request = ToolRequest::new(focus).with_previous_error(last_error.clone());
                }
            }
        }

        Observation::failure(tool.name(), focus, last_error)
            .with_attempts(attempts)
            .with_duration_ms(started.elapsed().as_millis() as u64)
    }

    async fn decide(&self, run: &Run<'_>) -> Result<Decision, AgentError> {
        let observations = render(
            &run.scratchpad,
            self.config.max_scratchpad_chars,
            self.config.max_observation_chars,
        );
        let prompt = decision_prompt(
            run.scratchpad.query(),
            &observations,
            run.iteration,
            self.config.max_iterations,
        );
        let reply = self.complete(run, "deciding", DECISION_SYSTEM, prompt, true).await?;
        Ok(parse_decision(&reply))
    }

    async fn synthesize(&self, run: &Run<'_>) -> Result<String, AgentError> {
        let observations = render(
            &run.scratchpad,
            self.config.max_scratchpad_chars,
            self.config.max_observation_chars,
        );
        let prompt = synthesis_prompt(run.scratchpad.query(), &observations);
        self.complete(run, "answering", ANSWER_SYSTEM, prompt, false).await
    }

    /// One inference round-trip under the configured timeout. Any failure
    /// is fatal to the run and carries the scratchpad so far.
    async fn complete(
        &self,
        run: &Run<'_>,
        stage: &'static str,
        system: &str,
        prompt: String,
        structured: bool,
    ) -> Result<String, AgentError> {
        debug!(run_id = %run.id, stage, prompt_tokens = estimate_tokens(&prompt), "Calling inference service");

        let mut request = CompletionRequest::new(&self.config.model, system, prompt)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);
        if structured {
            request = request.with_schema(decision_schema());
        }

        let timeout = self.config.inference_timeout();
        let result = match tokio::time::timeout(timeout, self.inference.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(InferenceError::Timeout {
                timeout_secs: timeout.as_secs(),
            }),
        };

        result.map_err(|source| AgentError::Inference {
            stage,
            source,
            trace: Box::new(run.scratchpad.clone()),
        })
    }

    fn publish(&self, event: ReasoningEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

fn rationale(candidate: &Candidate, last_reasoning: Option<&str>) -> String {
    let mut text = format!("similarity {:.3}", candidate.score);
    if candidate.is_deprioritized() {
        text.push_str(" (tried before on this input)");
    }
    if let Some(reasoning) = last_reasoning {
        text.push_str("; ");
        text.push_str(reasoning);
    }
    text
}

fn state_name(state: &LoopState) -> &'static str {
    match state {
        LoopState::Selecting => "selecting",
        LoopState::Executing(_) => "executing",
        LoopState::Observing(_) => "observing",
        LoopState::Deciding => "deciding",
        LoopState::Answering(_) => "answering",
    }
}

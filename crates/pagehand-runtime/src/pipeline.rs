//! The command pipeline orchestrator.
//!
//! A command first tries the fast path. Otherwise it goes through intent
//! resolution, codegen, safety, execution and verification, regenerating on
//! retryable failures up to the configured number of cycles. Clarification
//! and confirmation suspend the command on its session; they resume through
//! [`Pipeline::submit_clarification`] and [`Pipeline::confirm_action`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pagehand_protocols::{
    ActionKind, ChatMessage, Command, ExecutionOutcome, FastPathAction, GeneratedAction,
    IntentDecision, PageDriver, PageSnapshot, ParsedIntent, ProviderError, SafetyVerdict,
    Settings,
};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::codegen::{ActionGenerator, CONVERSATION_WINDOW, GenerationRequest};
use crate::error::PipelineError;
use crate::executor::{DEFAULT_SURFACE_TIMEOUT, Executor};
use crate::fast_path::FastPathMatcher;
use crate::gateway::{ModelConfig, ModelGateway};
use crate::intent::IntentResolver;
use crate::retry::{RetryContext, RetryPolicy};
use crate::safety::SafetyGate;
use crate::session::{
    PendingClarification, PendingConfirmation, PendingInteraction, Session, SessionStore,
};
use crate::verifier::{DEFAULT_SETTLE_DELAY, Verifier};

/// Tunables that do not change per command.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub surface_timeout: Duration,
    pub settle_delay: Duration,
    /// Backoff between regenerate cycles and provider retries.
    pub retry_policy: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            surface_timeout: DEFAULT_SURFACE_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            retry_policy: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineState {
    Idle,
    FastPath,
    Intent,
    Clarification,
    Codegen,
    Safety,
    Execution,
    Verification,
    Complete,
    Error,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::FastPath => "fast_path",
            PipelineState::Intent => "intent",
            PipelineState::Clarification => "clarification",
            PipelineState::Codegen => "codegen",
            PipelineState::Safety => "safety",
            PipelineState::Execution => "execution",
            PipelineState::Verification => "verification",
            PipelineState::Complete => "complete",
            PipelineState::Error => "error",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller gets back for a command, answer or confirmation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
    /// Actions attempted, or awaiting confirmation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<GeneratedAction>,
    pub requires_clarification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarification_question: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub clarification_options: Vec<String>,
    pub requires_confirmation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_message: Option<String>,
    pub state: PipelineState,
}

impl CommandResponse {
    fn finished(
        success: bool,
        message: String,
        actions: Vec<GeneratedAction>,
        state: PipelineState,
    ) -> Self {
        Self {
            success,
            message,
            actions,
            requires_clarification: false,
            clarification_question: None,
            clarification_options: Vec::new(),
            requires_confirmation: false,
            confirmation_message: None,
            state,
        }
    }

    fn clarification(question: String, options: Vec<String>) -> Self {
        Self {
            requires_clarification: true,
            clarification_question: Some(question.clone()),
            clarification_options: options,
            ..Self::finished(false, question, Vec::new(), PipelineState::Clarification)
        }
    }

    fn confirmation(message: String, actions: Vec<GeneratedAction>) -> Self {
        Self {
            requires_confirmation: true,
            confirmation_message: Some(message.clone()),
            ..Self::finished(false, message, actions, PipelineState::Safety)
        }
    }

    /// Nothing was pending for the surface.
    fn rejected(message: &str) -> Self {
        Self::finished(false, message.to_string(), Vec::new(), PipelineState::Idle)
    }

    pub fn is_suspended(&self) -> bool {
        self.requires_clarification || self.requires_confirmation
    }
}

/// State of one command in flight, for transition logging.
struct Run {
    surface: String,
    state: PipelineState,
}

impl Run {
    fn new(surface: &str, state: PipelineState) -> Self {
        Self {
            surface: surface.to_string(),
            state,
        }
    }

    fn enter(&mut self, next: PipelineState) {
        if self.state != next {
            debug!(surface = %self.surface, "{} -> {}", self.state, next);
            self.state = next;
        }
    }
}

/// Why a cycle stopped before every action succeeded.
struct CycleFailure {
    error: PipelineError,
    retryable: bool,
    action: GeneratedAction,
}

/// Runs commands against page surfaces.
pub struct Pipeline {
    matcher: FastPathMatcher,
    intent: IntentResolver,
    generator: ActionGenerator,
    safety: SafetyGate,
    executor: Executor,
    verifier: Verifier,
    sessions: Arc<SessionStore>,
    retry_policy: RetryPolicy,
}

impl Pipeline {
    pub fn new(
        gateway: Arc<ModelGateway>,
        driver: Arc<dyn PageDriver>,
        sessions: Arc<SessionStore>,
        options: PipelineOptions,
    ) -> Self {
        let executor = Executor::new(driver.clone()).with_timeout(options.surface_timeout);
        sessions.on_evict(executor.eviction_listener());
        Self {
            matcher: FastPathMatcher::new(),
            intent: IntentResolver::new(gateway.clone()),
            generator: ActionGenerator::new(gateway),
            safety: SafetyGate::new(),
            executor,
            verifier: Verifier::new(driver)
                .with_settle_delay(options.settle_delay)
                .with_timeout(options.surface_timeout),
            sessions,
            retry_policy: options.retry_policy,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Run a new command.
    ///
    /// Commands on the same surface queue behind each other. A command
    /// arriving while a clarification or confirmation is pending cancels it.
    pub async fn process_command(&self, command: Command, settings: &Settings) -> CommandResponse {
        let surface = command.surface_id.clone();
        let mut session = self.sessions.acquire(&surface).await;
        let mut run = Run::new(&surface, PipelineState::Idle);

        if let Some(pending) = session.pending.take() {
            let kind = match pending {
                PendingInteraction::Clarification(_) => "clarification",
                PendingInteraction::Confirmation(_) => "confirmation",
            };
            info!(surface = %surface, "New command cancels pending {}", kind);
            session.add_message(ChatMessage::system(format!(
                "Pending {} cancelled by a new command",
                kind
            )));
        }
        session.add_message(ChatMessage::user(command.text.clone()));

        run.enter(PipelineState::FastPath);
        let fast = self.matcher.match_command(&command.text);
        if let (true, Some(action)) = (fast.matched, fast.action) {
            return self
                .run_fast_path(&mut session, &mut run, action, &fast.params)
                .await;
        }

        run.enter(PipelineState::Intent);
        let snapshot = match self.capture(&mut session).await {
            Ok(snapshot) => snapshot,
            Err(e) => return self.fail(&mut session, &mut run, &e, Vec::new()),
        };

        let model = ModelConfig::intent(settings);
        let resolver = &self.intent;
        let (text, snap, model_ref) = (command.text.as_str(), &snapshot, &model);
        let decision = self
            .call_stage(settings, move || resolver.resolve(text, snap, model_ref))
            .await;

        match decision {
            Err(e) => self.fail(&mut session, &mut run, &e, Vec::new()),
            Ok(IntentDecision::Unclear {
                question,
                options,
                suggested_action,
            }) => {
                run.enter(PipelineState::Clarification);
                info!(surface = %surface, "Awaiting clarification: {}", question);
                session.add_message(ChatMessage::assistant(question.clone()));
                session.pending = Some(PendingInteraction::Clarification(PendingClarification {
                    command: command.text.clone(),
                    question: question.clone(),
                    options: options.clone(),
                    suggested_action,
                    asked_at: Utc::now(),
                }));
                CommandResponse::clarification(question, options)
            }
            Ok(IntentDecision::Clear { intent }) => {
                let retry = RetryContext::new(settings.max_retries);
                self.drive(
                    &mut session,
                    &mut run,
                    &command.text,
                    intent,
                    retry,
                    Some(snapshot),
                    None,
                    settings,
                )
                .await
            }
        }
    }

    /// Answer the clarification question pending on `surface`.
    ///
    /// The answer becomes the intent target and the command re-enters at
    /// codegen.
    pub async fn submit_clarification(
        &self,
        surface: &str,
        answer: &str,
        settings: &Settings,
    ) -> CommandResponse {
        let mut session = self.sessions.acquire(surface).await;
        let pending = match session.pending.take() {
            Some(PendingInteraction::Clarification(pending)) => pending,
            other => {
                session.pending = other;
                return CommandResponse::rejected("There is no question waiting for an answer.");
            }
        };

        let answer = answer.trim();
        if answer.is_empty() {
            let question = pending.question.clone();
            session.pending = Some(PendingInteraction::Clarification(pending));
            return CommandResponse::rejected(&question);
        }

        session.add_message(ChatMessage::user(answer));
        let mut run = Run::new(surface, PipelineState::Clarification);
        let intent = ParsedIntent::new(pending.suggested_action.unwrap_or(ActionKind::Click))
            .with_target(answer);
        let command = format!("{} ({})", pending.command, answer);
        debug!(surface = %surface, "Clarified command: {}", command);

        let retry = RetryContext::new(settings.max_retries);
        self.drive(
            &mut session,
            &mut run,
            &command,
            intent,
            retry,
            None,
            None,
            settings,
        )
        .await
    }

    /// Approve or decline the flagged actions pending on `surface`.
    pub async fn confirm_action(
        &self,
        surface: &str,
        approved: bool,
        settings: &Settings,
    ) -> CommandResponse {
        let mut session = self.sessions.acquire(surface).await;
        let pending = match session.pending.take() {
            Some(PendingInteraction::Confirmation(pending)) => pending,
            other => {
                session.pending = other;
                return CommandResponse::rejected("There is no action waiting for confirmation.");
            }
        };

        session.add_message(ChatMessage::user(if approved { "yes" } else { "no" }));
        let mut run = Run::new(surface, PipelineState::Safety);

        if !approved {
            info!(surface = %surface, "Flagged actions declined");
            for action in &pending.actions {
                session.record_action(action.clone(), false);
            }
            return self.finish(
                &mut session,
                &mut run,
                false,
                "Okay, I cancelled that action.".to_string(),
                pending.actions,
            );
        }

        self.drive(
            &mut session,
            &mut run,
            &pending.command,
            pending.intent,
            pending.retry,
            None,
            Some(pending.actions),
            settings,
        )
        .await
    }

    async fn run_fast_path(
        &self,
        session: &mut Session,
        run: &mut Run,
        action: FastPathAction,
        params: &HashMap<String, String>,
    ) -> CommandResponse {
        run.enter(PipelineState::Execution);
        debug!(surface = %run.surface, "Fast path: {}", action.as_str());

        let outcome = self
            .executor
            .execute_fast_path(action, params, &session.surface_id)
            .await;
        let record = fast_path_record(action, params);
        session.record_action(record.clone(), outcome.success);

        let message = if outcome.success {
            outcome.message.unwrap_or_else(|| "Done.".to_string())
        } else {
            outcome.error.unwrap_or_else(|| "Action failed".to_string())
        };
        self.finish(session, run, outcome.success, message, vec![record])
    }

    /// Generate, check, execute and verify until success, a fatal error,
    /// or the cycle budget runs out.
    ///
    /// `snapshot` seeds the first cycle. `approved` skips generation and
    /// the confirmation prompt for one cycle.
    #[allow(clippy::too_many_arguments)]
    async fn drive(
        &self,
        session: &mut Session,
        run: &mut Run,
        command: &str,
        intent: ParsedIntent,
        mut retry: RetryContext,
        mut snapshot: Option<PageSnapshot>,
        mut approved: Option<Vec<GeneratedAction>>,
        settings: &Settings,
    ) -> CommandResponse {
        let model = ModelConfig::codegen(settings);
        let mut attempted: Vec<GeneratedAction> = Vec::new();

        loop {
            let (actions, confirmed) = match approved.take() {
                Some(actions) => (actions, true),
                None => {
                    run.enter(PipelineState::Codegen);
                    retry.attempt += 1;

                    let current = match snapshot.take() {
                        Some(snapshot) => snapshot,
                        None => match self.capture(session).await {
                            Ok(snapshot) => snapshot,
                            Err(e) => return self.fail(session, run, &e, attempted),
                        },
                    };
                    if retry.is_retry() {
                        retry.refresh_alternatives(&current);
                    }

                    let conversation = session.recent_messages(CONVERSATION_WINDOW);
                    let request = GenerationRequest {
                        command,
                        intent: &intent,
                        snapshot: &current,
                        conversation: &conversation,
                        retry: retry.is_retry().then_some(&retry),
                    };
                    let generator = &self.generator;
                    let (req, model_ref) = (&request, &model);
                    let result = match self
                        .call_stage(settings, move || generator.generate(req, model_ref))
                        .await
                    {
                        Ok(result) => result,
                        Err(e) => return self.fail(session, run, &e, attempted),
                    };

                    if !result.success {
                        warn!(
                            surface = %run.surface,
                            "No usable actions generated: {}",
                            result.error.as_deref().unwrap_or("unknown")
                        );
                        let message = if result.explanation.is_empty() {
                            "I couldn't work out how to do that on this page.".to_string()
                        } else {
                            result.explanation
                        };
                        return self.finish(session, run, false, message, attempted);
                    }
                    (result.actions, false)
                }
            };

            run.enter(PipelineState::Safety);
            let mut flags: Vec<String> = Vec::new();
            for action in &actions {
                match self.safety.check_action(action) {
                    SafetyVerdict::Safe => {}
                    SafetyVerdict::Flagged { flags: found, .. } => {
                        for flag in found {
                            if !flags.contains(&flag) {
                                flags.push(flag);
                            }
                        }
                    }
                    SafetyVerdict::Blocked {
                        blocked_fragment,
                        blocked_reason,
                    } => {
                        for action in &actions {
                            session.record_action(action.clone(), false);
                        }
                        attempted.extend(actions.iter().cloned());
                        let error = PipelineError::SafetyViolation {
                            fragment: blocked_fragment,
                            reason: blocked_reason,
                        };
                        return self.fail(session, run, &error, attempted);
                    }
                }
            }

            if !flags.is_empty() && !confirmed {
                if settings.confirm_destructive {
                    let message = format!(
                        "This action involves {}. Do you want to proceed?",
                        flags.join(" and ")
                    );
                    info!(surface = %run.surface, "Awaiting confirmation: {}", flags.join(", "));
                    session.add_message(
                        ChatMessage::assistant(message.clone()).with_actions(actions.clone()),
                    );
                    session.pending = Some(PendingInteraction::Confirmation(PendingConfirmation {
                        command: command.to_string(),
                        intent: intent.clone(),
                        actions: actions.clone(),
                        message: message.clone(),
                        retry: retry.clone(),
                    }));
                    return CommandResponse::confirmation(message, actions);
                }
                info!(
                    surface = %run.surface,
                    "Confirmation disabled, running flagged actions: {}",
                    flags.join(", ")
                );
            }

            let (messages, failure) = self.execute_cycle(session, run, actions, &mut attempted).await;

            let Some(failure) = failure else {
                let message = if messages.is_empty() {
                    "Done.".to_string()
                } else {
                    messages.join("\n")
                };
                return self.finish(session, run, true, message, attempted);
            };

            retry.record_failure(failure.error.to_string(), failure.action);
            if !failure.retryable || !retry.has_attempts_remaining() {
                if failure.retryable {
                    warn!(
                        surface = %run.surface,
                        "Giving up after {} attempt(s): {}",
                        retry.attempt,
                        failure.error
                    );
                }
                return self.fail(session, run, &failure.error, attempted);
            }

            let delay = self
                .retry_policy
                .delay_for_attempt(retry.attempt.saturating_sub(1));
            info!(
                surface = %run.surface,
                "Attempt {}/{} failed: {}; regenerating in {:?}",
                retry.attempt,
                retry.max_attempts,
                failure.error,
                delay
            );
            sleep(delay).await;
        }
    }

    /// Execute and verify `actions` in order, stopping at the first failure.
    async fn execute_cycle(
        &self,
        session: &mut Session,
        run: &mut Run,
        actions: Vec<GeneratedAction>,
        attempted: &mut Vec<GeneratedAction>,
    ) -> (Vec<String>, Option<CycleFailure>) {
        let known_ids = session
            .last_snapshot
            .as_ref()
            .map(PageSnapshot::element_ids)
            .unwrap_or_default();
        let surface = session.surface_id.clone();
        let mut messages = Vec::new();

        for action in actions {
            run.enter(PipelineState::Execution);
            let validation = SafetyGate::validate_selectors(&action.executable_text(), &known_ids);
            let outcome = if validation.valid {
                self.executor.execute(&action, &surface).await
            } else {
                ExecutionOutcome::retryable(format!(
                    "Stale element reference: {}",
                    validation.invalid_selectors.join(", ")
                ))
            };

            session.record_action(action.clone(), outcome.success);
            attempted.push(action.clone());

            if !outcome.success {
                let error = outcome.error.unwrap_or_else(|| "Action failed".to_string());
                return (
                    messages,
                    Some(CycleFailure {
                        error: PipelineError::Execution(error),
                        retryable: outcome.requires_retry,
                        action,
                    }),
                );
            }

            run.enter(PipelineState::Verification);
            let verification = self
                .verifier
                .verify(action.verification.as_ref(), &surface)
                .await;
            if !verification.success {
                let detail = format!(
                    "expected \"{}\", observed \"{}\"",
                    verification.expected, verification.observed
                );
                return (
                    messages,
                    Some(CycleFailure {
                        error: PipelineError::Verification(detail),
                        retryable: true,
                        action,
                    }),
                );
            }

            if let Some(message) = outcome.message {
                messages.push(message);
            }
        }

        (messages, None)
    }

    /// Call a model-backed stage, absorbing transient gateway failures.
    ///
    /// A local rate limit is waited out once and a malformed response is
    /// re-prompted once. Retryable provider errors are retried up to
    /// `max_retries` times.
    async fn call_stage<T, F, Fut>(&self, settings: &Settings, mut op: F) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut waited = false;
        let mut reprompted = false;
        let mut provider_retries = 0u32;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(PipelineError::RateLimited { wait }) if !waited => {
                    waited = true;
                    warn!("Model calls rate limited, waiting {:?}", wait);
                    sleep(wait).await;
                }
                Err(PipelineError::Protocol(detail)) if !reprompted => {
                    reprompted = true;
                    warn!("Malformed model response, re-prompting: {}", detail);
                }
                Err(PipelineError::Provider(e))
                    if e.is_retryable() && provider_retries < settings.max_retries =>
                {
                    let delay = match &e {
                        ProviderError::RateLimited {
                            retry_after_seconds,
                        } => Duration::from_secs(*retry_after_seconds),
                        _ => self.retry_policy.delay_for_attempt(provider_retries),
                    };
                    provider_retries += 1;
                    warn!(
                        "Provider call failed ({}), retry {}/{} in {:?}",
                        e, provider_retries, settings.max_retries, delay
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn capture(&self, session: &mut Session) -> Result<PageSnapshot, PipelineError> {
        let snapshot = self.executor.capture_snapshot(&session.surface_id).await?;
        session.set_snapshot(snapshot.clone());
        Ok(snapshot)
    }

    fn fail(
        &self,
        session: &mut Session,
        run: &mut Run,
        error: &PipelineError,
        actions: Vec<GeneratedAction>,
    ) -> CommandResponse {
        match error {
            PipelineError::SafetyViolation { fragment, reason } => {
                warn!(surface = %run.surface, "Blocked '{}': {}", fragment, reason);
            }
            other => debug!(surface = %run.surface, "Command failed: {}", other),
        }
        self.finish(session, run, false, error.user_message(), actions)
    }

    /// Close out a command with exactly one assistant message.
    fn finish(
        &self,
        session: &mut Session,
        run: &mut Run,
        success: bool,
        message: String,
        actions: Vec<GeneratedAction>,
    ) -> CommandResponse {
        run.enter(if success {
            PipelineState::Complete
        } else {
            PipelineState::Error
        });

        let mut reply = ChatMessage::assistant(message.clone()).with_actions(actions.clone());
        if !success {
            reply = reply.as_error();
        }
        session.add_message(reply);

        info!(
            surface = %run.surface,
            success,
            actions = actions.len(),
            "Command finished: {}",
            message
        );
        CommandResponse::finished(success, message, actions, run.state)
    }
}

/// History entry for a fast-path action.
fn fast_path_record(action: FastPathAction, params: &HashMap<String, String>) -> GeneratedAction {
    let param = |key: &str| params.get(key).cloned().unwrap_or_default();
    let record = match action {
        FastPathAction::Scroll => {
            let spec = match params.get("position") {
                Some(position) => position.clone(),
                None => format!("{}:{}", param("direction"), param("amount")),
            };
            GeneratedAction::new(ActionKind::Scroll).with_payload(spec)
        }
        FastPathAction::Navigate => {
            GeneratedAction::new(ActionKind::Navigate).with_payload(param("url"))
        }
        FastPathAction::ClickByText => {
            GeneratedAction::new(ActionKind::Click).with_target(param("text"))
        }
        FastPathAction::Back | FastPathAction::Forward | FastPathAction::Reload => {
            GeneratedAction::new(ActionKind::Other(action.as_str().to_string()))
        }
    };
    record.with_description(format!("fast path: {}", action.as_str()))
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;

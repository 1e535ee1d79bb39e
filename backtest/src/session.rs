use crate::analyzer::{self, prompt, AnalysisResult, Citation, Generation, Generator, ParseErrorKind, TransportError};
use crate::types::Scenario;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Shown for every failed run, whatever the cause
pub const FAILURE_MESSAGE: &str =
    "The returned data could not be parsed. Try a shorter date range or a different asset.";

/// Identity of one triggered run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunInfo {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Snapshot taken at trigger time; later edits do not reach the run
    pub scenario: Scenario,
}

/// Why a run ended in `ParseFailed`. Diagnostic only; users see [`FAILURE_MESSAGE`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "lowercase")]
pub enum FailureCause {
    Transport(String),
    Syntax(String),
    Schema(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Loading {
        run: RunInfo,
    },
    Succeeded {
        run: RunInfo,
        result: AnalysisResult,
        citations: Vec<Citation>,
        raw_text: String,
    },
    ParseFailed {
        run: RunInfo,
        raw_text: String,
        cause: FailureCause,
    },
}

impl RunState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RunState::Loading { .. })
    }

    pub fn run(&self) -> Option<&RunInfo> {
        match self {
            RunState::Idle => None,
            RunState::Loading { run }
            | RunState::Succeeded { run, .. }
            | RunState::ParseFailed { run, .. } => Some(run),
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            RunState::Succeeded { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn phase(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Loading { .. } => "loading",
            RunState::Succeeded { .. } => "succeeded",
            RunState::ParseFailed { .. } => "parse_failed",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RunRejected {
    #[error("run {0} is still in flight")]
    InFlight(Uuid),
}

/// Permission to complete a run, issued by [`Session::begin`]
#[derive(Debug, Clone)]
pub struct RunTicket {
    id: Uuid,
    scenario: Scenario,
}

impl RunTicket {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Owns the single current-run slot and drives it through
/// idle -> loading -> succeeded | parse_failed.
///
/// At most one run is in flight; a trigger while loading is rejected.
pub struct Session {
    generator: Arc<dyn Generator>,
    slot: Mutex<RunState>,
}

impl Session {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator, slot: Mutex::new(RunState::Idle) }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> RunState {
        self.lock().clone()
    }

    /// Whether a new run may be triggered right now
    pub fn can_trigger(&self) -> bool {
        !self.lock().is_loading()
    }

    /// Enter `Loading` for a new run, discarding everything the previous run held.
    pub fn begin(&self, scenario: Scenario) -> Result<RunTicket, RunRejected> {
        let mut slot = self.lock();
        if let RunState::Loading { run } = &*slot {
            warn!("Run rejected: {} still loading", run.id);
            return Err(RunRejected::InFlight(run.id));
        }

        let run = RunInfo { id: Uuid::new_v4(), started_at: Utc::now(), scenario: scenario.clone() };
        info!(
            "Run {} started: {} {} {} {}",
            run.id, scenario.mode, scenario.asset, scenario.start_date, scenario.end_date
        );
        let ticket = RunTicket { id: run.id, scenario };
        *slot = RunState::Loading { run };
        Ok(ticket)
    }

    /// Settle a run from the gateway outcome.
    ///
    /// Returns false when the ticket no longer owns the slot; the outcome is dropped.
    pub fn finish(&self, ticket: &RunTicket, outcome: Result<Generation, TransportError>) -> bool {
        let mut slot = self.lock();
        let run = match &*slot {
            RunState::Loading { run } if run.id == ticket.id => run.clone(),
            _ => {
                warn!("Discarding result of superseded run {}", ticket.id);
                return false;
            }
        };

        *slot = settle(run, outcome);
        match &*slot {
            RunState::Succeeded { run, result, citations, .. } => info!(
                "Run {} succeeded: {} points, {} sources",
                run.id,
                result.chart_data().len(),
                citations.len()
            ),
            RunState::ParseFailed { run, cause, .. } => warn!("Run {} failed: {:?}", run.id, cause),
            _ => {}
        }
        true
    }

    /// Build the prompt, call the model, and settle the run.
    pub async fn execute(&self, ticket: RunTicket) -> RunState {
        let prompt = prompt::build(&ticket.scenario);
        let outcome = self.generator.generate(&prompt).await;
        self.finish(&ticket, outcome);
        self.state()
    }

    /// `begin` + `execute`
    pub async fn run(&self, scenario: Scenario) -> Result<RunState, RunRejected> {
        let ticket = self.begin(scenario)?;
        Ok(self.execute(ticket).await)
    }
}

fn settle(run: RunInfo, outcome: Result<Generation, TransportError>) -> RunState {
    let Generation { text, citations } = match outcome {
        Ok(g) => g,
        Err(e) => {
            return RunState::ParseFailed {
                run,
                raw_text: String::new(),
                cause: FailureCause::Transport(e.to_string()),
            };
        }
    };

    match analyzer::parse(&text) {
        Ok(result) => {
            let regressions = result.principal_regressions();
            if !regressions.is_empty() {
                warn!(
                    "Run {}: invested principal decreases at points {:?} (model data quality)",
                    run.id, regressions
                );
            }
            if citations.is_empty() {
                warn!("Run {}: answer carried no grounding sources", run.id);
            }
            RunState::Succeeded { run, result, citations, raw_text: text }
        }
        Err(e) => {
            let cause = match e.kind {
                ParseErrorKind::Syntax => FailureCause::Syntax(e.reason),
                ParseErrorKind::Schema => FailureCause::Schema(e.reason),
            };
            RunState::ParseFailed { run, raw_text: e.raw, cause }
        }
    }
}

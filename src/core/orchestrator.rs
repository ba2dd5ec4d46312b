//! Orchestration driver
//!
//! Runs one invocation through `Resolving → Materializing → Recording →
//! Building → Done`. Which stages run depends on the [`RunMode`]. Every stage
//! walks the same build order, one library at a time; the first
//! materialization or build failure ends the run in
//! [`RunState::Failed`]. Bookkeeping failures are logged and the run goes on.

use serde::Serialize;
use std::fmt;

use crate::config::RunConfig;
use crate::core::bookkeeping::{RetrievalOutcome, RetrievalSummary};
use crate::core::builder::{BuildInvoker, BuildOutcome};
use crate::core::platform::{filtered_libraries, HostPlatform};
use crate::core::procedure::{BuildContext, ProcedureTable};
use crate::core::resolver::schedule;
use crate::error::{BookkeepingError, OrchestratorError, RetrievalError, Stage};
use crate::infra::process::CommandRunner;
use crate::registry::{LibraryId, LibraryRecord, Registry};

/// Obtains or refreshes a library's local source tree
///
/// Implementations must be idempotent: an existing git tree is moved to the
/// branch tip, an existing archive is not downloaded again.
#[allow(async_fn_in_trait)]
pub trait SourceMaterializer {
    async fn materialize(&self, record: &LibraryRecord)
        -> Result<RetrievalOutcome, RetrievalError>;
}

impl<M: SourceMaterializer> SourceMaterializer for &M {
    async fn materialize(&self, record: &LibraryRecord)
        -> Result<RetrievalOutcome, RetrievalError> {
        (**self).materialize(record).await
    }
}

/// Records what a retrieval pass changed
pub trait Bookkeeper {
    fn record(&self, summary: &RetrievalSummary) -> Result<(), BookkeepingError>;
}

/// Which stages a run executes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Retrieve, record and build
    #[default]
    Full,
    /// Retrieve and record only
    GetOnly,
    /// Build sources already on disk
    BuildOnly,
}

impl RunMode {
    pub fn retrieves(self) -> bool {
        !matches!(self, Self::BuildOnly)
    }

    pub fn builds(self) -> bool {
        !matches!(self, Self::GetOnly)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::GetOnly => write!(f, "get-only"),
            Self::BuildOnly => write!(f, "build-only"),
        }
    }
}

/// Driver state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Resolving,
    Materializing,
    Recording,
    Building,
    Done,
    Failed { stage: Stage, detail: String },
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Resolving => write!(f, "resolving"),
            Self::Materializing => write!(f, "materializing"),
            Self::Recording => write!(f, "recording"),
            Self::Building => write!(f, "building"),
            Self::Done => write!(f, "done"),
            Self::Failed { stage, .. } => write!(f, "failed while {stage}"),
        }
    }
}

/// Where and why a run failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    pub stage: Stage,
    pub library: Option<String>,
    pub message: String,
}

impl From<&OrchestratorError> for FailureReport {
    fn from(error: &OrchestratorError) -> Self {
        Self {
            stage: error.stage(),
            library: error.library().map(str::to_string),
            message: error.to_string(),
        }
    }
}

/// Aggregated result of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub host: HostPlatform,
    pub state: RunState,
    pub build_order: Vec<LibraryId>,
    pub retrieved: RetrievalSummary,
    pub built: Vec<LibraryId>,
    /// Libraries with no commands for this host
    pub skipped: Vec<LibraryId>,
    pub bookkeeping_error: Option<String>,
    pub failure: Option<FailureReport>,
}

impl RunReport {
    fn new(mode: RunMode, host: HostPlatform) -> Self {
        Self {
            mode,
            host,
            state: RunState::Idle,
            build_order: Vec::new(),
            retrieved: RetrievalSummary::new(),
            built: Vec::new(),
            skipped: Vec::new(),
            bookkeeping_error: None,
            failure: None,
        }
    }
}

/// Composes resolution, materialization, bookkeeping and building
pub struct Orchestrator<'a, M, R> {
    registry: &'a Registry,
    config: &'a RunConfig,
    procedures: ProcedureTable,
    materializer: M,
    runner: R,
    bookkeeper: Option<&'a dyn Bookkeeper>,
    report: RunReport,
}

impl<'a, M, R> Orchestrator<'a, M, R>
where
    M: SourceMaterializer,
    R: CommandRunner,
{
    pub fn new(registry: &'a Registry, config: &'a RunConfig, materializer: M, runner: R) -> Self {
        Self {
            registry,
            config,
            procedures: ProcedureTable::from_registry(registry),
            materializer,
            runner,
            bookkeeper: None,
            report: RunReport::new(config.mode, config.host),
        }
    }

    /// Record retrievals with `bookkeeper`
    #[must_use]
    pub fn with_bookkeeper(mut self, bookkeeper: &'a dyn Bookkeeper) -> Self {
        self.bookkeeper = Some(bookkeeper);
        self
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    fn enter(&mut self, state: RunState) {
        tracing::debug!("{} -> {state}", self.report.state);
        self.report.state = state;
    }

    /// Execute the run
    ///
    /// On failure the report keeps everything done up to that point and the
    /// state becomes [`RunState::Failed`].
    pub async fn run(&mut self) -> Result<(), OrchestratorError> {
        match self.execute().await {
            Ok(()) => {
                self.enter(RunState::Done);
                Ok(())
            }
            Err(error) => {
                self.report.failure = Some(FailureReport::from(&error));
                self.enter(RunState::Failed {
                    stage: error.stage(),
                    detail: error.to_string(),
                });
                Err(error)
            }
        }
    }

    async fn execute(&mut self) -> Result<(), OrchestratorError> {
        self.enter(RunState::Resolving);
        let family = self.config.host.family;
        let selected = filtered_libraries(self.registry, family, false);
        let order = schedule(self.registry, family, &selected)?;
        self.report.build_order.clone_from(&order);

        if self.config.mode.retrieves() {
            let targets = if self.config.get_all {
                self.registry.ids()
            } else {
                order.clone()
            };
            self.enter(RunState::Materializing);
            self.materialize_all(&targets).await?;

            self.enter(RunState::Recording);
            self.record();
        }

        if self.config.mode.builds() {
            self.enter(RunState::Building);
            self.build_all(&order)?;
        }

        Ok(())
    }

    async fn materialize_all(&mut self, targets: &[LibraryId]) -> Result<(), OrchestratorError> {
        for id in targets {
            let record = self
                .registry
                .get(id)
                .ok_or_else(|| RetrievalError::new(id.as_str(), "not in the registry"))?;
            tracing::info!("Retrieving {id} ({})", record.source_kind());
            let outcome = self.materializer.materialize(record).await?;
            self.report.retrieved.push(outcome);
        }
        Ok(())
    }

    fn record(&mut self) {
        let Some(bookkeeper) = self.bookkeeper else {
            tracing::debug!("Bookkeeping disabled");
            return;
        };
        if let Err(e) = bookkeeper.record(&self.report.retrieved) {
            tracing::warn!("Error committing changes: {e}");
            self.report.bookkeeping_error = Some(e.to_string());
        }
    }

    fn build_all(&mut self, order: &[LibraryId]) -> Result<(), OrchestratorError> {
        let context = BuildContext {
            layout: &self.config.layout,
            host: self.config.host,
            cmake_command: &self.config.cmake_command,
            jobs: self.config.jobs,
        };
        let invoker = BuildInvoker::new(self.registry, &self.procedures, context, &self.runner);

        for id in order {
            tracing::info!("Building {id}");
            match invoker.build(id)? {
                BuildOutcome::Built { .. } => self.report.built.push(id.clone()),
                BuildOutcome::NoTemplates => self.report.skipped.push(id.clone()),
            }
        }
        Ok(())
    }
}

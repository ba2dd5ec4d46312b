//! Build invoker
//!
//! Resolves a library's command templates for the host, substitutes its
//! parameters and runs the commands in order, stopping at the first one that
//! fails. Later commands of that library, cleanup included, are skipped.

use crate::core::platform::PlatformFamily;
use crate::core::procedure::{BuildContext, ProcedureTable};
use crate::core::template::substitute;
use crate::error::BuildError;
use crate::infra::process::{CommandRunner, ShellStrategy};
use crate::registry::{LibraryId, Registry};

/// What building one library amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Every command succeeded
    Built { commands: usize },
    /// The library declares no commands for this host family
    NoTemplates,
}

/// Builds libraries one at a time
#[derive(Debug)]
pub struct BuildInvoker<'a, R> {
    registry: &'a Registry,
    procedures: &'a ProcedureTable,
    context: BuildContext<'a>,
    shell: ShellStrategy,
    runner: R,
}

impl<'a, R: CommandRunner> BuildInvoker<'a, R> {
    pub fn new(
        registry: &'a Registry,
        procedures: &'a ProcedureTable,
        context: BuildContext<'a>,
        runner: R,
    ) -> Self {
        let shell = ShellStrategy::for_family(context.host.family);
        Self {
            registry,
            procedures,
            context,
            shell,
            runner,
        }
    }

    fn family(&self) -> PlatformFamily {
        self.context.host.family
    }

    /// Build one library
    pub fn build(&self, id: &LibraryId) -> Result<BuildOutcome, BuildError> {
        let Some(templates) = self
            .registry
            .get(id)
            .and_then(|record| record.build.for_family(self.family()))
        else {
            tracing::info!("No build commands found for {id}");
            return Ok(BuildOutcome::NoTemplates);
        };

        let prepared = self.procedures.prepare(id, &self.context);

        for (position, template) in templates.iter().enumerate() {
            let index = position + 1;
            let command = substitute(template, &prepared.params);
            tracing::info!("[{id} {index}/{}] {command}", templates.len());

            let invocation = self.shell.invocation(&command, &prepared.working_dir);
            let status = self
                .runner
                .run(&invocation)
                .map_err(|error| BuildError::Spawn {
                    library: id.to_string(),
                    index,
                    error,
                })?;

            if !status.success() {
                return Err(BuildError::CommandFailed {
                    library: id.to_string(),
                    index,
                    command,
                    status: status.to_string(),
                });
            }
        }

        Ok(BuildOutcome::Built {
            commands: templates.len(),
        })
    }
}

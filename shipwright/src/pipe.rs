//! The stage contract and the executor that runs stages in order

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use miette::Diagnostic;
use shipwright_schema::Build;
use tracing::info;

use crate::context::Context;
use crate::errors::{DistError, DistResult};

/// Outcome of a stage's run step that isn't plain success
#[derive(Debug)]
pub enum PipeError {
    /// The stage had nothing to do; the run keeps going
    Skipped {
        /// why it was skipped
        reason: String,
    },
    /// The stage failed; the run stops here
    Failed(DistError),
}

impl From<DistError> for PipeError {
    fn from(e: DistError) -> Self {
        PipeError::Failed(e)
    }
}

/// Result of a stage's run step
pub type PipeResult = std::result::Result<(), PipeError>;

/// Skip the current stage
pub fn skip(reason: impl Into<String>) -> PipeResult {
    Err(PipeError::Skipped {
        reason: reason.into(),
    })
}

/// A handle that lets someone outside the run ask it to stop
///
/// The executor only looks at this between stages, so whatever a stage
/// started always gets to finish.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// A fresh, not-cancelled handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop before the next stage
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether someone asked us to stop
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One stage of the release pipeline
pub trait Pipe: Send + Sync {
    /// Human readable name, used for logging and errors
    fn description(&self) -> &'static str;

    /// Fill in unset config with defaults
    fn defaults(&self, _ctx: &mut Context) -> DistResult<()> {
        Ok(())
    }

    /// Do the work
    fn run(&self, ctx: &Context, cancel: &Cancellation) -> PipeResult;
}

/// Run every stage in order
///
/// Each stage gets its defaults applied and is then run. A skip is logged and
/// the next stage runs; any error stops the run and is returned tagged with the
/// stage that produced it.
pub fn execute(
    ctx: &mut Context,
    pipes: &[Box<dyn Pipe>],
    cancel: &Cancellation,
) -> DistResult<()> {
    for pipe in pipes {
        let stage = pipe.description();
        if cancel.is_cancelled() {
            return Err(DistError::Cancelled { stage });
        }
        info!("{stage}");

        pipe.defaults(ctx).map_err(|e| DistError::StageDefaults {
            stage,
            help: carried_help(&e),
            details: Box::new(e),
        })?;

        match pipe.run(ctx, cancel) {
            Ok(()) => {}
            Err(PipeError::Skipped { reason }) => {
                info!("  skipped: {reason}");
            }
            Err(PipeError::Failed(e)) => {
                return Err(DistError::StageFailed {
                    stage,
                    help: carried_help(&e),
                    details: Box::new(e),
                });
            }
        }
    }
    Ok(())
}

fn carried_help(e: &DistError) -> Option<String> {
    e.help().map(|h| h.to_string())
}

/// Run `work` once per folder group, all at once, and wait for every one of them
///
/// Every folder is attempted even if some fail. The error returned is the one from
/// the first failing folder in folder order.
pub fn for_each_folder<F>(groups: &BTreeMap<String, Vec<Build>>, work: F) -> DistResult<()>
where
    F: Fn(&str, &[Build]) -> DistResult<()> + Sync,
{
    let work = &work;
    let results: Vec<DistResult<()>> = std::thread::scope(|s| {
        let handles: Vec<_> = groups
            .iter()
            .map(|(folder, builds)| s.spawn(move || work(folder, builds)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });
    results.into_iter().collect()
}

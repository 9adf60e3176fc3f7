//! Runs a resolved [`Pipeline`] against a [`FileSystem`]: dependency-ordered
//! execution, backup budgeting, and rollback-closure construction (§4.6,
//! §4.7). Validation/dependency/prerequisite errors halt the batch before
//! any operation runs; once execution starts, per-operation failures are
//! collected rather than propagated, so the caller sees every failure in
//! one report instead of only the first.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::backup::{BackupBudget, BackupData};
use crate::error::{Error, Result};
use crate::fs_backend::FileSystem;
use crate::operation::{ExecContext, Operation};
use crate::pipeline::Pipeline;

#[derive(Debug, Clone)]
pub enum OperationEvent {
    Started { op_id: String, description: String },
    BackedUp { op_id: String, size_mb: f64 },
    Completed { op_id: String },
    Failed { op_id: String, reason: String },
}

/// Bounded channel so a slow/absent subscriber cannot make the executor
/// block indefinitely; events are best-effort and dropped on a full
/// queue rather than applying backpressure to the batch.
pub struct EventBus {
    sender: SyncSender<OperationEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> (Self, Receiver<OperationEvent>) {
        let (sender, receiver) = sync_channel(capacity.max(1));
        (EventBus { sender }, receiver)
    }

    fn emit(&self, event: OperationEvent) {
        let _ = self.sender.try_send(event);
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// When set, each operation computes its reverse operations and
    /// backup payload before executing, contributing to `restore` and
    /// the budget. Independent of the rollback closure, which is always
    /// produced from `rollback()`, restorable or not.
    pub restorable: bool,
    pub max_backup_size_mb: f64,
    pub resolve_prerequisites: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        ExecutionOptions {
            restorable: false,
            max_backup_size_mb: 512.0,
            resolve_prerequisites: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OpStatus {
    Success,
    Failure,
    Skipped,
}

#[derive(Debug)]
pub struct OperationResult {
    pub operation_id: String,
    pub status: OpStatus,
    pub error: Option<Error>,
    /// Wall-clock time spent on this operation's reverse_ops + execute,
    /// `Duration::ZERO` for operations skipped after cancellation.
    pub duration: Duration,
    /// The backup payload computed for this operation, if any (mirrors
    /// one entry of `ExecutionReport::backups`, kept here too so a
    /// caller correlating per-operation results doesn't have to
    /// cross-reference the two lists by id).
    pub backup_data: Option<BackupData>,
    pub backup_size_mb: f64,
}

/// Undoes a completed (or partially completed) run by invoking
/// `rollback(ctx, fs)` on every successfully executed operation, in
/// reverse execution order (§4.6 step 6). Invocation is always the
/// caller's choice — the executor never calls this itself. An empty
/// executed set yields a no-op handle.
pub struct RollbackHandle {
    steps: Vec<Box<dyn Operation>>,
}

impl RollbackHandle {
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn run(self, ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()> {
        let mut errors = Vec::new();
        for op in self.steps {
            if let Err(e) = op.rollback(ctx, fs) {
                errors.push(e);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::rollback_errors(errors))
        }
    }
}

/// Operations to run, in order, to restore a batch's pre-execution
/// filesystem state including backed-up content — built only when
/// `options.restorable` is set (§4.7). Distinct from [`RollbackHandle`],
/// which is always available and undoes via each operation's own
/// `rollback()` rather than replayed backups.
pub struct RestoreHandle {
    steps: Vec<Box<dyn Operation>>,
}

impl RestoreHandle {
    pub fn run(self, ctx: &ExecContext, fs: &dyn FileSystem) -> Result<()> {
        for op in self.steps {
            op.execute(ctx, fs)?;
        }
        Ok(())
    }
}

pub struct ExecutionReport {
    pub success: bool,
    pub cancelled: bool,
    pub operations: Vec<OperationResult>,
    pub backups: Vec<BackupData>,
    pub budget: Option<BackupBudget>,
    pub rollback: RollbackHandle,
    pub restore: Option<RestoreHandle>,
    /// Total wall-clock time spent in [`Executor::run`], from before the
    /// first operation to after the last.
    pub duration: Duration,
}

impl ExecutionReport {
    pub fn executed_ids(&self) -> Vec<&str> {
        self.operations
            .iter()
            .filter(|r| r.status == OpStatus::Success)
            .map(|r| r.operation_id.as_str())
            .collect()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Error> {
        self.operations.iter().filter_map(|r| r.error.as_ref())
    }
}

/// Serializable per-operation summary for `--json` CLI output (not
/// `OperationResult` itself, since `Error` carries an `io::Error` source
/// that doesn't derive `Serialize` — this flattens it to its `Display`
/// string).
#[derive(Debug, Clone, Serialize)]
pub struct OperationDescriptor {
    pub operation_id: String,
    pub status: OpStatus,
    pub duration_ms: u128,
    pub backup_size_mb: f64,
    pub error: Option<String>,
}

impl From<&OperationResult> for OperationDescriptor {
    fn from(result: &OperationResult) -> Self {
        OperationDescriptor {
            operation_id: result.operation_id.clone(),
            status: result.status,
            duration_ms: result.duration.as_millis(),
            backup_size_mb: result.backup_size_mb,
            error: result.error.as_ref().map(|e| e.to_string()),
        }
    }
}

/// Serializable whole-run summary (§3's "Batch result", extended with
/// serde per the ambient-stack note). Built on demand from
/// [`ExecutionReport`]; the report itself stays non-`Serialize` since it
/// owns the rollback/restore closures.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub success: bool,
    pub cancelled: bool,
    pub duration_ms: u128,
    pub operations: Vec<OperationDescriptor>,
    pub budget: Option<BackupBudget>,
}

impl From<&ExecutionReport> for BatchResult {
    fn from(report: &ExecutionReport) -> Self {
        BatchResult {
            success: report.success,
            cancelled: report.cancelled,
            duration_ms: report.duration.as_millis(),
            operations: report.operations.iter().map(OperationDescriptor::from).collect(),
            budget: report.budget.clone(),
        }
    }
}

pub struct Executor<'a> {
    fs: &'a dyn FileSystem,
    events: Option<EventBus>,
}

impl<'a> Executor<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Executor { fs, events: None }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Execute every operation in `pipeline`'s resolved order (§4.6 step
    /// 5). Pre-execution failures (prerequisite resolution, topological
    /// ordering, structural validation) are the caller's responsibility
    /// to have surfaced before calling `run` — this method assumes the
    /// pipeline it's handed is already resolved and validated. Once the
    /// loop starts, a per-operation failure never aborts the run; it is
    /// recorded in the report and execution continues with the
    /// remaining operations so the caller gets maximum information.
    pub fn run(&self, pipeline: &Pipeline, ctx: &ExecContext, options: &ExecutionOptions) -> Result<ExecutionReport> {
        let run_start = Instant::now();
        let mut budget = if options.restorable {
            Some(BackupBudget::new(options.max_backup_size_mb))
        } else {
            None
        };

        let mut executed: Vec<Box<dyn Operation>> = Vec::new();
        let mut results = Vec::new();
        let mut restore_steps: Vec<Box<dyn Operation>> = Vec::new();
        let mut backups = Vec::new();
        let mut cancelled = false;

        for op in pipeline.operations() {
            if cancelled || ctx.is_cancelled() {
                cancelled = true;
                results.push(OperationResult {
                    operation_id: op.id().to_string(),
                    status: OpStatus::Skipped,
                    error: None,
                    duration: Duration::ZERO,
                    backup_data: None,
                    backup_size_mb: 0.0,
                });
                continue;
            }

            let op_start = Instant::now();
            self.emit(OperationEvent::Started {
                op_id: op.id().to_string(),
                description: op.describe(),
            });

            let mut backup_data = None;
            let mut op_restore_ops = Vec::new();
            let mut budget_exceeded_err = None;

            if let Some(budget) = budget.as_mut() {
                match op.reverse_ops(ctx, self.fs, budget) {
                    Ok(outcome) => {
                        if let Some(backup) = outcome.backup_data {
                            self.emit(OperationEvent::BackedUp {
                                op_id: op.id().to_string(),
                                size_mb: backup.size_mb,
                            });
                            backup_data = Some(backup);
                        }
                        op_restore_ops = outcome.restore_ops;
                    }
                    Err(e @ Error::BudgetExceeded { .. }) => {
                        // Backing up this operation would blow the budget:
                        // the operation itself does not run, so the
                        // filesystem is left untouched (§8 S5).
                        self.emit(OperationEvent::Failed {
                            op_id: op.id().to_string(),
                            reason: e.to_string(),
                        });
                        budget_exceeded_err = Some(e);
                    }
                    Err(e) => {
                        // Any other reverse_ops failure is not terminal: the
                        // operation still proceeds without a backup (§4.6
                        // 5a), so it must not emit Failed here — that event
                        // is reserved for the operation's actual outcome.
                        tracing::warn!(op_id = %op.id(), error = %e, "reverse_ops failed, continuing without backup");
                    }
                }
            }

            if let Some(e) = budget_exceeded_err {
                results.push(OperationResult {
                    operation_id: op.id().to_string(),
                    status: OpStatus::Failure,
                    error: Some(e),
                    duration: op_start.elapsed(),
                    backup_data: None,
                    backup_size_mb: 0.0,
                });
                continue;
            }

            match op.execute(ctx, self.fs) {
                Ok(()) => {
                    let backup_size_mb = backup_data.as_ref().map(|b| b.size_mb).unwrap_or(0.0);
                    if let Some(backup) = backup_data.clone() {
                        backups.push(backup);
                    }
                    restore_steps.extend(op_restore_ops);
                    results.push(OperationResult {
                        operation_id: op.id().to_string(),
                        status: OpStatus::Success,
                        error: None,
                        duration: op_start.elapsed(),
                        backup_data,
                        backup_size_mb,
                    });
                    self.emit(OperationEvent::Completed { op_id: op.id().to_string() });
                    executed.push(op.box_clone());
                }
                Err(e) => {
                    if let (Some(budget), Some(backup)) = (budget.as_mut(), backup_data.as_ref()) {
                        budget.release(backup.size_mb);
                    }
                    self.emit(OperationEvent::Failed {
                        op_id: op.id().to_string(),
                        reason: e.to_string(),
                    });
                    results.push(OperationResult {
                        operation_id: op.id().to_string(),
                        status: OpStatus::Failure,
                        error: Some(e),
                        duration: op_start.elapsed(),
                        backup_data: None,
                        backup_size_mb: 0.0,
                    });
                }
            }
        }

        restore_steps.reverse();
        executed.reverse();
        let success = !cancelled && results.iter().all(|r| r.status != OpStatus::Failure);

        Ok(ExecutionReport {
            success,
            cancelled,
            operations: results,
            backups,
            budget,
            rollback: RollbackHandle { steps: executed },
            restore: if options.restorable {
                Some(RestoreHandle { steps: restore_steps })
            } else {
                None
            },
            duration: run_start.elapsed(),
        })
    }

    fn emit(&self, event: OperationEvent) {
        if let Some(bus) = &self.events {
            bus.emit(event);
        }
    }
}

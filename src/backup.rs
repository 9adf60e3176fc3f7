//! Backup budget accounting and the backup payload shape used to make a
//! batch restorable (§3, §4.7).

use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BackupKind {
    None,
    File,
    Dir,
    Meta,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupData {
    pub operation_id: String,
    pub backup_type: BackupKind,
    pub original_path: PathBuf,
    #[serde(skip)]
    pub content: Vec<u8>,
    pub mode: u32,
    #[serde(skip)]
    pub timestamp: Option<SystemTime>,
    pub size_mb: f64,
    pub metadata: HashMap<String, String>,
}

impl BackupData {
    pub fn none(operation_id: impl Into<String>, original_path: impl Into<PathBuf>) -> Self {
        BackupData {
            operation_id: operation_id.into(),
            backup_type: BackupKind::None,
            original_path: original_path.into(),
            content: Vec::new(),
            mode: 0,
            timestamp: None,
            size_mb: 0.0,
            metadata: HashMap::new(),
        }
    }
}

pub const BYTES_PER_MB: f64 = 1_048_576.0;

/// `used_mb + remaining_mb == total_mb` is maintained as an invariant by
/// every mutating method below — never reached via direct field writes.
#[derive(Debug, Clone, Serialize)]
pub struct BackupBudget {
    total_mb: f64,
    used_mb: f64,
}

impl BackupBudget {
    pub fn new(total_mb: f64) -> Self {
        BackupBudget {
            total_mb,
            used_mb: 0.0,
        }
    }

    pub fn total_mb(&self) -> f64 {
        self.total_mb
    }

    pub fn used_mb(&self) -> f64 {
        self.used_mb
    }

    pub fn remaining_mb(&self) -> f64 {
        self.total_mb - self.used_mb
    }

    /// Reserve `size_mb` megabytes, failing without mutating state if the
    /// budget would go negative.
    pub fn reserve(&mut self, size_mb: f64) -> Result<()> {
        if size_mb > self.remaining_mb() {
            return Err(Error::BudgetExceeded {
                needed_mb: size_mb,
                remaining_mb: self.remaining_mb(),
            });
        }
        self.used_mb += size_mb;
        Ok(())
    }

    /// Release a previously reserved amount (e.g. when the operation that
    /// reserved it subsequently failed to execute).
    pub fn release(&mut self, size_mb: f64) {
        self.used_mb = (self.used_mb - size_mb).max(0.0);
    }
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_conserves_total() {
        let mut budget = BackupBudget::new(10.0);
        budget.reserve(3.0).unwrap();
        assert_eq!(budget.used_mb() + budget.remaining_mb(), budget.total_mb());
        budget.release(3.0);
        assert_eq!(budget.used_mb(), 0.0);
        assert_eq!(budget.remaining_mb(), 10.0);
    }

    #[test]
    fn reserve_over_budget_fails_without_mutating() {
        let mut budget = BackupBudget::new(1.0);
        let err = budget.reserve(2.0).unwrap_err();
        assert!(matches!(err, Error::BudgetExceeded { .. }));
        assert_eq!(budget.used_mb(), 0.0);
        assert_eq!(budget.remaining_mb(), 1.0);
    }
}

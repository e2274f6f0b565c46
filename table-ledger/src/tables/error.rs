use super::storage::StorageError;
use rust_decimal::Decimal;
use shared::sitting::{CommandError, CommandErrorCode};
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Dish not found: {0}")]
    DishNotFound(String),

    #[error("Sitting not found: {0}")]
    SittingNotFound(String),

    #[error("Payment of {amount} exceeds remaining balance {remaining}")]
    Overpayment { amount: Decimal, remaining: Decimal },

    #[error("Dish already paid: {0}")]
    AlreadyPaid(String),

    #[error("No pending split share for {0}")]
    NoPendingShare(String),

    #[error("No active sitting for table: {0}")]
    NoActiveSitting(String),

    #[error("Sitting already closed: {0}")]
    SittingClosed(String),

    #[error("Table is busy: {0}")]
    Busy(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// 将存储错误转换为错误码（前端负责本地化）
fn classify_storage_error(e: &StorageError) -> CommandErrorCode {
    if let StorageError::Serialization(_) = e {
        return CommandErrorCode::InternalError;
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();

    // 磁盘空间不足
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return CommandErrorCode::StorageFull;
    }

    // 内存不足
    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return CommandErrorCode::OutOfMemory;
    }

    // 数据损坏
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return CommandErrorCode::StorageCorrupted;
    }

    CommandErrorCode::SystemBusy
}

impl From<LedgerError> for CommandError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                CommandError::new(code, message)
            }
            LedgerError::Validation(_) => {
                CommandError::new(CommandErrorCode::ValidationFailed, message)
            }
            LedgerError::DishNotFound(_) => {
                CommandError::new(CommandErrorCode::DishNotFound, message)
            }
            LedgerError::SittingNotFound(_) => {
                CommandError::new(CommandErrorCode::SittingNotFound, message)
            }
            LedgerError::Overpayment { remaining, .. } => {
                CommandError::new(CommandErrorCode::Overpayment, message).with_remaining(remaining)
            }
            LedgerError::AlreadyPaid(_) => {
                CommandError::new(CommandErrorCode::AlreadyPaid, message)
            }
            LedgerError::NoPendingShare(_) => {
                CommandError::new(CommandErrorCode::NoPendingShare, message)
            }
            LedgerError::NoActiveSitting(_) => {
                CommandError::new(CommandErrorCode::NoActiveSitting, message)
            }
            LedgerError::SittingClosed(_) => {
                CommandError::new(CommandErrorCode::SittingClosed, message)
            }
            LedgerError::Busy(_) => CommandError::new(CommandErrorCode::SystemBusy, message),
            LedgerError::Internal(_) => CommandError::new(CommandErrorCode::InternalError, message),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

//! Table Ledger - 桌台账单结算与分账引擎
//!
//! # 架构概述
//!
//! 一张桌台在一次用餐 (sitting) 中累积多位食客的点单。支付可以按单品、
//! 按金额或按分账份额进行，三种方式可自由混用，余额归零时自动关账。
//!
//! # 模块结构
//!
//! ```text
//! table-ledger/src/
//! ├── core/          # 配置
//! ├── utils/         # 日志
//! └── tables/        # 账本、点单、支付、分账、存储、通知
//! ```

pub mod core;
pub mod tables;
pub mod utils;

// Re-export 公共类型
pub use crate::core::LedgerConfig;
pub use tables::{
    BroadcastNotifier, LedgerError, LedgerResult, LedgerStorage, MaterialityPolicy, NotifyError,
    RealtimeNotifier, StorageError, TableLedgerManager,
};
pub use utils::logger::{init_logger, init_logger_with_file};

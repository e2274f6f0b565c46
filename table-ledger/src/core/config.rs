use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 账本配置 - table ledger settings
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (redb 文件, 日志) |
/// | LEDGER_DB_FILE | table_ledger.redb | redb 文件名 |
/// | MATERIALITY_THRESHOLD | 10.00 | 分账重算时视为"已自付"的贡献下限 |
/// | LOCK_TIMEOUT_MS | 5000 | 等待单桌写锁的超时(毫秒) |
/// | EVENT_CHANNEL_CAPACITY | 4096 | 实时通知广播通道容量 |
/// | COMMAND_RETENTION_SECS | 86400 | 已关账桌次的命令幂等记录保留时长(秒) |
/// | LOG_LEVEL | info | 日志级别 |
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// 工作目录
    pub work_dir: String,
    /// redb database file name, relative to `work_dir`
    pub db_file: String,
    /// Contribution at or above which a diner counts as having paid their
    /// own way outside the split
    pub materiality_threshold: Decimal,
    /// Upper bound for waiting on a table's write lock
    pub lock_timeout_ms: u64,
    /// Capacity of the realtime broadcast channel
    pub event_channel_capacity: usize,
    /// How long command ids of a closed sitting still replay their outcome
    pub command_retention_secs: u64,
    /// 日志级别
    pub log_level: String,
}

impl LedgerConfig {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            db_file: std::env::var("LEDGER_DB_FILE")
                .unwrap_or_else(|_| "table_ledger.redb".into()),
            materiality_threshold: std::env::var("MATERIALITY_THRESHOLD")
                .ok()
                .and_then(|v| Decimal::from_str(&v).ok())
                .filter(|d| !d.is_sign_negative())
                .unwrap_or(Decimal::TEN),
            lock_timeout_ms: std::env::var("LOCK_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            event_channel_capacity: std::env::var("EVENT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|c: &usize| *c > 0)
                .unwrap_or(4096),
            command_retention_secs: std::env::var("COMMAND_RETENTION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24 * 60 * 60),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
        }
    }

    /// 使用自定义工作目录覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// Full path of the redb file
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join(&self.db_file)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn command_retention(&self) -> Duration {
        Duration::from_secs(self.command_retention_secs)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

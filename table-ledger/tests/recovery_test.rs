//! 重启恢复测试
//!
//! 打开的账单、已处理命令和审计日志都必须在进程重启后保留

use rust_decimal::Decimal;
use shared::sitting::{DishInput, Owner, SittingStatus, TableCommand, TableCommandPayload};
use table_ledger::{LedgerConfig, LedgerError, TableLedgerManager};
use tempfile::TempDir;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn config_for(dir: &TempDir) -> LedgerConfig {
    let mut config = LedgerConfig::with_overrides(dir.path().to_string_lossy());
    config.materiality_threshold = Decimal::TEN;
    config
}

fn place(table_id: &str, owner: &str, name: &str, price: &str) -> TableCommand {
    TableCommand::new(TableCommandPayload::PlaceDishOrder {
        table_id: table_id.to_string(),
        owner: Owner::named(owner),
        dish: DishInput::new(name, 1, dec(price)),
    })
}

fn pay(table_id: &str, amount: &str) -> TableCommand {
    TableCommand::new(TableCommandPayload::PayAmount {
        table_id: table_id.to_string(),
        amount: dec(amount),
        owner: None,
    })
}

#[tokio::test]
async fn test_open_sittings_survive_restart() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);

    let retried = pay("R1", "12.00");
    let (sitting_id, first_outcome) = {
        let manager = TableLedgerManager::new(&config).unwrap();
        manager.execute(place("R1", "Ana", "Paella", "30.00")).await.unwrap();
        manager.execute(place("R1", "Luis", "Wine", "14.00")).await.unwrap();
        let outcome = manager.execute(retried.clone()).await.unwrap();
        manager
            .execute(TableCommand::new(TableCommandPayload::InitializeSplit {
                table_id: "R1".into(),
                number_of_people: 2,
                participants: vec![Owner::named("Ana"), Owner::named("Luis")],
            }))
            .await
            .unwrap();
        (outcome.sitting_id.clone().unwrap(), outcome)
    };

    let manager = TableLedgerManager::new(&config).unwrap();
    let summary = manager.get_summary("R1").unwrap();
    assert_eq!(summary.sitting_id, sitting_id);
    assert_eq!(summary.status, SittingStatus::Open);
    assert_eq!(summary.total_amount, dec("44.00"));
    assert_eq!(summary.paid_amount, dec("12.00"));
    assert_eq!(summary.remaining_amount, dec("32.00"));
    assert_eq!(manager.list_dish_orders("R1").len(), 2);
    assert_eq!(manager.list_participants("R1").len(), 2);

    let split = manager.get_split_status("R1").unwrap();
    assert_eq!(split.pending_count, 2);
    assert!(split.shares.iter().all(|s| s.expected_amount == dec("16.00")));

    // retry after restart replays, does not re-apply
    let replayed = manager.execute(retried).await.unwrap();
    assert_eq!(replayed, first_outcome);
    assert_eq!(manager.get_summary("R1").unwrap().paid_amount, dec("12.00"));

    // dish index survives too
    let dish_id = manager.list_dish_orders("R1")[1].dish_id.clone();
    manager
        .execute(TableCommand::new(TableCommandPayload::PayDish { dish_id }))
        .await
        .unwrap();
    assert_eq!(manager.get_summary("R1").unwrap().remaining_amount, dec("18.00"));
}

#[tokio::test]
async fn test_closed_sittings_stay_closed_after_restart() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);

    let sitting_id = {
        let manager = TableLedgerManager::new(&config).unwrap();
        manager.execute(place("R2", "Ana", "Soup", "8.00")).await.unwrap();
        let outcome = manager.execute(pay("R2", "8.00")).await.unwrap();
        assert!(outcome.sitting_closed);
        outcome.sitting_id.unwrap()
    };

    let manager = TableLedgerManager::new(&config).unwrap();
    assert!(manager.get_summary("R2").is_none());
    assert!(manager.get_open_sittings().is_empty());

    let closed = manager.get_closed_sitting(&sitting_id).unwrap().unwrap();
    assert_eq!(closed.status, SittingStatus::Closed);
    assert_eq!(closed.paid_amount, dec("8.00"));
    assert!(closed.closed_at.is_some());

    let events = manager.get_sitting_events(&sitting_id).unwrap();
    assert_eq!(events.last().unwrap().sequence, closed.last_sequence);

    let err = manager.execute(pay("R2", "1.00")).await.unwrap_err();
    assert!(matches!(err, LedgerError::NoActiveSitting(_)));

    // a new order opens a fresh sitting
    let outcome = manager.execute(place("R2", "Luis", "Tea", "2.00")).await.unwrap();
    assert_ne!(outcome.sitting_id.unwrap(), sitting_id);
}

use super::*;
use crate::tables::storage::LedgerStorage;
use rust_decimal::Decimal;
use shared::sitting::{
    CommandErrorCode, DishInput, KitchenStatus, Owner, SittingEventType, SittingStatus,
};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn test_config() -> LedgerConfig {
    let mut config = LedgerConfig::with_overrides(std::env::temp_dir().to_string_lossy());
    config.materiality_threshold = Decimal::TEN;
    config.lock_timeout_ms = 5000;
    config.event_channel_capacity = 256;
    config.command_retention_secs = 24 * 60 * 60;
    config
}

fn create_test_manager() -> TableLedgerManager {
    let storage = LedgerStorage::open_in_memory().unwrap();
    TableLedgerManager::with_storage(storage, &test_config()).unwrap()
}

// ========================================================================
// Command helpers
// ========================================================================

fn place_cmd(table_id: &str, owner: Owner, name: &str, quantity: i32, price: &str) -> TableCommand {
    TableCommand::new(TableCommandPayload::PlaceDishOrder {
        table_id: table_id.to_string(),
        owner,
        dish: DishInput::new(name, quantity, dec(price)),
    })
}

fn pay_amount_cmd(table_id: &str, amount: &str) -> TableCommand {
    TableCommand::new(TableCommandPayload::PayAmount {
        table_id: table_id.to_string(),
        amount: dec(amount),
        owner: None,
    })
}

fn pay_dish_cmd(dish_id: &str) -> TableCommand {
    TableCommand::new(TableCommandPayload::PayDish {
        dish_id: dish_id.to_string(),
    })
}

fn split_cmd(table_id: &str, n: u32, participants: Vec<Owner>) -> TableCommand {
    TableCommand::new(TableCommandPayload::InitializeSplit {
        table_id: table_id.to_string(),
        number_of_people: n,
        participants,
    })
}

fn pay_share_cmd(table_id: &str, participant: Owner) -> TableCommand {
    TableCommand::new(TableCommandPayload::PaySplitShare {
        table_id: table_id.to_string(),
        participant,
    })
}

fn kitchen_cmd(dish_id: &str, status: &str) -> TableCommand {
    TableCommand::new(TableCommandPayload::UpdateKitchenStatus {
        dish_id: dish_id.to_string(),
        status: status.to_string(),
    })
}

/// Place a dish and return its id
async fn place(
    manager: &TableLedgerManager,
    table_id: &str,
    owner: &str,
    quantity: i32,
    price: &str,
) -> String {
    let outcome = manager
        .execute(place_cmd(table_id, Owner::named(owner), "Dish", quantity, price))
        .await
        .expect("place dish order");
    outcome.dish_id.expect("dish id")
}

/// Ledger invariants every committed state must satisfy
fn assert_ledger_consistent(manager: &TableLedgerManager, table_id: &str) {
    if let Some(snapshot) = manager.get_snapshot(table_id) {
        let line_sum: Decimal = snapshot.dishes.iter().map(|d| d.line_total).sum();
        assert_eq!(snapshot.total_amount, line_sum);
        assert!(snapshot.paid_amount >= Decimal::ZERO);
        assert!(snapshot.paid_amount <= snapshot.total_amount);
        assert_eq!(
            snapshot.remaining_amount,
            snapshot.total_amount - snapshot.paid_amount
        );
        assert!(snapshot.remaining_amount >= Decimal::ZERO);
        assert_eq!(snapshot.status, SittingStatus::Open);
    }
}

mod test_flows;

use super::*;

// ========================================================================
//  核心业务流程测试
// ========================================================================

// ------------------------------------------------------------------------
// 三位食客点单 → 按金额多次支付 → 超额被拒 → 结清关账
// ------------------------------------------------------------------------
#[tokio::test]
async fn test_mixed_diners_pay_by_amount_until_closed() {
    let manager = create_test_manager();
    let table = "T1";

    place(&manager, table, "Ana", 1, "45.00").await;
    place(&manager, table, "Luis", 1, "28.50").await;
    place(&manager, table, "Carmen", 1, "16.50").await;

    let summary = manager.get_summary(table).unwrap();
    assert_eq!(summary.total_amount, dec("90.00"));
    assert_eq!(summary.paid_amount, Decimal::ZERO);
    assert_eq!(summary.remaining_amount, dec("90.00"));
    assert_eq!(summary.item_count, 3);

    manager.execute(pay_amount_cmd(table, "50.00")).await.unwrap();
    let summary = manager.get_summary(table).unwrap();
    assert_eq!(summary.paid_amount, dec("50.00"));
    assert_eq!(summary.remaining_amount, dec("40.00"));

    // 2 × 4.00
    place(&manager, table, "Dana", 2, "4.00").await;
    let summary = manager.get_summary(table).unwrap();
    assert_eq!(summary.total_amount, dec("98.00"));
    assert_eq!(summary.remaining_amount, dec("48.00"));

    manager.execute(pay_amount_cmd(table, "25.00")).await.unwrap();
    assert_eq!(manager.get_summary(table).unwrap().remaining_amount, dec("23.00"));

    let err = manager.execute(pay_amount_cmd(table, "50.00")).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Overpayment { remaining, .. } if remaining == dec("23.00")
    ));
    assert_eq!(manager.get_summary(table).unwrap().remaining_amount, dec("23.00"));
    assert_ledger_consistent(&manager, table);

    let outcome = manager.execute(pay_amount_cmd(table, "23.00")).await.unwrap();
    assert!(outcome.sitting_closed);
    let final_summary = outcome.summary.unwrap();
    assert_eq!(final_summary.status, SittingStatus::Closed);
    assert_eq!(final_summary.remaining_amount, Decimal::ZERO);

    assert!(manager.get_summary(table).is_none());
}

#[tokio::test]
async fn test_overpayment_response_carries_remaining() {
    let manager = create_test_manager();
    place(&manager, "T2", "Ana", 1, "10.00").await;

    let resp = manager.execute_command(pay_amount_cmd("T2", "10.01")).await;
    assert!(!resp.success);
    assert!(resp.outcome.is_none());
    let error = resp.error.unwrap();
    assert_eq!(error.code, CommandErrorCode::Overpayment);
    assert_eq!(error.remaining_amount, Some(dec("10.00")));
}

// ------------------------------------------------------------------------
// 单品支付: 只能支付一次
// ------------------------------------------------------------------------
#[tokio::test]
async fn test_pay_dish_only_once() {
    let manager = create_test_manager();
    let paella = place(&manager, "T3", "Ana", 1, "45.00").await;
    place(&manager, "T3", "Luis", 1, "28.50").await;

    let outcome = manager.execute(pay_dish_cmd(&paella)).await.unwrap();
    assert_eq!(outcome.amount_applied, Some(dec("45.00")));
    assert!(!outcome.sitting_closed);

    let err = manager.execute(pay_dish_cmd(&paella)).await.unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyPaid(_)));

    let summary = manager.get_summary("T3").unwrap();
    assert_eq!(summary.paid_amount, dec("45.00"));

    let ana = manager
        .list_participants("T3")
        .into_iter()
        .find(|p| p.owner == Owner::named("Ana"))
        .unwrap();
    assert_eq!(ana.contributions.total_paid_individual, dec("45.00"));
}

#[tokio::test]
async fn test_pay_unknown_dish() {
    let manager = create_test_manager();
    let err = manager.execute(pay_dish_cmd("no-such-dish")).await.unwrap_err();
    assert!(matches!(err, LedgerError::DishNotFound(_)));
}

#[tokio::test]
async fn test_pay_dish_of_closed_sitting() {
    let manager = create_test_manager();
    let soup = place(&manager, "T4", "Ana", 1, "6.00").await;
    let bread = place(&manager, "T4", "Ana", 1, "2.00").await;

    manager.execute(pay_dish_cmd(&soup)).await.unwrap();
    manager.execute(pay_amount_cmd("T4", "2.00")).await.unwrap();
    assert!(manager.get_summary("T4").is_none());

    // paid before closure
    let err = manager.execute(pay_dish_cmd(&soup)).await.unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyPaid(_)));
    // covered by the amount payment, the bill is gone
    let err = manager.execute(pay_dish_cmd(&bread)).await.unwrap_err();
    assert!(matches!(err, LedgerError::NoActiveSitting(_)));
}

// ------------------------------------------------------------------------
// 无账单时的读写
// ------------------------------------------------------------------------
#[tokio::test]
async fn test_no_active_sitting_before_and_after() {
    let manager = create_test_manager();
    let table = "T5";

    assert!(manager.get_summary(table).is_none());
    assert!(manager.get_split_status(table).is_none());
    assert!(manager.list_dish_orders(table).is_empty());
    assert!(manager.list_participants(table).is_empty());

    let err = manager.execute(pay_amount_cmd(table, "5.00")).await.unwrap_err();
    assert!(matches!(err, LedgerError::NoActiveSitting(_)));
    let err = manager
        .execute(split_cmd(table, 2, vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NoActiveSitting(_)));
    let err = manager
        .execute(pay_share_cmd(table, Owner::named("Ana")))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NoActiveSitting(_)));

    place(&manager, table, "Ana", 1, "20.00").await;
    place(&manager, table, "Luis", 1, "20.00").await;
    manager.execute(split_cmd(table, 2, vec![])).await.unwrap();
    assert_eq!(manager.list_participants(table).len(), 2);
    manager.execute(pay_amount_cmd(table, "40.00")).await.unwrap();

    assert!(manager.get_summary(table).is_none());
    assert!(manager.get_split_status(table).is_none());
    assert!(manager.list_dish_orders(table).is_empty());
    assert!(manager.list_participants(table).is_empty());

    // next diner starts a fresh sitting
    place(&manager, table, "Marta", 1, "7.50").await;
    let summary = manager.get_summary(table).unwrap();
    assert_eq!(summary.total_amount, dec("7.50"));
    assert_eq!(summary.paid_amount, Decimal::ZERO);
    assert_eq!(manager.list_participants(table).len(), 1);
}

// ------------------------------------------------------------------------
// 三种支付方式都能关账, 且只关一次
// ------------------------------------------------------------------------
async fn assert_closed_once(manager: &TableLedgerManager, sitting_id: &str) {
    let events = manager.get_sitting_events(sitting_id).unwrap();
    let closed = events
        .iter()
        .filter(|e| e.event_type == SittingEventType::SittingClosed)
        .count();
    assert_eq!(closed, 1);

    let archived = manager.get_closed_sitting(sitting_id).unwrap().unwrap();
    assert_eq!(archived.status, SittingStatus::Closed);
    assert!(archived.closed_at.is_some());
    assert!(archived.participants.is_empty());
    assert!(archived.split_shares.is_empty());
    assert_eq!(archived.paid_amount, archived.total_amount);
}

#[tokio::test]
async fn test_closure_by_dish_payment() {
    let manager = create_test_manager();
    let a = place(&manager, "T6", "Ana", 1, "12.00").await;
    let b = place(&manager, "T6", "Luis", 3, "2.50").await;

    manager.execute(pay_dish_cmd(&a)).await.unwrap();
    let outcome = manager.execute(pay_dish_cmd(&b)).await.unwrap();
    assert!(outcome.sitting_closed);
    assert!(manager.get_summary("T6").is_none());
    assert_closed_once(&manager, &outcome.sitting_id.unwrap()).await;
}

// ------------------------------------------------------------------------
// 全部是免费菜: 付清最后一道即关账, 之后点单开新账
// ------------------------------------------------------------------------
#[tokio::test]
async fn test_closure_by_free_dish_payment() {
    let manager = create_test_manager();
    let free = place(&manager, "T12", "Ana", 1, "0.00").await;
    let summary = manager.get_summary("T12").unwrap();
    assert_eq!(summary.total_amount, Decimal::ZERO);
    assert_eq!(summary.remaining_amount, Decimal::ZERO);

    let outcome = manager.execute(pay_dish_cmd(&free)).await.unwrap();
    assert!(outcome.sitting_closed);
    assert!(manager.get_summary("T12").is_none());
    let closed_id = outcome.sitting_id.unwrap();
    assert_closed_once(&manager, &closed_id).await;

    // nothing left to pay into
    let err = manager
        .execute(pay_amount_cmd("T12", "0.01"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NoActiveSitting(_)));

    place(&manager, "T12", "Luis", 1, "3.00").await;
    let reopened = manager.get_snapshot("T12").unwrap();
    assert_ne!(reopened.sitting_id, closed_id);
    assert_eq!(reopened.total_amount, dec("3.00"));
}

#[tokio::test]
async fn test_closure_by_split_share() {
    let manager = create_test_manager();
    place(&manager, "T7", "Ana", 1, "10.00").await;
    place(&manager, "T7", "Luis", 1, "10.00").await;

    manager
        .execute(split_cmd("T7", 2, vec![Owner::named("Ana"), Owner::named("Luis")]))
        .await
        .unwrap();
    let first = manager
        .execute(pay_share_cmd("T7", Owner::named("Ana")))
        .await
        .unwrap();
    assert!(!first.sitting_closed);
    let last = manager
        .execute(pay_share_cmd("T7", Owner::named("Luis")))
        .await
        .unwrap();
    assert!(last.sitting_closed);
    assert_closed_once(&manager, &last.sitting_id.unwrap()).await;
}

#[tokio::test]
async fn test_no_close_on_intermediate_state() {
    let manager = create_test_manager();
    place(&manager, "T8", "Ana", 1, "30.00").await;

    for _ in 0..29 {
        let outcome = manager.execute(pay_amount_cmd("T8", "1.00")).await.unwrap();
        assert!(!outcome.sitting_closed);
        assert_ledger_consistent(&manager, "T8");
    }
    assert_eq!(manager.get_summary("T8").unwrap().remaining_amount, dec("1.00"));
    let outcome = manager.execute(pay_amount_cmd("T8", "1.00")).await.unwrap();
    assert!(outcome.sitting_closed);
}

// ------------------------------------------------------------------------
// 幂等: 相同 command_id 重放原结果
// ------------------------------------------------------------------------
#[tokio::test]
async fn test_retried_command_applies_once() {
    let manager = create_test_manager();
    place(&manager, "T9", "Ana", 1, "40.00").await;

    let cmd = pay_amount_cmd("T9", "15.00");
    let first = manager.execute(cmd.clone()).await.unwrap();
    let second = manager.execute(cmd).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(manager.get_summary("T9").unwrap().paid_amount, dec("15.00"));
}

#[tokio::test]
async fn test_failed_command_can_be_retried() {
    let manager = create_test_manager();
    let cmd = pay_amount_cmd("T10", "15.00");

    // no sitting yet
    assert!(manager.execute(cmd.clone()).await.is_err());

    place(&manager, "T10", "Ana", 1, "40.00").await;
    manager.execute(cmd).await.unwrap();
    assert_eq!(manager.get_summary("T10").unwrap().paid_amount, dec("15.00"));
}

#[tokio::test]
async fn test_closing_retry_replays_within_retention() {
    let manager = create_test_manager();
    place(&manager, "T13", "Ana", 1, "20.00").await;

    let cmd = pay_amount_cmd("T13", "20.00");
    let first = manager.execute(cmd.clone()).await.unwrap();
    assert!(first.sitting_closed);
    let second = manager.execute(cmd).await.unwrap();
    assert_eq!(first, second);
}

// ------------------------------------------------------------------------
// 关账后命令幂等记录按保留期清理, 不随桌次无限增长
// ------------------------------------------------------------------------
#[tokio::test]
async fn test_processed_commands_bounded_after_close() {
    let mut config = test_config();
    config.command_retention_secs = 0;
    let storage = LedgerStorage::open_in_memory().unwrap();
    let manager = TableLedgerManager::with_storage(storage, &config).unwrap();

    for _ in 0..50 {
        place(&manager, "T14", "Ana", 1, "8.00").await;
        let outcome = manager.execute(pay_amount_cmd("T14", "8.00")).await.unwrap();
        assert!(outcome.sitting_closed);
    }
    // an open table keeps its ids
    place(&manager, "T15", "Luis", 1, "5.00").await;

    let stats = manager.storage().get_stats().unwrap();
    assert_eq!(stats.closed_sittings, 50);
    assert_eq!(stats.open_sittings, 1);
    assert_eq!(stats.processed_commands, 1);
}

// ------------------------------------------------------------------------
// 输入校验
// ------------------------------------------------------------------------
#[tokio::test]
async fn test_validation_rejects_before_ledger() {
    let manager = create_test_manager();

    let err = manager
        .execute(place_cmd("T11", Owner::named("Ana"), "Soup", 0, "4.00"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    // no sitting was opened by the rejected order
    assert!(manager.get_summary("T11").is_none());

    place(&manager, "T11", "Ana", 1, "4.00").await;
    for bad in ["0", "-1.00", "0.001"] {
        let err = manager.execute(pay_amount_cmd("T11", bad)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)), "amount {}", bad);
    }
    let err = manager.execute(split_cmd("T11", 0, vec![])).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert_eq!(manager.get_summary("T11").unwrap().paid_amount, Decimal::ZERO);
}

// ------------------------------------------------------------------------
// 出餐状态
// ------------------------------------------------------------------------
#[tokio::test]
async fn test_kitchen_status_flow() {
    let manager = create_test_manager();
    let soup = place(&manager, "T12", "Ana", 1, "6.00").await;

    manager.execute(kitchen_cmd(&soup, "cooking")).await.unwrap();
    let dish = manager.list_dish_orders("T12").remove(0);
    assert_eq!(dish.kitchen_status, KitchenStatus::Cooking);
    assert!(!dish.is_paid());
    assert_eq!(manager.get_summary("T12").unwrap().remaining_amount, dec("6.00"));

    let err = manager.execute(kitchen_cmd(&soup, "burnt")).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    let err = manager.execute(kitchen_cmd("ghost", "cooking")).await.unwrap_err();
    assert!(matches!(err, LedgerError::DishNotFound(_)));

    // paid and closed, the kitchen still delivers
    let outcome = manager.execute(pay_dish_cmd(&soup)).await.unwrap();
    assert!(outcome.sitting_closed);
    manager.execute(kitchen_cmd(&soup, "delivered")).await.unwrap();

    let archived = manager
        .get_closed_sitting(&outcome.sitting_id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(archived.dishes[0].kitchen_status, KitchenStatus::Delivered);
    assert_eq!(archived.status, SittingStatus::Closed);
    assert!(manager.get_summary("T12").is_none());
}

// ------------------------------------------------------------------------
// 审计日志
// ------------------------------------------------------------------------
#[tokio::test]
async fn test_audit_log_is_contiguous() {
    let manager = create_test_manager();
    place(&manager, "T13", "Ana", 1, "12.00").await;
    place(&manager, "T13", "Luis", 1, "8.00").await;
    manager.execute(pay_amount_cmd("T13", "5.00")).await.unwrap();

    let sitting_id = manager.get_summary("T13").unwrap().sitting_id;
    let events = manager.get_sitting_events(&sitting_id).unwrap();
    let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, (1..=events.len() as u64).collect::<Vec<_>>());
    assert_eq!(events[0].event_type, SittingEventType::SittingOpened);
    assert_eq!(
        events.last().unwrap().event_type,
        SittingEventType::AmountPaid
    );
    assert_eq!(
        manager.get_snapshot("T13").unwrap().last_sequence,
        events.len() as u64
    );
}

// ------------------------------------------------------------------------
// 实时通知
// ------------------------------------------------------------------------
#[tokio::test]
async fn test_notifications_follow_commits() {
    let manager = create_test_manager();
    let mut rx = manager.subscribe();

    place(&manager, "T14", "Ana", 1, "9.00").await;
    assert_eq!(rx.recv().await.unwrap().event_name(), "dish.created");
    match rx.recv().await.unwrap() {
        TableNotification::OrderUpdated(payload) => {
            assert_eq!(payload.total_amount, dec("9.00"));
            assert_eq!(payload.no_items, 1);
        }
        other => panic!("unexpected notification {}", other),
    }

    manager.execute(pay_amount_cmd("T14", "9.00")).await.unwrap();
    match rx.recv().await.unwrap() {
        TableNotification::OrderUpdated(payload) => {
            assert_eq!(payload.remaining_amount, Decimal::ZERO);
            assert_eq!(payload.status, SittingStatus::Closed);
        }
        other => panic!("unexpected notification {}", other),
    }
    assert_eq!(rx.recv().await.unwrap().event_name(), "table.fullRefresh");

    // rejected commands publish nothing
    assert!(manager.execute(pay_amount_cmd("T14", "1.00")).await.is_err());
    assert!(rx.try_recv().is_err());
}

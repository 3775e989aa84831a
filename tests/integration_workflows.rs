//! Deposit and withdrawal workflow tests
//!
//! Drive full sagas through the engine and assert event order, balances and
//! ledger contents.

mod common;

use std::sync::Arc;

use uuid::Uuid;

use common::{build_harness, default_rates, harness, usd};
use payflow::convert::StaticRates;
use payflow::domain::{Money, OperationContext};
use payflow::payment::SandboxPayment;
use payflow::workflow::{DepositCommand, WithdrawCommand};
use payflow::{LedgerError, TransactionStatus};

#[tokio::test]
async fn test_same_currency_deposit_full_saga() {
    let harness = harness();
    let ctx = OperationContext::new();
    let user_id = Uuid::new_v4();
    let account_id = harness.engine.create_account(user_id, "USD").await.unwrap();
    harness.clear_events();

    harness
        .engine
        .deposit(
            &ctx,
            DepositCommand::new(user_id, account_id, "100.00".into(), "USD".into()),
        )
        .await
        .unwrap();

    assert_eq!(
        harness.recorded(),
        vec![
            "deposit.requested",
            "deposit.validated",
            "deposit.persisted",
            "deposit.business_validated",
            "deposit.payment_initiated",
            "deposit.payment_persisted",
        ]
    );

    // $100.00 lands as 10000 cents
    assert_eq!(
        harness.engine.balance(user_id, account_id).await.unwrap(),
        Money::from_minor(10_000, usd())
    );

    let records = harness
        .engine
        .transactions(user_id, account_id)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].amount, 10_000);
    assert_eq!(records[0].balance_after, 10_000);
    assert_eq!(records[0].status, TransactionStatus::Pending);
    assert!(records[0].payment_id.is_some());
    assert!(records[0].original.is_none());
}

#[tokio::test]
async fn test_cross_currency_deposit_converts_before_mutation() {
    let harness = harness();
    let ctx = OperationContext::new();
    let user_id = Uuid::new_v4();
    let account_id = harness.engine.create_account(user_id, "USD").await.unwrap();
    harness.clear_events();

    // Deposit EUR into a USD account at 1.11
    harness
        .engine
        .deposit(
            &ctx,
            DepositCommand::new(user_id, account_id, "100.00".into(), "EUR".into()),
        )
        .await
        .unwrap();

    assert_eq!(
        harness.recorded(),
        vec![
            "deposit.requested",
            "deposit.validated",
            "deposit.conversion_requested",
            "deposit.conversion_done",
            "deposit.business_validated",
            "deposit.payment_initiated",
            "deposit.payment_persisted",
        ]
    );

    // 100.00 EUR * 1.11 = 111.00 USD
    assert_eq!(
        harness.engine.balance(user_id, account_id).await.unwrap(),
        Money::from_minor(11_100, usd())
    );

    let records = harness
        .engine
        .transactions(user_id, account_id)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    let original = records[0].original.as_ref().unwrap();
    assert_eq!(original.amount.minor(), 10_000);
    assert_eq!(original.amount.currency(), common::eur());
    assert_eq!(original.rate, rust_decimal_macros::dec!(1.11));
}

#[tokio::test]
async fn test_unavailable_rate_stops_saga_without_mutation() {
    // No rates registered at all
    let harness = build_harness(StaticRates::new(), Arc::new(SandboxPayment::new()));
    let ctx = OperationContext::new();
    let user_id = Uuid::new_v4();
    let account_id = harness.engine.create_account(user_id, "USD").await.unwrap();
    harness.clear_events();

    harness
        .engine
        .deposit(
            &ctx,
            DepositCommand::new(user_id, account_id, "100.00".into(), "EUR".into()),
        )
        .await
        .unwrap();

    // The saga stops right after the conversion request
    assert_eq!(
        harness.recorded(),
        vec![
            "deposit.requested",
            "deposit.validated",
            "deposit.conversion_requested",
        ]
    );
    assert_eq!(
        harness.engine.balance(user_id, account_id).await.unwrap(),
        Money::from_minor(0, usd())
    );
    assert!(harness
        .engine
        .transactions(user_id, account_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_withdraw_records_negative_amount() {
    let harness = harness();
    let ctx = OperationContext::new();
    let user_id = Uuid::new_v4();
    let account_id = harness.engine.create_account(user_id, "USD").await.unwrap();

    harness
        .engine
        .deposit(
            &ctx,
            DepositCommand::new(user_id, account_id, "100.00".into(), "USD".into()),
        )
        .await
        .unwrap();
    harness.clear_events();

    harness
        .engine
        .withdraw(
            &ctx,
            WithdrawCommand::new(user_id, account_id, "30.00".into(), "USD".into())
                .with_target("iban-7".into()),
        )
        .await
        .unwrap();

    assert_eq!(
        harness.recorded(),
        vec![
            "withdraw.requested",
            "withdraw.validated",
            "withdraw.persisted",
            "withdraw.business_validated",
            "withdraw.payment_initiated",
            "withdraw.payment_persisted",
        ]
    );
    assert_eq!(
        harness.engine.balance(user_id, account_id).await.unwrap(),
        Money::from_minor(7_000, usd())
    );

    let records = harness
        .engine
        .transactions(user_id, account_id)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].amount, -3_000);
    assert_eq!(records[1].balance_after, 7_000);
}

#[tokio::test]
async fn test_cross_currency_withdraw_debits_converted_amount() {
    let harness = harness();
    let ctx = OperationContext::new();
    let user_id = Uuid::new_v4();
    let account_id = harness.engine.create_account(user_id, "USD").await.unwrap();

    harness
        .engine
        .deposit(
            &ctx,
            DepositCommand::new(user_id, account_id, "100.00".into(), "USD".into()),
        )
        .await
        .unwrap();
    harness.clear_events();

    // Withdraw 50.00 EUR; the account is debited 55.50 USD at 1.11
    harness
        .engine
        .withdraw(
            &ctx,
            WithdrawCommand::new(user_id, account_id, "50.00".into(), "EUR".into()),
        )
        .await
        .unwrap();

    assert_eq!(
        harness.recorded(),
        vec![
            "withdraw.requested",
            "withdraw.validated",
            "withdraw.conversion_requested",
            "withdraw.conversion_done",
            "withdraw.business_validated",
            "withdraw.payment_initiated",
            "withdraw.payment_persisted",
        ]
    );
    assert_eq!(
        harness.engine.balance(user_id, account_id).await.unwrap(),
        Money::from_minor(4_450, usd())
    );

    let records = harness
        .engine
        .transactions(user_id, account_id)
        .await
        .unwrap();
    assert_eq!(records[1].amount, -5_550);
    let original = records[1].original.as_ref().unwrap();
    assert_eq!(original.amount, Money::from_minor(5_000, common::eur()));
}

#[tokio::test]
async fn test_overdraft_stops_saga_and_preserves_balance() {
    let harness = harness();
    let ctx = OperationContext::new();
    let user_id = Uuid::new_v4();
    let account_id = harness.engine.create_account(user_id, "USD").await.unwrap();

    harness
        .engine
        .deposit(
            &ctx,
            DepositCommand::new(user_id, account_id, "100.00".into(), "USD".into()),
        )
        .await
        .unwrap();
    harness.clear_events();

    // Withdraw $150 from an account holding $100
    harness
        .engine
        .withdraw(
            &ctx,
            WithdrawCommand::new(user_id, account_id, "150.00".into(), "USD".into()),
        )
        .await
        .unwrap();

    assert_eq!(
        harness.recorded(),
        vec!["withdraw.requested", "withdraw.validated"]
    );
    assert_eq!(
        harness.engine.balance(user_id, account_id).await.unwrap(),
        Money::from_minor(10_000, usd())
    );
    assert_eq!(
        harness
            .engine
            .transactions(user_id, account_id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_non_owner_request_stops_at_validation() {
    let harness = harness();
    let ctx = OperationContext::new();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let account_id = harness.engine.create_account(owner, "USD").await.unwrap();
    harness.clear_events();

    harness
        .engine
        .deposit(
            &ctx,
            DepositCommand::new(stranger, account_id, "100.00".into(), "USD".into()),
        )
        .await
        .unwrap();

    assert_eq!(harness.recorded(), vec!["deposit.requested"]);
    assert_eq!(
        harness.engine.balance(owner, account_id).await.unwrap(),
        Money::from_minor(0, usd())
    );

    // Reads are authorized too
    assert!(matches!(
        harness.engine.balance(stranger, account_id).await,
        Err(LedgerError::Unauthorized { .. })
    ));
    assert!(matches!(
        harness.engine.transactions(stranger, account_id).await,
        Err(LedgerError::Unauthorized { .. })
    ));
}

#[tokio::test]
async fn test_out_of_precision_amount_rejected_at_boundary() {
    let harness = harness();
    let ctx = OperationContext::new();
    let user_id = Uuid::new_v4();
    let account_id = harness.engine.create_account(user_id, "USD").await.unwrap();

    let result = harness
        .engine
        .deposit(
            &ctx,
            DepositCommand::new(user_id, account_id, "10.005".into(), "USD".into()),
        )
        .await;

    assert!(matches!(
        result,
        Err(LedgerError::PrecisionExceeded { decimals: 2, .. })
    ));
}

#[tokio::test]
async fn test_payment_failure_keeps_committed_deposit() {
    // Persisted ledger entries are not compensated when the later payment
    // step fails; the saga just stops and the gap is operator-visible.
    let harness = build_harness(default_rates(), Arc::new(SandboxPayment::failing()));
    let ctx = OperationContext::new();
    let user_id = Uuid::new_v4();
    let account_id = harness.engine.create_account(user_id, "USD").await.unwrap();
    harness.clear_events();

    harness
        .engine
        .deposit(
            &ctx,
            DepositCommand::new(user_id, account_id, "100.00".into(), "USD".into()),
        )
        .await
        .unwrap();

    assert_eq!(
        harness.recorded(),
        vec![
            "deposit.requested",
            "deposit.validated",
            "deposit.persisted",
            "deposit.business_validated",
        ]
    );

    let records = harness
        .engine
        .transactions(user_id, account_id)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].payment_id.is_none());
    assert_eq!(
        harness.engine.balance(user_id, account_id).await.unwrap(),
        Money::from_minor(10_000, usd())
    );
}

#[tokio::test]
async fn test_webhook_settles_transaction() {
    let harness = harness();
    let ctx = OperationContext::new();
    let user_id = Uuid::new_v4();
    let account_id = harness.engine.create_account(user_id, "USD").await.unwrap();

    harness
        .engine
        .deposit(
            &ctx,
            DepositCommand::new(user_id, account_id, "100.00".into(), "USD".into()),
        )
        .await
        .unwrap();

    let records = harness
        .engine
        .transactions(user_id, account_id)
        .await
        .unwrap();
    let payment_id = records[0].payment_id.clone().unwrap();
    harness.clear_events();

    harness
        .engine
        .payment_completed(&ctx, &payment_id)
        .await
        .unwrap();

    assert_eq!(harness.recorded(), vec!["deposit.payment_completed"]);
    let records = harness
        .engine
        .transactions(user_id, account_id)
        .await
        .unwrap();
    assert_eq!(records[0].status, TransactionStatus::Settled);

    // Unknown payment ids are rejected
    assert!(matches!(
        harness.engine.payment_completed(&ctx, "pay_bogus").await,
        Err(LedgerError::UnknownPayment(_))
    ));
}

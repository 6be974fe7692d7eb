use pretty_assertions::assert_eq;

use payroll_engine::EngineError;
use payroll_engine::database::models::{
    AdjustmentCategory, AdjustmentKind, Payroll, PayrollStatus, UpdateAdjustmentInput,
};

mod common;
use common::{MockData, TestContext, dec};

fn assert_net_invariant(payroll: &Payroll) {
    let expected = &payroll.base_gross_salary + &payroll.total_additionals
        + &payroll.total_benefits
        - &payroll.total_deductions;
    assert_eq!(
        payroll.net_salary,
        payroll_engine::money::to_cents(&expected),
        "net salary out of sync with totals"
    );
}

#[tokio::test]
async fn test_create_payroll_starts_in_draft() {
    let ctx = TestContext::new();

    let payroll = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "5000"))
        .await
        .unwrap();

    assert_eq!(payroll.status, PayrollStatus::Draft);
    assert_eq!(payroll.total_deductions, dec("0.00"));
    assert_eq!(payroll.total_benefits, dec("0.00"));
    assert_eq!(payroll.total_additionals, dec("0.00"));
    assert_eq!(payroll.net_salary, dec("5000.00"));
    assert_eq!(payroll.version, 0);
    assert!(payroll.processed_at.is_none());
}

#[tokio::test]
async fn test_create_payroll_rejects_duplicate_period() {
    let ctx = TestContext::new();

    ctx.engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "5000"))
        .await
        .unwrap();

    let duplicate = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "6000"))
        .await;
    assert!(matches!(duplicate, Err(EngineError::InvalidState(_))));

    // Same worker next month and a different worker in the same month are
    // both fine.
    ctx.engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 6, 2024, "5000"))
        .await
        .unwrap();
    ctx.engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-2", 5, 2024, "5000"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_payroll_rejects_bad_month() {
    let ctx = TestContext::new();

    for month in [0, 13] {
        let result = ctx
            .engine
            .payrolls
            .create_payroll(MockData::payroll_input("W-1", month, 2024, "5000"))
            .await;
        assert!(matches!(result, Err(EngineError::InvalidState(_))));
    }
}

#[tokio::test]
async fn test_create_payroll_rejects_blank_worker_id() {
    let ctx = TestContext::new();

    let result = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("   ", 5, 2024, "5000"))
        .await;
    assert!(matches!(result, Err(EngineError::InvalidState(_))));
}

#[tokio::test]
async fn test_adjustments_drive_totals() {
    let ctx = TestContext::new();
    let payroll = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "5000"))
        .await
        .unwrap();

    let payroll = ctx
        .engine
        .payrolls
        .add_adjustment(
            payroll.id,
            AdjustmentCategory::Deduction,
            MockData::fixed_adjustment("Union dues", "200"),
        )
        .await
        .unwrap();
    let payroll = ctx
        .engine
        .payrolls
        .add_adjustment(
            payroll.id,
            AdjustmentCategory::Benefit,
            MockData::percentage_adjustment("Meal allowance", "10"),
        )
        .await
        .unwrap();

    assert_eq!(payroll.total_deductions, dec("200.00"));
    assert_eq!(payroll.total_benefits, dec("500.00"));
    assert_eq!(payroll.total_additionals, dec("0.00"));
    assert_eq!(payroll.net_salary, dec("5300.00"));
    assert_net_invariant(&payroll);
}

#[tokio::test]
async fn test_net_invariant_survives_every_mutation() {
    let ctx = TestContext::new();
    let payroll = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "3456.78"))
        .await
        .unwrap();
    assert_net_invariant(&payroll);

    let payroll = ctx
        .engine
        .payrolls
        .add_adjustment(
            payroll.id,
            AdjustmentCategory::Additional,
            MockData::percentage_adjustment("Overtime", "12.5"),
        )
        .await
        .unwrap();
    assert_net_invariant(&payroll);

    let payroll = ctx
        .engine
        .payrolls
        .add_adjustment(
            payroll.id,
            AdjustmentCategory::Deduction,
            MockData::fixed_adjustment("Advance pay-back", "150.33"),
        )
        .await
        .unwrap();
    assert_net_invariant(&payroll);
    let target = payroll.deductions[0].id;

    let payroll = ctx
        .engine
        .payrolls
        .set_base_salary(payroll.id, dec("4000"))
        .await
        .unwrap();
    assert_net_invariant(&payroll);

    let payroll = ctx
        .engine
        .payrolls
        .update_adjustment(
            payroll.id,
            target,
            UpdateAdjustmentInput {
                name: None,
                description: None,
                kind: None,
                value: Some(dec("99.99")),
            },
        )
        .await
        .unwrap();
    assert_net_invariant(&payroll);

    let payroll = ctx
        .engine
        .payrolls
        .remove_adjustment(payroll.id, target)
        .await
        .unwrap();
    assert_net_invariant(&payroll);
    assert!(payroll.deductions.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_racing_adjustment_edits_all_land() {
    let ctx = TestContext::new();
    let payroll = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "5000"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..4 {
        let payrolls = ctx.engine.payrolls.clone();
        let payroll_id = payroll.id;
        handles.push(tokio::spawn(async move {
            payrolls
                .add_adjustment(
                    payroll_id,
                    AdjustmentCategory::Deduction,
                    MockData::fixed_adjustment(&format!("Installment {i}"), "10"),
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let payroll = ctx.engine.payrolls.get_payroll(payroll.id).await.unwrap();
    assert_eq!(payroll.deductions.len(), 4);
    assert_eq!(payroll.total_deductions, dec("40.00"));
    assert_eq!(payroll.net_salary, dec("4960.00"));
    assert_net_invariant(&payroll);
}

#[tokio::test]
async fn test_update_adjustment_keeps_unspecified_fields() {
    let ctx = TestContext::new();
    let payroll = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "2000"))
        .await
        .unwrap();
    let payroll = ctx
        .engine
        .payrolls
        .add_adjustment(
            payroll.id,
            AdjustmentCategory::Benefit,
            MockData::percentage_adjustment("Transport", "5"),
        )
        .await
        .unwrap();
    let adjustment_id = payroll.benefits[0].id;

    // Swap the kind and value; name and description stay.
    let payroll = ctx
        .engine
        .payrolls
        .update_adjustment(
            payroll.id,
            adjustment_id,
            UpdateAdjustmentInput {
                name: None,
                description: None,
                kind: Some(AdjustmentKind::Fixed),
                value: Some(dec("80")),
            },
        )
        .await
        .unwrap();

    let updated = &payroll.benefits[0];
    assert_eq!(updated.name, "Transport");
    assert_eq!(updated.description.as_deref(), Some("5% of base"));
    assert_eq!(updated.kind, AdjustmentKind::Fixed);
    assert_eq!(payroll.total_benefits, dec("80.00"));
}

#[tokio::test]
async fn test_update_missing_adjustment_is_not_found() {
    let ctx = TestContext::new();
    let payroll = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "2000"))
        .await
        .unwrap();

    let result = ctx
        .engine
        .payrolls
        .update_adjustment(
            payroll.id,
            uuid::Uuid::new_v4(),
            UpdateAdjustmentInput {
                name: Some("ghost".to_string()),
                description: None,
                kind: None,
                value: None,
            },
        )
        .await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));

    let result = ctx
        .engine
        .payrolls
        .remove_adjustment(payroll.id, uuid::Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[tokio::test]
async fn test_set_base_salary_re_resolves_percentages() {
    let ctx = TestContext::new();
    let payroll = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "5000"))
        .await
        .unwrap();
    let payroll = ctx
        .engine
        .payrolls
        .add_adjustment(
            payroll.id,
            AdjustmentCategory::Deduction,
            MockData::percentage_adjustment("Pension", "8"),
        )
        .await
        .unwrap();
    assert_eq!(payroll.total_deductions, dec("400.00"));

    let payroll = ctx
        .engine
        .payrolls
        .set_base_salary(payroll.id, dec("6000"))
        .await
        .unwrap();
    assert_eq!(payroll.base_gross_salary, dec("6000.00"));
    assert_eq!(payroll.total_deductions, dec("480.00"));
    assert_eq!(payroll.net_salary, dec("5520.00"));
}

#[tokio::test]
async fn test_completion_stamps_processed_at_once() {
    let ctx = TestContext::new();
    let payroll = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "5000"))
        .await
        .unwrap();

    let completed = ctx
        .engine
        .payrolls
        .set_status(payroll.id, PayrollStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.status, PayrollStatus::Completed);
    assert!(completed.processed_at.is_some());

    // Asking again is a no-op: same stamp, and no write happened (the
    // version did not move).
    let again = ctx
        .engine
        .payrolls
        .set_status(payroll.id, PayrollStatus::Completed)
        .await
        .unwrap();
    assert_eq!(again.processed_at, completed.processed_at);
    assert_eq!(again.version, completed.version);
}

#[tokio::test]
async fn test_completed_payroll_cannot_be_canceled() {
    let ctx = TestContext::new();
    let payroll = common::completed_payroll(&ctx, "W-1", 5, 2024, "5000").await;

    let result = ctx
        .engine
        .payrolls
        .set_status(payroll.id, PayrollStatus::Canceled)
        .await;
    assert!(matches!(result, Err(EngineError::InvalidState(_))));
}

#[tokio::test]
async fn test_set_status_only_accepts_terminal_requests() {
    let ctx = TestContext::new();
    let payroll = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "5000"))
        .await
        .unwrap();

    for status in [PayrollStatus::Draft, PayrollStatus::Processing] {
        let result = ctx.engine.payrolls.set_status(payroll.id, status).await;
        assert!(matches!(result, Err(EngineError::InvalidState(_))));
    }
}

#[tokio::test]
async fn test_canceled_payroll_is_frozen() {
    let ctx = TestContext::new();
    let payroll = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "5000"))
        .await
        .unwrap();

    let canceled = ctx
        .engine
        .payrolls
        .set_status(payroll.id, PayrollStatus::Canceled)
        .await
        .unwrap();
    assert_eq!(canceled.status, PayrollStatus::Canceled);

    let add = ctx
        .engine
        .payrolls
        .add_adjustment(
            payroll.id,
            AdjustmentCategory::Deduction,
            MockData::fixed_adjustment("Late fee", "10"),
        )
        .await;
    assert!(matches!(add, Err(EngineError::InvalidState(_))));

    let base = ctx
        .engine
        .payrolls
        .set_base_salary(payroll.id, dec("1"))
        .await;
    assert!(matches!(base, Err(EngineError::InvalidState(_))));

    let complete = ctx
        .engine
        .payrolls
        .set_status(payroll.id, PayrollStatus::Completed)
        .await;
    assert!(matches!(complete, Err(EngineError::InvalidState(_))));

    // Canceling again is tolerated and changes nothing.
    let again = ctx
        .engine
        .payrolls
        .set_status(payroll.id, PayrollStatus::Canceled)
        .await
        .unwrap();
    assert_eq!(again.version, canceled.version);
}

#[tokio::test]
async fn test_completed_payroll_accepts_corrections() {
    let ctx = TestContext::new();
    let payroll = common::completed_payroll(&ctx, "W-1", 5, 2024, "5000").await;
    let processed_at = payroll.processed_at;

    let corrected = ctx
        .engine
        .payrolls
        .add_adjustment(
            payroll.id,
            AdjustmentCategory::Deduction,
            MockData::fixed_adjustment("Equipment damage", "120"),
        )
        .await
        .unwrap();

    assert_eq!(corrected.status, PayrollStatus::Completed);
    assert_eq!(corrected.processed_at, processed_at);
    assert_eq!(corrected.total_deductions, dec("120.00"));
    assert_eq!(corrected.net_salary, dec("4880.00"));
}

#[tokio::test]
async fn test_delete_payroll() {
    let ctx = TestContext::new();
    let payroll = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "5000"))
        .await
        .unwrap();

    ctx.engine.payrolls.delete_payroll(payroll.id).await.unwrap();

    let lookup = ctx.engine.payrolls.get_payroll(payroll.id).await;
    assert!(matches!(lookup, Err(EngineError::NotFound(_))));

    let second_delete = ctx.engine.payrolls.delete_payroll(payroll.id).await;
    assert!(matches!(second_delete, Err(EngineError::NotFound(_))));
}

#[tokio::test]
async fn test_operations_on_missing_payroll_are_not_found() {
    let ctx = TestContext::new();
    let ghost = uuid::Uuid::new_v4();

    assert!(matches!(
        ctx.engine.payrolls.get_payroll(ghost).await,
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        ctx.engine
            .payrolls
            .set_status(ghost, PayrollStatus::Completed)
            .await,
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        ctx.engine
            .payrolls
            .add_adjustment(
                ghost,
                AdjustmentCategory::Benefit,
                MockData::fixed_adjustment("Bonus", "10")
            )
            .await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_payrolls_is_ordered_by_worker_name() {
    let ctx = TestContext::new();

    for (worker_id, name) in [("W-3", "Carla"), ("W-1", "Ana"), ("W-2", "Bruno")] {
        let mut input = MockData::payroll_input(worker_id, 7, 2024, "1000");
        input.worker_name = name.to_string();
        ctx.engine.payrolls.create_payroll(input).await.unwrap();
    }
    // A payroll in another period stays out of the listing.
    ctx.engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-9", 8, 2024, "1000"))
        .await
        .unwrap();

    let listed = ctx.engine.payrolls.list_payrolls(7, 2024).await.unwrap();
    let names: Vec<&str> = listed.iter().map(|p| p.worker_name.as_str()).collect();
    assert_eq!(names, vec!["Ana", "Bruno", "Carla"]);
}

#[tokio::test]
async fn test_notes_follow_the_same_guards() {
    let ctx = TestContext::new();
    let payroll = ctx
        .engine
        .payrolls
        .create_payroll(MockData::payroll_input("W-1", 5, 2024, "5000"))
        .await
        .unwrap();

    let payroll = ctx
        .engine
        .payrolls
        .set_notes(payroll.id, Some("reviewed by finance".to_string()))
        .await
        .unwrap();
    assert_eq!(payroll.notes.as_deref(), Some("reviewed by finance"));

    ctx.engine
        .payrolls
        .set_status(payroll.id, PayrollStatus::Canceled)
        .await
        .unwrap();
    let result = ctx
        .engine
        .payrolls
        .set_notes(payroll.id, Some("too late".to_string()))
        .await;
    assert!(matches!(result, Err(EngineError::InvalidState(_))));
}

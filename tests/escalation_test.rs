//! 升级执行测试：费用累计、快速升级、致命错误、预算
mod common;

use std::sync::Arc;

use apply_flow::error::ErrorCategory;
use apply_flow::models::{FieldMatch, PlannedAction, Profile};
use apply_flow::workflow::escalation::{execute_with_escalation, EscalationPolicy};
use common::{context, tiers, FakeBrowser, FakePage, FakeTier};

fn browser() -> FakeBrowser {
    FakeBrowser::new(vec![FakePage::new("https://jobs.example/apply").field("email", "Email")])
}

fn email_action(tier: usize) -> PlannedAction {
    let page = FakePage::new("https://jobs.example/apply").field("email", "Email");
    PlannedAction::from_match(
        &FieldMatch {
            field: page.fields[0].clone(),
            profile_key: "email".to_string(),
            value: "ada@example.com".to_string(),
            confidence: 0.9,
            method: "fake".to_string(),
        },
        tier,
    )
}

#[tokio::test]
async fn test_total_failure_cost_is_sum_of_all_attempts() {
    let browser = browser();
    let cheap = Arc::new(FakeTier::new("cheap", 0.0, &browser).always_failing(ErrorCategory::Timeout));
    let paid = Arc::new(FakeTier::new("paid", 0.25, &browser).always_failing(ErrorCategory::Timeout));
    let ladder = tiers(vec![cheap.clone(), paid.clone()]);
    let mut ctx = context(&browser, Profile::new(), 5.0);
    let mut action = email_action(0);

    let outcome = execute_with_escalation(&ladder, &EscalationPolicy::default(), &mut ctx, &mut action)
        .await
        .unwrap();

    assert!(!outcome.success);
    // timeout 不在快速升级集合中，每层各尝试两次
    assert_eq!(cheap.executes(), 2);
    assert_eq!(paid.executes(), 2);
    assert!((outcome.cost - 0.5).abs() < 1e-9);
    assert!((ctx.budget.spent() - 0.5).abs() < 1e-9);
    assert_eq!(action.history.len(), 4);
    assert_eq!(outcome.last_error.unwrap().category, ErrorCategory::Timeout);
}

#[tokio::test]
async fn test_fast_escalation_skips_remaining_attempts() {
    let browser = browser();
    let cheap = Arc::new(
        FakeTier::new("cheap", 0.0, &browser).always_failing(ErrorCategory::ElementNotFound),
    );
    let paid = Arc::new(FakeTier::new("paid", 0.1, &browser));
    let ladder = tiers(vec![cheap.clone(), paid.clone()]);
    let mut ctx = context(&browser, Profile::new(), 1.0);
    let mut action = email_action(0);

    let outcome = execute_with_escalation(&ladder, &EscalationPolicy::default(), &mut ctx, &mut action)
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.tier, Some(1));
    assert_eq!(cheap.executes(), 1);
    assert_eq!(paid.executes(), 1);
    assert!((outcome.cost - 0.1).abs() < 1e-9);
    assert_eq!(browser.value("email").as_deref(), Some("ada@example.com"));
}

#[tokio::test]
async fn test_retry_within_tier_before_escalating() {
    let browser = browser();
    let cheap = Arc::new(
        FakeTier::new("cheap", 0.0, &browser).failing_first(&[ErrorCategory::ValueMismatch]),
    );
    let paid = Arc::new(FakeTier::new("paid", 0.1, &browser));
    let ladder = tiers(vec![cheap.clone(), paid.clone()]);
    let mut ctx = context(&browser, Profile::new(), 1.0);
    let mut action = email_action(0);

    let outcome = execute_with_escalation(&ladder, &EscalationPolicy::default(), &mut ctx, &mut action)
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.tier, Some(0));
    assert_eq!(cheap.executes(), 2);
    assert_eq!(paid.executes(), 0);
    assert_eq!(action.attempts, 2);
}

#[tokio::test]
async fn test_session_loss_propagates_without_escalating() {
    let browser = browser();
    let cheap = Arc::new(
        FakeTier::new("cheap", 0.0, &browser).always_failing(ErrorCategory::BrowserDisconnected),
    );
    let paid = Arc::new(FakeTier::new("paid", 0.1, &browser));
    let ladder = tiers(vec![cheap.clone(), paid.clone()]);
    let mut ctx = context(&browser, Profile::new(), 1.0);
    let mut action = email_action(0);

    let err = execute_with_escalation(&ladder, &EscalationPolicy::default(), &mut ctx, &mut action)
        .await
        .unwrap_err();

    assert_eq!(err.category, ErrorCategory::BrowserDisconnected);
    assert_eq!(paid.executes(), 0);
}

#[tokio::test]
async fn test_budget_exceeded_halts_before_spending() {
    let browser = browser();
    let paid = Arc::new(FakeTier::new("paid", 0.5, &browser).always_failing(ErrorCategory::Timeout));
    let ladder = tiers(vec![paid.clone()]);
    let mut ctx = context(&browser, Profile::new(), 0.6);
    let mut action = email_action(0);

    let err = execute_with_escalation(&ladder, &EscalationPolicy::default(), &mut ctx, &mut action)
        .await
        .unwrap_err();

    assert_eq!(err.category, ErrorCategory::BudgetExceeded);
    assert_eq!(paid.executes(), 1);
    assert!((ctx.budget.remaining() - 0.1).abs() < 1e-9);
    assert!(ctx.budget.remaining() >= 0.0);
}

#[tokio::test]
async fn test_assigned_tier_is_starting_point() {
    let browser = browser();
    let cheap = Arc::new(FakeTier::new("cheap", 0.0, &browser));
    let paid = Arc::new(FakeTier::new("paid", 0.1, &browser));
    let ladder = tiers(vec![cheap.clone(), paid.clone()]);
    let mut ctx = context(&browser, Profile::new(), 1.0);
    let mut action = email_action(1);

    let outcome = tokio_test::assert_ok!(
        execute_with_escalation(&ladder, &EscalationPolicy::default(), &mut ctx, &mut action).await
    );

    assert!(outcome.success);
    assert_eq!(cheap.executes(), 0);
    assert_eq!(action.history[0].tier, "paid");
}

use serde::Serialize;
use tracing::warn;

use crate::domain::{Budget, BudgetId, Cents, RecentExpense, ValidationError, amount};
use crate::storage::BudgetAggregate;

use super::{AppError, LedgerService};

/// Number of expenses shown on the dashboard.
pub const DASHBOARD_RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub user: Option<String>,
    pub year: Option<i32>,
    pub months: Vec<MonthlySpending>,
    #[serde(with = "amount")]
    pub total: Cents,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySpending {
    /// `YYYY-MM`
    pub month: String,
    #[serde(with = "amount")]
    pub total: Cents,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    #[serde(flatten)]
    pub budget: Budget,
    pub expense_count: i64,
    /// Sum of the expense rows that reference this budget
    #[serde(with = "amount")]
    pub posted: Cents,
    pub utilization: f64,
    /// Stored totals agree with each other and with the expense rows
    pub balanced: bool,
}

impl From<BudgetAggregate> for BudgetSummary {
    fn from(agg: BudgetAggregate) -> Self {
        let balanced = agg.budget.is_balanced() && agg.budget.expenses_cents == agg.posted_cents;
        Self {
            utilization: agg.budget.utilization(),
            budget: agg.budget,
            expense_count: agg.expense_count,
            posted: agg.posted_cents,
            balanced,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub budget_count: usize,
    #[serde(with = "amount")]
    pub total_budgeted: Cents,
    #[serde(with = "amount")]
    pub total_spent: Cents,
    #[serde(with = "amount")]
    pub total_remaining: Cents,
    pub recent_expenses: Vec<RecentExpense>,
}

/// A budget whose stored balance disagrees with its expense rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyIssue {
    pub budget_id: BudgetId,
    pub title: String,
    #[serde(with = "amount")]
    pub stored_expenses: Cents,
    #[serde(with = "amount")]
    pub posted: Cents,
    #[serde(with = "amount")]
    pub stored_remaining: Cents,
    #[serde(with = "amount")]
    pub expected_remaining: Cents,
}

impl LedgerService {
    // ========================
    // Reporting operations
    // ========================

    /// Expense totals grouped by calendar month, optionally limited to one
    /// user and one year.
    pub async fn generate_report(
        &self,
        user: Option<&str>,
        year: Option<i32>,
    ) -> Result<MonthlyReport, AppError> {
        let user = user.map(str::trim).filter(|u| !u.is_empty());
        let months: Vec<MonthlySpending> = self
            .repo
            .monthly_totals(user, year)
            .await?
            .into_iter()
            .map(|m| MonthlySpending {
                month: m.month,
                total: m.total,
                count: m.count,
            })
            .collect();

        Ok(MonthlyReport {
            user: user.map(str::to_string),
            year,
            total: months.iter().map(|m| m.total).sum(),
            count: months.iter().map(|m| m.count).sum(),
            months,
        })
    }

    /// One summary per budget of the owner, with what its expense rows add up to.
    pub async fn get_budget_data(&self, owner: &str) -> Result<Vec<BudgetSummary>, AppError> {
        if owner.trim().is_empty() {
            return Err(ValidationError::BlankField("uid").into());
        }
        let aggregates = self.repo.budget_aggregates(Some(owner)).await?;
        Ok(aggregates.into_iter().map(BudgetSummary::from).collect())
    }

    /// Totals across the owner's budgets plus their latest expenses.
    pub async fn get_dashboard(&self, owner: &str) -> Result<Dashboard, AppError> {
        if owner.trim().is_empty() {
            return Err(ValidationError::BlankField("uid").into());
        }
        let budgets = self.repo.list_budgets_for_owner(owner).await?;
        let recent_expenses = self
            .repo
            .list_recent_expenses(owner, Some(DASHBOARD_RECENT_LIMIT))
            .await?;

        Ok(Dashboard {
            budget_count: budgets.len(),
            total_budgeted: budgets.iter().map(|b| b.total_cents).sum(),
            total_spent: budgets.iter().map(|b| b.expenses_cents).sum(),
            total_remaining: budgets.iter().map(|b| b.remaining_cents).sum(),
            recent_expenses,
        })
    }

    /// Find budgets whose stored `remaining`/`expenses` drifted from their
    /// expense rows. An empty result means the ledger is consistent.
    pub async fn check_consistency(
        &self,
        owner: Option<&str>,
    ) -> Result<Vec<ConsistencyIssue>, AppError> {
        let aggregates = self.repo.budget_aggregates(owner).await?;
        let issues: Vec<ConsistencyIssue> = aggregates
            .into_iter()
            .filter(|agg| {
                agg.budget.expenses_cents != agg.posted_cents
                    || agg.budget.remaining_cents != agg.budget.total_cents - agg.posted_cents
            })
            .map(|agg| ConsistencyIssue {
                budget_id: agg.budget.id,
                title: agg.budget.title,
                stored_expenses: agg.budget.expenses_cents,
                posted: agg.posted_cents,
                stored_remaining: agg.budget.remaining_cents,
                expected_remaining: agg.budget.total_cents - agg.posted_cents,
            })
            .collect();

        if !issues.is_empty() {
            warn!(count = issues.len(), "budgets out of balance with their expenses");
        }
        Ok(issues)
    }
}

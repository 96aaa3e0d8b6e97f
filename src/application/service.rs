use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{
    Budget, BudgetId, BudgetUpdate, Expense, ExpenseId, ExpenseUpdate, NewBudget, NewExpense,
    RecentExpense, ValidationError, format_cents,
};
use crate::storage::{LedgerWrite, Repository};

use super::AppError;

/// Application service for budgets and expenses.
/// This is the interface both the HTTP API and the CLI go through.
#[derive(Clone)]
pub struct LedgerService {
    pub(crate) repo: Repository,
}

/// Result of posting an expense
#[derive(Debug, Clone)]
pub struct PostedExpense {
    pub expense: Expense,
    /// The budget after the debit was applied
    pub budget: Budget,
}

/// Parse a budget or expense identifier supplied by a client.
pub fn parse_id(kind: &'static str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::InvalidId {
        kind,
        value: raw.to_string(),
    })
}

fn require_key(field: &'static str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field).into());
    }
    Ok(())
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Open the database at the given path, creating and migrating it if needed.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Budget operations
    // ========================

    /// Create a budget with its full total available.
    pub async fn create_budget(&self, input: NewBudget) -> Result<Budget, AppError> {
        input.validate()?;
        let budget = input.into_budget();
        self.repo.save_budget(&budget).await?;

        info!(
            budget_id = %budget.id,
            owner = %budget.owner,
            total = %format_cents(budget.total_cents),
            "budget created"
        );
        Ok(budget)
    }

    /// Get a budget by ID.
    pub async fn get_budget(&self, id: &str) -> Result<Budget, AppError> {
        let budget_id = parse_id("budget", id)?;
        self.find_budget(budget_id).await
    }

    async fn find_budget(&self, id: BudgetId) -> Result<Budget, AppError> {
        self.repo
            .get_budget(id)
            .await?
            .ok_or_else(|| AppError::BudgetNotFound(id.to_string()))
    }

    /// List all budgets of an owner. No budgets is an empty list, not an error.
    pub async fn list_budgets(&self, owner: &str) -> Result<Vec<Budget>, AppError> {
        require_key("uid", owner)?;
        Ok(self.repo.list_budgets_for_owner(owner).await?)
    }

    /// Update title, total or date. Changing the total keeps posted expenses
    /// and recomputes the remaining balance; a total below them is refused.
    pub async fn update_budget(&self, id: &str, update: BudgetUpdate) -> Result<Budget, AppError> {
        let budget_id = parse_id("budget", id)?;
        update.validate()?;

        match self.repo.update_budget(budget_id, &update).await? {
            LedgerWrite::Applied(budget) => {
                info!(budget_id = %budget.id, "budget updated");
                Ok(budget)
            }
            LedgerWrite::Insufficient {
                available,
                required,
            } => {
                warn!(%budget_id, "budget total below posted expenses");
                Err(AppError::InsufficientFunds {
                    available,
                    required,
                })
            }
            LedgerWrite::BudgetMissing | LedgerWrite::ExpenseMissing => {
                Err(AppError::BudgetNotFound(budget_id.to_string()))
            }
        }
    }

    /// Delete a budget. Its expenses stay behind, orphaned.
    pub async fn delete_budget(&self, id: &str) -> Result<Budget, AppError> {
        let budget_id = parse_id("budget", id)?;
        let budget = self
            .repo
            .delete_budget(budget_id)
            .await?
            .ok_or_else(|| AppError::BudgetNotFound(budget_id.to_string()))?;

        info!(%budget_id, "budget deleted");
        Ok(budget)
    }

    // ========================
    // Expense operations
    // ========================

    /// Post an expense against a budget.
    ///
    /// The identifier is checked before anything else. The insert and the
    /// debit commit together, and the debit only applies while the budget
    /// still covers the amount.
    pub async fn create_expense(&self, input: NewExpense) -> Result<PostedExpense, AppError> {
        let budget_id = parse_id("budget", &input.budget_id)?;
        input.validate()?;

        let expense = input.into_expense(budget_id);
        match self.repo.insert_expense(&expense).await? {
            LedgerWrite::Applied(budget) => {
                info!(
                    expense_id = %expense.id,
                    %budget_id,
                    amount = %format_cents(expense.amount_cents),
                    remaining = %format_cents(budget.remaining_cents),
                    "expense posted"
                );
                Ok(PostedExpense { expense, budget })
            }
            LedgerWrite::Insufficient {
                available,
                required,
            } => {
                warn!(
                    %budget_id,
                    available = %format_cents(available),
                    required = %format_cents(required),
                    "expense rejected: insufficient budget remaining"
                );
                Err(AppError::InsufficientFunds {
                    available,
                    required,
                })
            }
            LedgerWrite::BudgetMissing | LedgerWrite::ExpenseMissing => {
                Err(AppError::BudgetNotFound(budget_id.to_string()))
            }
        }
    }

    /// Get an expense by ID.
    pub async fn get_expense(&self, id: &str) -> Result<Expense, AppError> {
        let expense_id = parse_id("expense", id)?;
        self.repo
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| AppError::ExpenseNotFound(expense_id.to_string()))
    }

    /// All expenses of a budget, newest first. Zero rows is reported as
    /// `NoExpenses`.
    pub async fn list_expenses(&self, budget_id: &str) -> Result<Vec<Expense>, AppError> {
        let budget_id = parse_id("budget", budget_id)?;
        let expenses = self.repo.list_expenses_for_budget(budget_id).await?;
        if expenses.is_empty() {
            return Err(AppError::NoExpenses(format!("budget {}", budget_id)));
        }
        debug!(%budget_id, count = expenses.len(), "listed expenses");
        Ok(expenses)
    }

    /// A user's expenses with the current title of their budget, newest first.
    pub async fn list_recent_expenses(&self, user_id: &str) -> Result<Vec<RecentExpense>, AppError> {
        require_key("user", user_id)?;
        let expenses = self.repo.list_recent_expenses(user_id, None).await?;
        if expenses.is_empty() {
            return Err(AppError::NoExpenses(format!("user {}", user_id)));
        }
        Ok(expenses)
    }

    /// Update an expense. The original amount is credited back and the new
    /// one debited in the same transaction.
    pub async fn update_expense(
        &self,
        id: &str,
        update: ExpenseUpdate,
    ) -> Result<Expense, AppError> {
        let expense_id: ExpenseId = parse_id("expense", id)?;
        update.validate()?;

        match self.repo.update_expense(expense_id, &update).await? {
            LedgerWrite::Applied(expense) => {
                info!(
                    %expense_id,
                    amount = %format_cents(expense.amount_cents),
                    "expense updated"
                );
                Ok(expense)
            }
            LedgerWrite::Insufficient {
                available,
                required,
            } => {
                warn!(%expense_id, "expense update rejected: insufficient budget remaining");
                Err(AppError::InsufficientFunds {
                    available,
                    required,
                })
            }
            LedgerWrite::ExpenseMissing | LedgerWrite::BudgetMissing => {
                Err(AppError::ExpenseNotFound(expense_id.to_string()))
            }
        }
    }

    /// Delete an expense and credit its amount back to the budget.
    pub async fn delete_expense(&self, id: &str) -> Result<Expense, AppError> {
        let expense_id = parse_id("expense", id)?;
        let expense = self
            .repo
            .delete_expense(expense_id)
            .await?
            .ok_or_else(|| AppError::ExpenseNotFound(expense_id.to_string()))?;

        info!(
            %expense_id,
            budget_id = %expense.budget_id,
            refunded = %format_cents(expense.amount_cents),
            "expense deleted"
        );
        Ok(expense)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id("budget", &id.to_string()).unwrap(), id);
        assert_eq!(parse_id("budget", &format!(" {} ", id)).unwrap(), id);

        match parse_id("expense", "64b7f0c2a1") {
            Err(AppError::InvalidId { kind, value }) => {
                assert_eq!(kind, "expense");
                assert_eq!(value, "64b7f0c2a1");
            }
            other => panic!("expected InvalidId, got {:?}", other),
        }
    }
}

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    Budget, BudgetId, BudgetTitle, BudgetUpdate, Cents, Expense, ExpenseId, ExpenseUpdate,
    RecentExpense,
};

use super::MIGRATION_001_INITIAL;

const BUDGET_COLUMNS: &str =
    "id, owner, title, total_cents, remaining_cents, expenses_cents, date, created_at";

const EXPENSE_COLUMNS: &str = "id, budget_id, amount_cents, description, date, user_id, created_at";

/// Outcome of a write that moves money in or out of a budget.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerWrite<T> {
    Applied(T),
    BudgetMissing,
    ExpenseMissing,
    /// The conditional balance update refused the change.
    Insufficient { available: Cents, required: Cents },
}

/// Expense totals for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyAggregate {
    /// `YYYY-MM`
    pub month: String,
    pub total: Cents,
    pub count: i64,
}

/// A budget alongside what its expense rows actually add up to.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetAggregate {
    pub budget: Budget,
    pub expense_count: i64,
    pub posted_cents: Cents,
}

/// Repository for persisting and querying budgets and expenses.
///
/// Every write that touches a budget balance runs in one transaction behind
/// `write_lock`, so concurrent requests cannot interleave a check and a debit.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Connect to a SQLite database URL such as `sqlite:budgetbook.db?mode=rwc`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run more than once.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Budget operations
    // ========================

    /// Save a new budget.
    pub async fn save_budget(&self, budget: &Budget) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        sqlx::query(
            r#"
            INSERT INTO budgets (id, owner, title, total_cents, remaining_cents, expenses_cents, date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(budget.id.to_string())
        .bind(&budget.owner)
        .bind(&budget.title)
        .bind(budget.total_cents)
        .bind(budget.remaining_cents)
        .bind(budget.expenses_cents)
        .bind(budget.date.to_rfc3339())
        .bind(budget.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save budget")?;
        Ok(())
    }

    /// Get a budget by ID.
    pub async fn get_budget(&self, id: BudgetId) -> Result<Option<Budget>> {
        let row = sqlx::query(&format!("SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch budget")?;

        row.as_ref().map(Self::row_to_budget).transpose()
    }

    /// List budgets belonging to an owner, oldest first.
    pub async fn list_budgets_for_owner(&self, owner: &str) -> Result<Vec<Budget>> {
        let rows = sqlx::query(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets WHERE owner = ? ORDER BY created_at, id"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list budgets")?;

        rows.iter().map(Self::row_to_budget).collect()
    }

    /// Merge an update into a budget. A new total is rejected when it is below
    /// what has already been spent.
    pub async fn update_budget(
        &self,
        id: BudgetId,
        update: &BudgetUpdate,
    ) -> Result<LedgerWrite<Budget>> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let row = sqlx::query(&format!("SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch budget")?;
        let Some(current) = row.as_ref().map(Self::row_to_budget).transpose()? else {
            return Ok(LedgerWrite::BudgetMissing);
        };

        let merged = update.merge_into(&current);
        if merged.remaining_cents < 0 {
            return Ok(LedgerWrite::Insufficient {
                available: merged.total_cents,
                required: current.expenses_cents,
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE budgets
            SET title = ?, total_cents = ?, remaining_cents = ? - expenses_cents, date = ?
            WHERE id = ? AND expenses_cents <= ?
            "#,
        )
        .bind(&merged.title)
        .bind(merged.total_cents)
        .bind(merged.total_cents)
        .bind(merged.date.to_rfc3339())
        .bind(id.to_string())
        .bind(merged.total_cents)
        .execute(&mut *tx)
        .await
        .context("Failed to update budget")?;

        if result.rows_affected() == 0 {
            return Ok(LedgerWrite::Insufficient {
                available: merged.total_cents,
                required: current.expenses_cents,
            });
        }

        tx.commit().await.context("Failed to commit budget update")?;
        Ok(LedgerWrite::Applied(merged))
    }

    /// Delete a budget and return it. Its expenses are left in place.
    pub async fn delete_budget(&self, id: BudgetId) -> Result<Option<Budget>> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let row = sqlx::query(&format!("SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch budget")?;
        let Some(budget) = row.as_ref().map(Self::row_to_budget).transpose()? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM budgets WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete budget")?;

        tx.commit().await.context("Failed to commit budget delete")?;
        Ok(Some(budget))
    }

    // ========================
    // Expense operations
    // ========================

    /// Post an expense and debit its budget in one transaction.
    ///
    /// The debit only applies while `remaining_cents >= amount`, so the
    /// balance can never be driven below zero. Returns the updated budget.
    pub async fn insert_expense(&self, expense: &Expense) -> Result<LedgerWrite<Budget>> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let budget_id = expense.budget_id.to_string();

        let debit = sqlx::query(
            r#"
            UPDATE budgets
            SET remaining_cents = remaining_cents - ?, expenses_cents = expenses_cents + ?
            WHERE id = ? AND remaining_cents >= ?
            "#,
        )
        .bind(expense.amount_cents)
        .bind(expense.amount_cents)
        .bind(&budget_id)
        .bind(expense.amount_cents)
        .execute(&mut *tx)
        .await
        .context("Failed to debit budget")?;

        if debit.rows_affected() == 0 {
            let remaining: Option<Cents> =
                sqlx::query_scalar("SELECT remaining_cents FROM budgets WHERE id = ?")
                    .bind(&budget_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .context("Failed to read budget balance")?;
            return Ok(match remaining {
                None => LedgerWrite::BudgetMissing,
                Some(available) => LedgerWrite::Insufficient {
                    available,
                    required: expense.amount_cents,
                },
            });
        }

        sqlx::query(
            r#"
            INSERT INTO expenses (id, budget_id, amount_cents, description, date, user_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(&budget_id)
        .bind(expense.amount_cents)
        .bind(&expense.description)
        .bind(expense.date.to_rfc3339())
        .bind(&expense.user_id)
        .bind(expense.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save expense")?;

        let row = sqlx::query(&format!("SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = ?"))
            .bind(&budget_id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to reload budget")?;
        let budget = Self::row_to_budget(&row)?;

        tx.commit().await.context("Failed to commit expense")?;
        Ok(LedgerWrite::Applied(budget))
    }

    /// Get an expense by ID.
    pub async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let row = sqlx::query(&format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch expense")?;

        row.as_ref().map(Self::row_to_expense).transpose()
    }

    /// List expenses posted against a budget, newest first.
    pub async fn list_expenses_for_budget(&self, budget_id: BudgetId) -> Result<Vec<Expense>> {
        let rows = sqlx::query(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE budget_id = ? ORDER BY date DESC, created_at DESC"
        ))
        .bind(budget_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list expenses")?;

        rows.iter().map(Self::row_to_expense).collect()
    }

    /// A user's expenses joined with the current title of their budget,
    /// newest first. Orphaned expenses come back without a title.
    pub async fn list_recent_expenses(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RecentExpense>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let rows = sqlx::query(
            r#"
            SELECT e.id, e.budget_id, e.amount_cents, e.description, e.date, b.title AS budget_title
            FROM expenses e
            LEFT JOIN budgets b ON b.id = e.budget_id
            WHERE e.user_id = ?
            ORDER BY e.date DESC, e.created_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list recent expenses")?;

        rows.iter()
            .map(|row| -> Result<RecentExpense> {
                let id_str: String = row.get("id");
                let budget_id_str: String = row.get("budget_id");
                let title: Option<String> = row.get("budget_title");
                Ok(RecentExpense {
                    id: Uuid::parse_str(&id_str).context("Invalid expense ID")?,
                    budget_id: Uuid::parse_str(&budget_id_str).context("Invalid budget ID")?,
                    amount_cents: row.get("amount_cents"),
                    description: row.get("description"),
                    date: Self::parse_timestamp(row.get("date"), "date")?,
                    budget: title.map(|title| BudgetTitle { title }),
                })
            })
            .collect()
    }

    /// Apply an update to an expense, moving the amount difference in or out
    /// of its budget. Orphaned expenses are updated without reconciliation.
    pub async fn update_expense(
        &self,
        id: ExpenseId,
        update: &ExpenseUpdate,
    ) -> Result<LedgerWrite<Expense>> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let row = sqlx::query(&format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch expense")?;
        let Some(current) = row.as_ref().map(Self::row_to_expense).transpose()? else {
            return Ok(LedgerWrite::ExpenseMissing);
        };

        let merged = update.merge_into(&current);
        let delta = merged.amount_cents - current.amount_cents;

        if delta != 0 {
            let budget_id = current.budget_id.to_string();
            let rebalance = sqlx::query(
                r#"
                UPDATE budgets
                SET remaining_cents = remaining_cents - ?, expenses_cents = expenses_cents + ?
                WHERE id = ? AND remaining_cents >= ?
                "#,
            )
            .bind(delta)
            .bind(delta)
            .bind(&budget_id)
            .bind(delta)
            .execute(&mut *tx)
            .await
            .context("Failed to rebalance budget")?;

            if rebalance.rows_affected() == 0 {
                let remaining: Option<Cents> =
                    sqlx::query_scalar("SELECT remaining_cents FROM budgets WHERE id = ?")
                        .bind(&budget_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .context("Failed to read budget balance")?;
                if let Some(remaining) = remaining {
                    return Ok(LedgerWrite::Insufficient {
                        available: remaining + current.amount_cents,
                        required: merged.amount_cents,
                    });
                }
            }
        }

        sqlx::query("UPDATE expenses SET amount_cents = ?, description = ?, date = ? WHERE id = ?")
            .bind(merged.amount_cents)
            .bind(&merged.description)
            .bind(merged.date.to_rfc3339())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to update expense")?;

        tx.commit().await.context("Failed to commit expense update")?;
        Ok(LedgerWrite::Applied(merged))
    }

    /// Delete an expense and credit its amount back to the budget.
    pub async fn delete_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let row = sqlx::query(&format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch expense")?;
        let Some(expense) = row.as_ref().map(Self::row_to_expense).transpose()? else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE budgets
            SET remaining_cents = remaining_cents + ?, expenses_cents = expenses_cents - ?
            WHERE id = ?
            "#,
        )
        .bind(expense.amount_cents)
        .bind(expense.amount_cents)
        .bind(expense.budget_id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to credit budget")?;

        sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete expense")?;

        tx.commit().await.context("Failed to commit expense delete")?;
        Ok(Some(expense))
    }

    // ========================
    // Aggregations
    // ========================

    /// Expense totals per calendar month, oldest month first.
    pub async fn monthly_totals(
        &self,
        user_id: Option<&str>,
        year: Option<i32>,
    ) -> Result<Vec<MonthlyAggregate>> {
        let rows = sqlx::query(
            r#"
            SELECT substr(date, 1, 7) AS month, SUM(amount_cents) AS total, COUNT(*) AS count
            FROM expenses
            WHERE (?1 IS NULL OR user_id = ?1)
              AND (?2 IS NULL OR substr(date, 1, 4) = ?2)
            GROUP BY month
            ORDER BY month
            "#,
        )
        .bind(user_id)
        .bind(year.map(|y| format!("{:04}", y)))
        .fetch_all(&self.pool)
        .await
        .context("Failed to aggregate expenses by month")?;

        Ok(rows
            .iter()
            .map(|row| MonthlyAggregate {
                month: row.get("month"),
                total: row.get("total"),
                count: row.get("count"),
            })
            .collect())
    }

    /// Every budget (optionally of one owner) with the count and sum of the
    /// expense rows that reference it.
    pub async fn budget_aggregates(&self, owner: Option<&str>) -> Result<Vec<BudgetAggregate>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.owner, b.title, b.total_cents, b.remaining_cents, b.expenses_cents,
                   b.date, b.created_at,
                   COUNT(e.id) AS expense_count,
                   COALESCE(SUM(e.amount_cents), 0) AS posted_cents
            FROM budgets b
            LEFT JOIN expenses e ON e.budget_id = b.id
            WHERE (?1 IS NULL OR b.owner = ?1)
            GROUP BY b.id
            ORDER BY b.created_at, b.id
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .context("Failed to aggregate budgets")?;

        rows.iter()
            .map(|row| -> Result<BudgetAggregate> {
                Ok(BudgetAggregate {
                    budget: Self::row_to_budget(row)?,
                    expense_count: row.get("expense_count"),
                    posted_cents: row.get("posted_cents"),
                })
            })
            .collect()
    }

    fn parse_timestamp(value: String, field: &str) -> Result<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(&value)
            .with_context(|| format!("Invalid {} timestamp", field))?
            .with_timezone(&Utc))
    }

    fn row_to_budget(row: &SqliteRow) -> Result<Budget> {
        let id_str: String = row.get("id");

        Ok(Budget {
            id: Uuid::parse_str(&id_str).context("Invalid budget ID")?,
            owner: row.get("owner"),
            title: row.get("title"),
            total_cents: row.get("total_cents"),
            remaining_cents: row.get("remaining_cents"),
            expenses_cents: row.get("expenses_cents"),
            date: Self::parse_timestamp(row.get("date"), "date")?,
            created_at: Self::parse_timestamp(row.get("created_at"), "created_at")?,
        })
    }

    fn row_to_expense(row: &SqliteRow) -> Result<Expense> {
        let id_str: String = row.get("id");
        let budget_id_str: String = row.get("budget_id");

        Ok(Expense {
            id: Uuid::parse_str(&id_str).context("Invalid expense ID")?,
            budget_id: Uuid::parse_str(&budget_id_str).context("Invalid budget ID")?,
            amount_cents: row.get("amount_cents"),
            description: row.get("description"),
            date: Self::parse_timestamp(row.get("date"), "date")?,
            user_id: row.get("user_id"),
            created_at: Self::parse_timestamp(row.get("created_at"), "created_at")?,
        })
    }
}

use std::io::Write;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use crate::application::{BudgetSummary, Dashboard, LedgerService, MonthlyReport};
use crate::config::Config;
use crate::domain::{
    BudgetUpdate, Cents, ExpenseUpdate, NewBudget, NewExpense, date, format_cents, parse_cents,
};
use crate::telemetry::init_tracing;

/// budgetbook - personal budgets and expenses
#[derive(Parser)]
#[command(name = "budgetbook")]
#[command(about = "Track budgets and the expenses posted against them")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides BUDGETBOOK_DB)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create (or migrate) the database
    Init,

    /// Run the HTTP API
    Serve {
        /// Address to listen on (overrides BUDGETBOOK_LISTEN / PORT)
        #[arg(long)]
        listen: Option<SocketAddr>,
    },

    /// Budget management commands
    #[command(subcommand)]
    Budget(BudgetCommands),

    /// Expense management commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Spending reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Verify that budget balances agree with their expenses
    Check {
        /// Only check budgets of this owner
        #[arg(long)]
        owner: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Create a budget
    Create {
        /// Total amount (e.g., "400.00" or "400")
        amount: String,

        /// Owner id
        #[arg(long)]
        owner: String,

        /// Budget title
        #[arg(long)]
        title: String,

        /// Budget date (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List an owner's budgets
    List {
        #[arg(long)]
        owner: String,
    },

    /// Change a budget's title, total or date
    Update {
        /// Budget ID
        id: String,

        #[arg(long)]
        title: Option<String>,

        /// New total amount
        #[arg(long)]
        amount: Option<String>,

        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a budget (its expenses are kept)
    Delete {
        /// Budget ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Post an expense against a budget
    Add {
        /// Amount spent (e.g., "12.50")
        amount: String,

        /// Budget ID
        #[arg(long)]
        budget: String,

        /// User id
        #[arg(long)]
        user: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Expense date (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List the expenses of a budget
    List {
        /// Budget ID
        #[arg(long)]
        budget: String,
    },

    /// List a user's expenses, newest first
    Recent {
        #[arg(long)]
        user: String,
    },

    /// Change an expense; the budget balance is adjusted by the difference
    Update {
        /// Expense ID
        id: String,

        #[arg(long)]
        amount: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        date: Option<String>,
    },

    /// Delete an expense and refund its budget
    Delete {
        /// Expense ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Spending per month
    Monthly {
        /// Only this user's expenses
        #[arg(long)]
        user: Option<String>,

        /// Only this year
        #[arg(long)]
        year: Option<i32>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Per-budget totals
    Budgets {
        #[arg(long)]
        owner: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Totals across all budgets plus the latest expenses
    Dashboard {
        #[arg(long)]
        owner: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::from_env()?;
        let database = self
            .database
            .clone()
            .unwrap_or_else(|| config.database_path.clone());

        let default_filter = match (&self.command, self.verbose) {
            (_, true) => "debug",
            (Commands::Serve { .. }, false) => "info",
            _ => "warn",
        };
        init_tracing(config.log_format, default_filter);

        match self.command {
            Commands::Init => {
                LedgerService::init(&database).await?;
                println!("Database initialized: {}", database);
            }

            Commands::Serve { listen } => {
                let service = LedgerService::init(&database).await?;
                let addr = listen.unwrap_or(config.listen_addr);
                crate::api::serve(service, addr).await?;
            }

            Commands::Budget(cmd) => {
                let service = LedgerService::connect(&database).await?;
                run_budget_command(&service, cmd).await?;
            }

            Commands::Expense(cmd) => {
                let service = LedgerService::connect(&database).await?;
                run_expense_command(&service, cmd).await?;
            }

            Commands::Report(cmd) => {
                let service = LedgerService::connect(&database).await?;
                run_report_command(&service, cmd).await?;
            }

            Commands::Check { owner } => {
                let service = LedgerService::connect(&database).await?;
                let issues = service.check_consistency(owner.as_deref()).await?;
                if issues.is_empty() {
                    println!("All budget balances match their expenses.");
                } else {
                    println!(
                        "{:<38} {:<20} {:>12} {:>12} {:>12} {:>12}",
                        "BUDGET", "TITLE", "STORED", "POSTED", "REMAINING", "EXPECTED"
                    );
                    println!("{}", "-".repeat(110));
                    for issue in &issues {
                        println!(
                            "{:<38} {:<20} {:>12} {:>12} {:>12} {:>12}",
                            issue.budget_id,
                            truncate(&issue.title, 20),
                            format_cents(issue.stored_expenses),
                            format_cents(issue.posted),
                            format_cents(issue.stored_remaining),
                            format_cents(issue.expected_remaining),
                        );
                    }
                    anyhow::bail!("{} budget(s) out of balance", issues.len());
                }
            }
        }

        Ok(())
    }
}

fn parse_amount(input: &str) -> Result<Cents> {
    parse_cents(input).with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", input))
}

fn parse_date_arg(input: Option<String>) -> Result<Option<DateTime<Utc>>> {
    input
        .map(|raw| {
            date::parse_date(&raw)
                .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", raw))
        })
        .transpose()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

async fn run_budget_command(service: &LedgerService, cmd: BudgetCommands) -> Result<()> {
    match cmd {
        BudgetCommands::Create {
            amount,
            owner,
            title,
            date,
        } => {
            let budget = service
                .create_budget(NewBudget {
                    uid: owner,
                    title,
                    total_amount: parse_amount(&amount)?,
                    date: parse_date_arg(date)?,
                })
                .await?;
            println!(
                "Created budget: {} ({}) {}",
                budget.title,
                format_cents(budget.total_cents),
                budget.id
            );
        }

        BudgetCommands::List { owner } => {
            let budgets = service.list_budgets(&owner).await?;
            if budgets.is_empty() {
                println!("No budgets found.");
            } else {
                println!(
                    "{:<38} {:<20} {:>12} {:>12} {:>12}",
                    "ID", "TITLE", "TOTAL", "SPENT", "REMAINING"
                );
                println!("{}", "-".repeat(98));
                for budget in budgets {
                    println!(
                        "{:<38} {:<20} {:>12} {:>12} {:>12}",
                        budget.id,
                        truncate(&budget.title, 20),
                        format_cents(budget.total_cents),
                        format_cents(budget.expenses_cents),
                        format_cents(budget.remaining_cents),
                    );
                }
            }
        }

        BudgetCommands::Update {
            id,
            title,
            amount,
            date,
        } => {
            let update = BudgetUpdate {
                title,
                total_amount: amount.as_deref().map(parse_amount).transpose()?,
                date: parse_date_arg(date)?,
            };
            let budget = service.update_budget(&id, update).await?;
            println!(
                "Updated budget: {} ({} remaining of {})",
                budget.title,
                format_cents(budget.remaining_cents),
                format_cents(budget.total_cents)
            );
        }

        BudgetCommands::Delete { id } => {
            let budget = service.delete_budget(&id).await?;
            println!("Deleted budget: {}", budget.title);
        }
    }

    Ok(())
}

async fn run_expense_command(service: &LedgerService, cmd: ExpenseCommands) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            amount,
            budget,
            user,
            description,
            date,
        } => {
            let posted = service
                .create_expense(NewExpense {
                    budget_id: budget,
                    amount: parse_amount(&amount)?,
                    description,
                    date: parse_date_arg(date)?,
                    user_id: user,
                })
                .await?;
            println!(
                "Recorded expense: {} against {} ({} remaining) {}",
                format_cents(posted.expense.amount_cents),
                posted.budget.title,
                format_cents(posted.budget.remaining_cents),
                posted.expense.id
            );
        }

        ExpenseCommands::List { budget } => {
            let expenses = service.list_expenses(&budget).await?;
            println!(
                "{:<38} {:<12} {:>12} {:<30}",
                "ID", "DATE", "AMOUNT", "DESCRIPTION"
            );
            println!("{}", "-".repeat(94));
            for expense in expenses {
                println!(
                    "{:<38} {:<12} {:>12} {:<30}",
                    expense.id,
                    expense.date.format("%Y-%m-%d"),
                    format_cents(expense.amount_cents),
                    truncate(&expense.description, 30),
                );
            }
        }

        ExpenseCommands::Recent { user } => {
            let expenses = service.list_recent_expenses(&user).await?;
            println!(
                "{:<12} {:>12} {:<20} {:<30}",
                "DATE", "AMOUNT", "BUDGET", "DESCRIPTION"
            );
            println!("{}", "-".repeat(77));
            for expense in expenses {
                let title = expense
                    .budget
                    .as_ref()
                    .map(|b| b.title.as_str())
                    .unwrap_or("(deleted)");
                println!(
                    "{:<12} {:>12} {:<20} {:<30}",
                    expense.date.format("%Y-%m-%d"),
                    format_cents(expense.amount_cents),
                    truncate(title, 20),
                    truncate(&expense.description, 30),
                );
            }
        }

        ExpenseCommands::Update {
            id,
            amount,
            description,
            date,
        } => {
            let update = ExpenseUpdate {
                amount: amount.as_deref().map(parse_amount).transpose()?,
                description,
                date: parse_date_arg(date)?,
            };
            let expense = service.update_expense(&id, update).await?;
            println!(
                "Updated expense: {} {}",
                format_cents(expense.amount_cents),
                expense.id
            );
        }

        ExpenseCommands::Delete { id } => {
            let expense = service.delete_expense(&id).await?;
            println!(
                "Deleted expense: {} (refunded to budget {})",
                format_cents(expense.amount_cents),
                expense.budget_id
            );
        }
    }

    Ok(())
}

async fn run_report_command(service: &LedgerService, cmd: ReportCommands) -> Result<()> {
    let stdout = std::io::stdout();
    match cmd {
        ReportCommands::Monthly { user, year, format } => {
            let report = service.generate_report(user.as_deref(), year).await?;
            write_monthly_report(stdout.lock(), &report, format)?;
        }

        ReportCommands::Budgets { owner, format } => {
            let summaries = service.get_budget_data(&owner).await?;
            write_budget_summaries(stdout.lock(), &summaries, format)?;
        }

        ReportCommands::Dashboard { owner, format } => {
            let dashboard = service.get_dashboard(&owner).await?;
            write_dashboard(stdout.lock(), &dashboard, format)?;
        }
    }

    Ok(())
}

fn write_monthly_report<W: Write>(
    mut out: W,
    report: &MonthlyReport,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, report)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(["month", "total", "count"])?;
            for month in &report.months {
                writer.write_record([
                    month.month.clone(),
                    format_cents(month.total),
                    month.count.to_string(),
                ])?;
            }
            writer.flush()?;
        }
        OutputFormat::Table => {
            if report.months.is_empty() {
                writeln!(out, "No expenses found.")?;
                return Ok(());
            }
            writeln!(out, "{:<10} {:>12} {:>8}", "MONTH", "TOTAL", "COUNT")?;
            writeln!(out, "{}", "-".repeat(32))?;
            for month in &report.months {
                writeln!(
                    out,
                    "{:<10} {:>12} {:>8}",
                    month.month,
                    format_cents(month.total),
                    month.count
                )?;
            }
            writeln!(out, "{}", "-".repeat(32))?;
            writeln!(
                out,
                "{:<10} {:>12} {:>8}",
                "TOTAL",
                format_cents(report.total),
                report.count
            )?;
        }
    }
    Ok(())
}

fn write_dashboard<W: Write>(mut out: W, dashboard: &Dashboard, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, dashboard)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(["budget_count", "budgeted", "spent", "remaining"])?;
            writer.write_record([
                dashboard.budget_count.to_string(),
                format_cents(dashboard.total_budgeted),
                format_cents(dashboard.total_spent),
                format_cents(dashboard.total_remaining),
            ])?;
            writer.flush()?;
        }
        OutputFormat::Table => {
            writeln!(out, "Budgets:   {}", dashboard.budget_count)?;
            writeln!(out, "Budgeted:  {}", format_cents(dashboard.total_budgeted))?;
            writeln!(out, "Spent:     {}", format_cents(dashboard.total_spent))?;
            writeln!(out, "Remaining: {}", format_cents(dashboard.total_remaining))?;
            if !dashboard.recent_expenses.is_empty() {
                writeln!(out)?;
                writeln!(out, "Latest expenses:")?;
                for expense in &dashboard.recent_expenses {
                    writeln!(
                        out,
                        "  {} {:>12} {}",
                        expense.date.format("%Y-%m-%d"),
                        format_cents(expense.amount_cents),
                        expense.description
                    )?;
                }
            }
        }
    }
    Ok(())
}

fn write_budget_summaries<W: Write>(
    mut out: W,
    summaries: &[BudgetSummary],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, summaries)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record([
                "id",
                "title",
                "total",
                "spent",
                "remaining",
                "expense_count",
                "utilization",
                "balanced",
            ])?;
            for summary in summaries {
                writer.write_record([
                    summary.budget.id.to_string(),
                    summary.budget.title.clone(),
                    format_cents(summary.budget.total_cents),
                    format_cents(summary.budget.expenses_cents),
                    format_cents(summary.budget.remaining_cents),
                    summary.expense_count.to_string(),
                    format!("{:.1}", summary.utilization),
                    summary.balanced.to_string(),
                ])?;
            }
            writer.flush()?;
        }
        OutputFormat::Table => {
            if summaries.is_empty() {
                writeln!(out, "No budgets found.")?;
                return Ok(());
            }
            writeln!(
                out,
                "{:<20} {:>12} {:>12} {:>12} {:>6} {:>7}",
                "BUDGET", "TOTAL", "SPENT", "REMAINING", "COUNT", "USED"
            )?;
            writeln!(out, "{}", "-".repeat(74))?;
            for summary in summaries {
                writeln!(
                    out,
                    "{:<20} {:>12} {:>12} {:>12} {:>6} {:>6.1}%",
                    truncate(&summary.budget.title, 20),
                    format_cents(summary.budget.total_cents),
                    format_cents(summary.budget.expenses_cents),
                    format_cents(summary.budget.remaining_cents),
                    summary.expense_count,
                    summary.utilization,
                )?;
            }
        }
    }
    Ok(())
}

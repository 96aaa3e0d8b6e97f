use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::{ApiResult, AppState};
use crate::domain::{Expense, ExpenseUpdate, NewExpense, RecentExpense};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BudgetQuery {
    #[serde(default)]
    budget_id: String,
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    #[serde(default)]
    user: String,
}

#[derive(Serialize)]
struct ExpenseMessage {
    message: &'static str,
    expense: Expense,
}

async fn add_expense(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewExpense>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    let Json(input) = payload?;
    let posted = state.ledger.create_expense(input).await?;
    Ok((StatusCode::CREATED, Json(posted.expense)))
}

async fn get_expenses(
    State(state): State<Arc<AppState>>,
    query: Result<Query<BudgetQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Expense>>> {
    let Query(query) = query?;
    let expenses = state.ledger.list_expenses(&query.budget_id).await?;
    Ok(Json(expenses))
}

async fn get_latest_expenses(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<RecentExpense>>> {
    let Query(query) = query?;
    let expenses = state.ledger.list_recent_expenses(&query.user).await?;
    Ok(Json(expenses))
}

async fn update_expense(
    Path(expense_id): Path<String>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExpenseUpdate>, JsonRejection>,
) -> ApiResult<Json<Expense>> {
    let Json(update) = payload?;
    let expense = state.ledger.update_expense(&expense_id, update).await?;
    Ok(Json(expense))
}

async fn delete_expense(
    Path(expense_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ExpenseMessage>> {
    let expense = state.ledger.delete_expense(&expense_id).await?;
    Ok(Json(ExpenseMessage {
        message: "Expense deleted successfully",
        expense,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/addexpense", post(add_expense))
        .route("/getexpenses", get(get_expenses))
        .route("/getlatestexpenses", get(get_latest_expenses))
        .route("/updateexpense/{expenseId}", put(update_expense))
        .route("/deleteexpense/{expenseId}", delete(delete_expense))
}

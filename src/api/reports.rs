use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::budgets::OwnerQuery;
use super::{ApiResult, AppState};
use crate::application::{BudgetSummary, Dashboard, MonthlyReport};

#[derive(Debug, Deserialize)]
struct MonthlyQuery {
    user: Option<String>,
    year: Option<i32>,
}

async fn get_expenses_by_month(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MonthlyQuery>, QueryRejection>,
) -> ApiResult<Json<MonthlyReport>> {
    let Query(query) = query?;
    let report = state
        .ledger
        .generate_report(query.user.as_deref(), query.year)
        .await?;
    Ok(Json(report))
}

async fn get_budget_data(
    State(state): State<Arc<AppState>>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<BudgetSummary>>> {
    let Query(query) = query?;
    let summaries = state.ledger.get_budget_data(&query.uid).await?;
    Ok(Json(summaries))
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> ApiResult<Json<Dashboard>> {
    let Query(query) = query?;
    let dashboard = state.ledger.get_dashboard(&query.uid).await?;
    Ok(Json(dashboard))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/getexpensesbymonth", get(get_expenses_by_month))
        .route("/getbudgetdata", get(get_budget_data))
        .route("/getDashBoardData", get(get_dashboard))
}

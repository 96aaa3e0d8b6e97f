use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::{ApiResult, AppState};
use crate::domain::{Budget, BudgetUpdate, NewBudget};

#[derive(Debug, Deserialize)]
pub(super) struct OwnerQuery {
    #[serde(default)]
    pub uid: String,
}

#[derive(Serialize)]
struct BudgetMessage {
    message: &'static str,
    budget: Budget,
}

async fn add_budget(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewBudget>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BudgetMessage>)> {
    let Json(input) = payload?;
    let budget = state.ledger.create_budget(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(BudgetMessage {
            message: "Budget saved successfully",
            budget,
        }),
    ))
}

async fn get_budgets(
    State(state): State<Arc<AppState>>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Budget>>> {
    let Query(query) = query?;
    let budgets = state.ledger.list_budgets(&query.uid).await?;
    Ok(Json(budgets))
}

async fn update_budget(
    Path(budget_id): Path<String>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BudgetUpdate>, JsonRejection>,
) -> ApiResult<Json<BudgetMessage>> {
    let Json(update) = payload?;
    let budget = state.ledger.update_budget(&budget_id, update).await?;
    Ok(Json(BudgetMessage {
        message: "Budget updated successfully",
        budget,
    }))
}

async fn delete_budget(
    Path(budget_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<BudgetMessage>> {
    let budget = state.ledger.delete_budget(&budget_id).await?;
    Ok(Json(BudgetMessage {
        message: "Budget deleted successfully",
        budget,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/addbudget", post(add_budget))
        .route("/getbudgets", get(get_budgets))
        .route("/updatebudget/{budgetId}", put(update_budget))
        .route("/deletebudget/{budgetId}", delete(delete_budget))
}

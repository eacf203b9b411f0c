//! Administrative overview numbers.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::models::money::Money;
use crate::models::subscriptions::PaymentStatus;
use crate::server::extract::Caller;
use crate::server::AppState;
use crate::store::Tables;

/// Reported until real health probes exist.
const SYSTEM_HEALTH: u32 = 95;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: usize,
    pub total_farmers: usize,
    pub active_farms: usize,
    pub total_devices: usize,
    pub active_subscriptions: usize,
    pub monthly_revenue: f64,
    pub system_health: u32,
    pub pending_tasks: usize,
    pub pending_payments: usize,
}

pub fn compute_stats(t: &Tables, today: NaiveDate) -> DashboardStats {
    let month_start = today.with_day(1).unwrap_or(today);
    let monthly_revenue: Money = t
        .payments
        .iter()
        .filter(|p| p.payment_date.date_naive() >= month_start)
        .map(|p| p.amount)
        .sum();
    DashboardStats {
        total_users: t.users.len(),
        total_farmers: t.farmers.len(),
        active_farms: t.farms.len(),
        total_devices: t.devices.len(),
        active_subscriptions: t.subscriptions.count(|s| s.is_active_on(today)),
        monthly_revenue: monthly_revenue.as_f64(),
        system_health: SYSTEM_HEALTH,
        pending_tasks: 0,
        pending_payments: t.payments.count(|p| p.status == PaymentStatus::Pending),
    }
}

pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
) -> Json<DashboardStats> {
    let today = Utc::now().date_naive();
    Json(state.store.read(|t| compute_stats(t, today)).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subscriptions::Payment;
    use chrono::TimeZone;

    fn payment(amount: i64, day: u32, status: PaymentStatus) -> Payment {
        let at = Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap();
        Payment {
            id: 0,
            subscription: None,
            amount: Money::from_cents(amount),
            payment_date: at,
            due_date: None,
            status,
            transaction_id: None,
            receipt: None,
            notes: String::new(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn revenue_counts_current_month_only() {
        let mut t = Tables::default();
        t.insert(payment(29900, 2, PaymentStatus::Completed));
        t.insert(payment(100, 20, PaymentStatus::Pending));
        let mut old = payment(5000, 1, PaymentStatus::Completed);
        old.payment_date = Utc.with_ymd_and_hms(2024, 4, 30, 23, 0, 0).unwrap();
        t.insert(old);

        let stats = compute_stats(&t, NaiveDate::from_ymd_opt(2024, 5, 21).unwrap());
        assert_eq!(stats.monthly_revenue, 300.0);
        assert_eq!(stats.pending_payments, 1);
        assert_eq!(stats.system_health, 95);

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("totalUsers").is_some());
        assert!(json.get("monthlyRevenue").is_some());
    }
}

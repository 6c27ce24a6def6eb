use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::{
    entities::{order, OrderStatus},
    errors::ServiceError,
    services::orders::OrderService,
};

/// Months covered by the volume chart, current month included
pub const VOLUME_MONTHS: i32 = 12;

/// Headline figures over all orders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub orders_in_transit: u64,
    pub containers_in_transit: u64,
    #[schema(value_type = String)]
    pub total_value: Decimal,
    #[schema(value_type = String)]
    pub total_initial_payment: Decimal,
    /// `total_value - total_initial_payment`, not floored at zero
    #[schema(value_type = String)]
    pub total_pending_payment: Decimal,
    #[schema(value_type = String)]
    pub average_order_value: Decimal,
    pub next_container_date: Option<DateTime<Utc>>,
    pub total_orders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthBucket {
    #[schema(example = "2024-05")]
    pub month: String,
    #[schema(value_type = String)]
    pub volume: Decimal,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardOverview {
    pub stats: DashboardStats,
    pub monthly_volume: Vec<MonthBucket>,
}

pub fn compute_stats(orders: &[order::Model], now: DateTime<Utc>) -> DashboardStats {
    let mut stats = DashboardStats {
        total_orders: orders.len() as u64,
        ..Default::default()
    };
    let mut containers: HashSet<&str> = HashSet::new();
    let mut unreferenced_in_transit = 0u64;

    for o in orders {
        stats.total_value = stats
            .total_value
            .saturating_add(o.order_value.unwrap_or_default());
        stats.total_initial_payment = stats
            .total_initial_payment
            .saturating_add(o.initial_payment_amount.unwrap_or_default());

        if o.status == OrderStatus::InTransit {
            stats.orders_in_transit += 1;
            match o.container_reference.as_deref().map(str::trim) {
                Some(r) if !r.is_empty() => {
                    containers.insert(r);
                }
                _ => unreferenced_in_transit += 1,
            }
        }

        if o.expected_start_date > now
            && stats
                .next_container_date
                .map_or(true, |next| o.expected_start_date < next)
        {
            stats.next_container_date = Some(o.expected_start_date);
        }
    }

    stats.containers_in_transit = containers.len() as u64 + unreferenced_in_transit;
    stats.total_pending_payment = stats.total_value.saturating_sub(stats.total_initial_payment);
    stats.average_order_value = stats
        .total_value
        .checked_div(Decimal::from(orders.len() as u64))
        .unwrap_or_default();
    stats
}

fn month_key(index: i32) -> String {
    format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1)
}

fn month_index<T: Datelike>(date: &T) -> i32 {
    date.year() * 12 + date.month0() as i32
}

/// Twelve chronological buckets ending with the month of `now`, empty months included.
pub fn monthly_volume(orders: &[order::Model], now: DateTime<Utc>) -> Vec<MonthBucket> {
    let last = month_index(&now);
    let first = last - (VOLUME_MONTHS - 1);

    let mut buckets: BTreeMap<i32, (Decimal, u64)> =
        (first..=last).map(|i| (i, (Decimal::ZERO, 0))).collect();

    for o in orders {
        if let Some((volume, count)) = buckets.get_mut(&month_index(&o.order_date)) {
            *volume = volume.saturating_add(o.order_value.unwrap_or_default());
            *count += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(i, (volume, count))| MonthBucket {
            month: month_key(i),
            volume,
            count,
        })
        .collect()
}

/// Service for dashboard aggregates
#[derive(Clone)]
pub struct DashboardService {
    orders: Arc<OrderService>,
}

impl DashboardService {
    pub fn new(orders: Arc<OrderService>) -> Self {
        Self { orders }
    }

    #[instrument(skip(self))]
    pub async fn overview(&self, now: DateTime<Utc>) -> Result<DashboardOverview, ServiceError> {
        let orders = self.orders.all_models().await?;
        let overview = DashboardOverview {
            stats: compute_stats(&orders, now),
            monthly_volume: monthly_volume(&orders, now),
        };
        info!(total_orders = overview.stats.total_orders, "Dashboard computed");
        Ok(overview)
    }
}

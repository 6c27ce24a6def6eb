use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{order, OrderStatus},
    errors::ServiceError,
};

use crate::services::contacts::CarrierService;

impl CarrierService {
    /// Transport counts and the six-month price trend of one carrier
    #[instrument(skip(self), fields(carrier_id = %carrier_id))]
    pub async fn stats(
        &self,
        carrier_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CarrierStats, ServiceError> {
        self.find_model(carrier_id).await?;

        let orders = order::Entity::find()
            .filter(order::Column::CarrierId.eq(carrier_id))
            .all(self.db())
            .await
            .map_err(|e| {
                error!(error = %e, carrier_id = %carrier_id, "Failed to load carrier orders");
                ServiceError::from(e)
            })?;

        let active_transports = orders
            .iter()
            .filter(|o| o.status == OrderStatus::InTransit)
            .count() as u64;
        let samples: Vec<(DateTime<Utc>, Option<Decimal>)> = orders
            .iter()
            .map(|o| (o.created_at, o.transport_price))
            .collect();
        let trend = price_trend(&samples, now);

        Ok(CarrierStats {
            carrier_id,
            total_transports: orders.len() as u64,
            active_transports,
            average_price: trend.average_price,
            price_variation: trend.price_variation,
            monthly_prices: trend.monthly_prices,
        })
    }
}

/// Aggregates shown on a carrier's detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CarrierStats {
    pub carrier_id: Uuid,
    /// Orders handled by the carrier
    pub total_transports: u64,
    /// Orders currently in transit
    pub active_transports: u64,
    /// Mean of the monthly average transport prices
    #[schema(value_type = String, example = "1850.00")]
    pub average_price: Decimal,
    /// Change from the first to the last month, in percent
    #[schema(value_type = String, example = "12.50")]
    pub price_variation: Decimal,
    pub monthly_prices: Vec<MonthlyPrice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyPrice {
    /// `YYYY-MM`
    pub month: String,
    #[schema(value_type = String)]
    pub average_price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceTrend {
    pub monthly_prices: Vec<MonthlyPrice>,
    pub average_price: Decimal,
    pub price_variation: Decimal,
}

const PRICE_WINDOW_MONTHS: u32 = 6;

/// Monthly average transport prices of orders created in the last six months.
///
/// Missing and zero prices are ignored and months without prices are skipped.
pub fn price_trend(samples: &[(DateTime<Utc>, Option<Decimal>)], now: DateTime<Utc>) -> PriceTrend {
    let since = now
        .checked_sub_months(Months::new(PRICE_WINDOW_MONTHS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut by_month: BTreeMap<String, (Decimal, u32)> = BTreeMap::new();
    for (created_at, price) in samples {
        let price = match price {
            Some(p) if !p.is_zero() => *p,
            _ => continue,
        };
        if *created_at < since || *created_at > now {
            continue;
        }
        let bucket = by_month
            .entry(created_at.format("%Y-%m").to_string())
            .or_insert((Decimal::ZERO, 0));
        bucket.0 = bucket.0.saturating_add(price);
        bucket.1 += 1;
    }

    let monthly_prices: Vec<MonthlyPrice> = by_month
        .into_iter()
        .map(|(month, (sum, count))| MonthlyPrice {
            month,
            average_price: sum
                .checked_div(Decimal::from(count))
                .unwrap_or_default()
                .round_dp(2),
        })
        .collect();

    let average_price = if monthly_prices.is_empty() {
        Decimal::ZERO
    } else {
        monthly_prices
            .iter()
            .fold(Decimal::ZERO, |total, m| total.saturating_add(m.average_price))
            .checked_div(Decimal::from(monthly_prices.len() as u64))
            .unwrap_or_default()
            .round_dp(2)
    };

    let price_variation = match (monthly_prices.first(), monthly_prices.last()) {
        (Some(first), Some(last)) if monthly_prices.len() > 1 && !first.average_price.is_zero() => {
            last.average_price
                .checked_sub(first.average_price)
                .and_then(|delta| delta.checked_div(first.average_price))
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .map(|pct| pct.round_dp(2))
                .unwrap_or(Decimal::MAX)
        }
        _ => Decimal::ZERO,
    };

    PriceTrend {
        monthly_prices,
        average_price,
        price_variation,
    }
}

//! Wire shape of the order form and its conversion into a validated draft.
//!
//! Every field arrives loosely typed so that all problems can be reported together,
//! per field, before anything touches the database.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{order, OrderStatus};
use crate::errors::FieldError;
use crate::services::reference_data::blank_to_none;

/// Number typed either as JSON number or as text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(serde_json::Number),
    Text(String),
}

impl AmountInput {
    /// `Ok(None)` for blank text.
    fn parse(&self) -> Result<Option<Decimal>, ()> {
        match self {
            AmountInput::Number(n) => {
                let raw = n.to_string();
                Decimal::from_str(&raw)
                    .or_else(|_| Decimal::from_scientific(&raw))
                    .map(Some)
                    .map_err(|_| ())
            }
            AmountInput::Text(t) if t.trim().is_empty() => Ok(None),
            AmountInput::Text(t) => Decimal::from_str(t.trim()).map(Some).map_err(|_| ()),
        }
    }
}

impl From<Decimal> for AmountInput {
    fn from(value: Decimal) -> Self {
        AmountInput::Text(value.to_string())
    }
}

/// Order fields as submitted by a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderForm {
    #[serde(default)]
    #[schema(example = "PO-2024-0042")]
    pub reference: String,
    #[serde(default)]
    #[schema(example = "8d3c4b9e-4b8f-4e8e-9f5c-2f1f0d6c2a11")]
    pub supplier_id: String,
    #[serde(default)]
    pub destination_id: String,
    #[serde(default)]
    pub carrier_id: String,
    #[serde(default)]
    pub product_description: Option<String>,
    #[serde(default)]
    #[schema(example = "40ft HC")]
    pub container_type: String,
    #[serde(default)]
    pub container_reference: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "1850.00")]
    pub transport_price: Option<AmountInput>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "25000.00")]
    pub order_value: Option<AmountInput>,
    /// `pending` when omitted
    #[serde(default)]
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339
    #[serde(default)]
    #[schema(example = "2024-05-02")]
    pub order_date: Option<String>,
    /// Also accepted as `expected_shipping_date`
    #[serde(default, alias = "expected_shipping_date")]
    #[schema(example = "2024-06-10")]
    pub expected_start_date: Option<String>,
    #[serde(default)]
    pub initial_payment_date: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub initial_payment_amount: Option<AmountInput>,
    #[serde(default)]
    pub final_payment_date: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub final_payment_amount: Option<AmountInput>,
    #[serde(default)]
    pub etd: Option<String>,
    #[serde(default)]
    pub eta: Option<String>,
    #[serde(default)]
    pub ata: Option<String>,
}

/// An order that passed field validation
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub reference: String,
    pub supplier_id: Uuid,
    pub destination_id: Uuid,
    pub carrier_id: Uuid,
    pub product_description: Option<String>,
    pub container_type: String,
    pub container_reference: Option<String>,
    pub transport_price: Decimal,
    pub order_value: Decimal,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub expected_start_date: DateTime<Utc>,
    pub initial_payment_date: Option<DateTime<Utc>>,
    pub initial_payment_amount: Option<Decimal>,
    pub final_payment_date: Option<DateTime<Utc>>,
    pub final_payment_amount: Option<Decimal>,
    pub etd: Option<DateTime<Utc>>,
    pub eta: Option<DateTime<Utc>>,
    pub ata: Option<DateTime<Utc>>,
}

const DATE_MESSAGE: &str = "Must be a date (YYYY-MM-DD) or an RFC 3339 timestamp";
const NUMBER_MESSAGE: &str = "Must be a number";
const NEGATIVE_MESSAGE: &str = "Must be zero or greater";
const PRECISION_MESSAGE: &str = "Must have at most two decimal places";
const RANGE_MESSAGE: &str = "Must not exceed 999999999999.99";

/// Largest amount a `NUMERIC(14, 2)` column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Parses a form date. Blank is `None`; a bare date means midnight UTC.
pub fn normalize_date(input: Option<&str>) -> Result<Option<DateTime<Utc>>, String> {
    let raw = match input.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| Some(dt.and_utc()))
            .ok_or_else(|| DATE_MESSAGE.to_string());
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|_| DATE_MESSAGE.to_string())
}

/// Calendar date shown in the edit form.
pub fn to_form_date(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|dt| dt.format("%Y-%m-%d").to_string())
}

struct Collector {
    errors: Vec<FieldError>,
}

impl Collector {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    fn uuid(&mut self, field: &str, value: &str, message: &str) -> Option<Uuid> {
        match Uuid::parse_str(value.trim()) {
            Ok(id) => Some(id),
            Err(_) => {
                self.push(field, message);
                None
            }
        }
    }

    fn date(&mut self, field: &str, value: Option<&str>) -> Option<DateTime<Utc>> {
        match normalize_date(value) {
            Ok(date) => date,
            Err(message) => {
                self.push(field, message);
                None
            }
        }
    }

    fn required_date(&mut self, field: &str, value: Option<&str>, message: &str) -> Option<DateTime<Utc>> {
        match normalize_date(value) {
            Ok(Some(date)) => Some(date),
            Ok(None) => {
                self.push(field, message);
                None
            }
            Err(message) => {
                self.push(field, message);
                None
            }
        }
    }

    fn amount(&mut self, field: &str, value: Option<&AmountInput>) -> Option<Decimal> {
        match value.map(AmountInput::parse) {
            None | Some(Ok(None)) => None,
            Some(Ok(Some(amount))) if amount.is_sign_negative() && !amount.is_zero() => {
                self.push(field, NEGATIVE_MESSAGE);
                None
            }
            Some(Ok(Some(amount))) if amount > MAX_AMOUNT => {
                self.push(field, RANGE_MESSAGE);
                None
            }
            Some(Ok(Some(amount))) if amount.normalize().scale() > 2 => {
                self.push(field, PRECISION_MESSAGE);
                None
            }
            Some(Ok(Some(amount))) => Some(amount),
            Some(Err(())) => {
                self.push(field, NUMBER_MESSAGE);
                None
            }
        }
    }

    fn required_amount(&mut self, field: &str, value: Option<&AmountInput>, message: &str) -> Option<Decimal> {
        let before = self.errors.len();
        let amount = self.amount(field, value);
        if amount.is_none() && self.errors.len() == before {
            self.push(field, message);
        }
        amount
    }
}

impl TryFrom<OrderForm> for OrderDraft {
    type Error = Vec<FieldError>;

    fn try_from(form: OrderForm) -> Result<Self, Self::Error> {
        let mut c = Collector { errors: Vec::new() };

        let reference = form.reference.trim().to_string();
        if reference.is_empty() {
            c.push("reference", "Reference is required");
        }
        let supplier_id = c.uuid("supplier_id", &form.supplier_id, "Select a supplier");
        let destination_id = c.uuid("destination_id", &form.destination_id, "Select a destination");
        let carrier_id = c.uuid("carrier_id", &form.carrier_id, "Select a carrier");

        let container_type = form.container_type.trim().to_string();
        if container_type.is_empty() {
            c.push("container_type", "Select a container type");
        }

        let transport_price = c.required_amount(
            "transport_price",
            form.transport_price.as_ref(),
            "Transport price is required",
        );
        let order_value =
            c.required_amount("order_value", form.order_value.as_ref(), "Order value is required");
        let initial_payment_amount =
            c.amount("initial_payment_amount", form.initial_payment_amount.as_ref());
        let final_payment_amount =
            c.amount("final_payment_amount", form.final_payment_amount.as_ref());

        let status = match form.status.as_deref().map(str::trim) {
            None | Some("") => Some(OrderStatus::Pending),
            Some(raw) => {
                let parsed = OrderStatus::parse(raw);
                if parsed.is_none() {
                    c.push(
                        "status",
                        "Must be one of: pending, in_production, in_transit, delivered",
                    );
                }
                parsed
            }
        };

        let order_date =
            c.required_date("order_date", form.order_date.as_deref(), "Order date is required");
        let expected_start_date = c.required_date(
            "expected_start_date",
            form.expected_start_date.as_deref(),
            "Expected shipping date is required",
        );
        let initial_payment_date = c.date("initial_payment_date", form.initial_payment_date.as_deref());
        let final_payment_date = c.date("final_payment_date", form.final_payment_date.as_deref());
        let etd = c.date("etd", form.etd.as_deref());
        let eta = c.date("eta", form.eta.as_deref());
        let ata = c.date("ata", form.ata.as_deref());

        match (
            supplier_id,
            destination_id,
            carrier_id,
            transport_price,
            order_value,
            status,
            order_date,
            expected_start_date,
        ) {
            (
                Some(supplier_id),
                Some(destination_id),
                Some(carrier_id),
                Some(transport_price),
                Some(order_value),
                Some(status),
                Some(order_date),
                Some(expected_start_date),
            ) if c.errors.is_empty() => Ok(OrderDraft {
                reference,
                supplier_id,
                destination_id,
                carrier_id,
                product_description: blank_to_none(form.product_description),
                container_type,
                container_reference: blank_to_none(form.container_reference),
                transport_price,
                order_value,
                status,
                order_date,
                expected_start_date,
                initial_payment_date,
                initial_payment_amount,
                final_payment_date,
                final_payment_amount,
                etd,
                eta,
                ata,
            }),
            _ => Err(c.errors),
        }
    }
}

/// Order pre-filled into the edit form, dates at calendar-day granularity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderFormView {
    pub id: Option<Uuid>,
    pub reference: String,
    pub supplier_id: Option<Uuid>,
    pub destination_id: Option<Uuid>,
    pub carrier_id: Option<Uuid>,
    pub product_description: Option<String>,
    pub container_type: String,
    pub container_reference: Option<String>,
    #[schema(value_type = Option<String>)]
    pub transport_price: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub order_value: Option<Decimal>,
    pub status: OrderStatus,
    pub order_date: Option<String>,
    pub expected_start_date: Option<String>,
    pub initial_payment_date: Option<String>,
    #[schema(value_type = Option<String>)]
    pub initial_payment_amount: Option<Decimal>,
    pub final_payment_date: Option<String>,
    #[schema(value_type = Option<String>)]
    pub final_payment_amount: Option<Decimal>,
    pub etd: Option<String>,
    pub eta: Option<String>,
    pub ata: Option<String>,
}

impl From<order::Model> for OrderFormView {
    fn from(model: order::Model) -> Self {
        Self {
            id: Some(model.id),
            reference: model.reference,
            supplier_id: Some(model.supplier_id),
            destination_id: Some(model.destination_id),
            carrier_id: Some(model.carrier_id),
            product_description: model.product_description,
            container_type: model.container_type,
            container_reference: model.container_reference,
            transport_price: model.transport_price,
            order_value: model.order_value,
            status: model.status,
            order_date: to_form_date(Some(model.order_date)),
            expected_start_date: to_form_date(Some(model.expected_start_date)),
            initial_payment_date: to_form_date(model.initial_payment_date),
            initial_payment_amount: model.initial_payment_amount,
            final_payment_date: to_form_date(model.final_payment_date),
            final_payment_amount: model.final_payment_amount,
            etd: to_form_date(model.etd),
            eta: to_form_date(model.eta),
            ata: to_form_date(model.ata),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn valid_form() -> OrderForm {
        OrderForm {
            reference: " PO-1 ".into(),
            supplier_id: Uuid::new_v4().to_string(),
            destination_id: Uuid::new_v4().to_string(),
            carrier_id: Uuid::new_v4().to_string(),
            container_type: "40ft HC".into(),
            transport_price: Some(AmountInput::Text("1850.50".into())),
            order_value: Some(AmountInput::Number(serde_json::Number::from(25000))),
            order_date: Some("2024-05-02".into()),
            expected_start_date: Some("2024-06-10T08:30:00-03:00".into()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_form_becomes_a_draft() {
        let draft = OrderDraft::try_from(valid_form()).unwrap();
        assert_eq!(draft.reference, "PO-1");
        assert_eq!(draft.status, OrderStatus::Pending);
        assert_eq!(draft.transport_price, dec!(1850.50));
        assert_eq!(draft.order_value, dec!(25000));
        assert_eq!(draft.order_date, Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap());
        assert_eq!(
            draft.expected_start_date,
            Utc.with_ymd_and_hms(2024, 6, 10, 11, 30, 0).unwrap()
        );
        assert_eq!(draft.etd, None);
    }

    #[test]
    fn every_problem_is_reported_at_once() {
        let form = OrderForm {
            reference: "  ".into(),
            supplier_id: "not-a-uuid".into(),
            destination_id: String::new(),
            transport_price: Some(AmountInput::Text("-5".into())),
            order_value: Some(AmountInput::Text("lots".into())),
            status: Some("shipped".into()),
            eta: Some("31/12/2024".into()),
            ..valid_form()
        };

        let errors = OrderDraft::try_from(form).unwrap_err();
        let mut fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        fields.sort_unstable();
        assert_eq!(
            fields,
            vec![
                "destination_id",
                "eta",
                "order_value",
                "reference",
                "status",
                "supplier_id",
                "transport_price"
            ]
        );
    }

    #[test]
    fn missing_required_values_are_reported() {
        let form = OrderForm {
            transport_price: None,
            order_value: Some(AmountInput::Text(" ".into())),
            order_date: None,
            expected_start_date: Some(String::new()),
            container_type: String::new(),
            ..valid_form()
        };
        let errors = OrderDraft::try_from(form).unwrap_err();
        assert!(errors.contains(&FieldError::new("transport_price", "Transport price is required")));
        assert!(errors.contains(&FieldError::new("order_value", "Order value is required")));
        assert!(errors.contains(&FieldError::new("order_date", "Order date is required")));
        assert!(errors.contains(&FieldError::new(
            "expected_start_date",
            "Expected shipping date is required"
        )));
        assert!(errors.contains(&FieldError::new("container_type", "Select a container type")));
    }

    #[test]
    fn expected_shipping_date_alias_is_accepted() {
        let json = serde_json::json!({
            "reference": "PO-9",
            "expected_shipping_date": "2024-07-01"
        });
        let form: OrderForm = serde_json::from_value(json).unwrap();
        assert_eq!(form.expected_start_date.as_deref(), Some("2024-07-01"));
    }

    #[test]
    fn zero_amounts_and_blank_optionals_are_fine() {
        let form = OrderForm {
            transport_price: Some(AmountInput::Number(serde_json::Number::from(0))),
            initial_payment_amount: Some(AmountInput::Text(String::new())),
            product_description: Some("   ".into()),
            initial_payment_date: Some("".into()),
            ..valid_form()
        };
        let draft = OrderDraft::try_from(form).unwrap();
        assert_eq!(draft.transport_price, Decimal::ZERO);
        assert_eq!(draft.initial_payment_amount, None);
        assert_eq!(draft.product_description, None);
        assert_eq!(draft.initial_payment_date, None);
    }

    #[test]
    fn max_amount_fits_the_column() {
        assert_eq!(MAX_AMOUNT, dec!(999999999999.99));
    }

    #[rstest]
    #[case("999999999999.99", None)]
    #[case("1850.500", None)]
    #[case("1000000000000", Some(RANGE_MESSAGE))]
    #[case("50000000000000000000000000000", Some(RANGE_MESSAGE))]
    #[case("12.345", Some(PRECISION_MESSAGE))]
    fn amounts_must_fit_two_decimal_places(#[case] value: &str, #[case] expected: Option<&str>) {
        let form = OrderForm {
            order_value: Some(AmountInput::Text(value.into())),
            ..valid_form()
        };
        match (OrderDraft::try_from(form), expected) {
            (Ok(_), None) => {}
            (Err(errors), Some(message)) => {
                assert_eq!(errors, vec![FieldError::new("order_value", message)]);
            }
            (other, _) => panic!("unexpected outcome for {}: {:?}", value, other),
        }
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(""), None)]
    #[case(Some("2024-02-29"), Some(Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()))]
    #[case(Some("2024-03-01T10:00:00Z"), Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()))]
    fn dates_normalize_to_utc(#[case] input: Option<&str>, #[case] expected: Option<DateTime<Utc>>) {
        assert_eq!(normalize_date(input).unwrap(), expected);
    }

    #[test]
    fn impossible_dates_are_rejected() {
        assert!(normalize_date(Some("2023-02-29")).is_err());
        assert!(normalize_date(Some("yesterday")).is_err());
    }

    proptest! {
        #[test]
        fn calendar_dates_survive_the_form_round_trip(days in 0i64..40_000) {
            let date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap() + chrono::Duration::days(days);
            let text = date.format("%Y-%m-%d").to_string();
            let parsed = normalize_date(Some(&text)).unwrap();
            prop_assert_eq!(to_form_date(parsed), Some(text));
        }
    }
}

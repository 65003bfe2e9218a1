//! Unit-level sales with split down-payment / delivery revenue recognition.

use cimiento_shared::types::{SalesUnitId, cents, round_money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::allocation::spread_equal;
use super::error::ProjectionError;
use super::metrics::compound_factor;
use super::period::ProjectMonth;

/// Commercial status of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// On the market.
    Available,
    /// Reserved by a buyer, contract not yet signed.
    Reserved,
    /// Contract signed.
    Sold,
    /// Handed over to the buyer.
    Delivered,
}

impl UnitStatus {
    /// Returns true once a buyer has signed.
    #[must_use]
    pub const fn is_sold(self) -> bool {
        matches!(self, Self::Sold | Self::Delivered)
    }
}

/// A sellable unit (apartment, house, commercial space...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesUnit {
    /// Unit ID.
    pub id: SalesUnitId,
    /// Unit code, e.g. "T1-0402".
    pub code: String,
    /// Typology, e.g. "2BR".
    pub typology: Option<String>,
    /// Sellable area in square meters.
    pub area_m2: Decimal,
    /// List price.
    #[serde(serialize_with = "cents::serialize")]
    pub list_price: Decimal,
    /// Discount off the list price, in percent.
    pub discount_pct: Decimal,
    /// Commercial status.
    pub status: UnitStatus,
    /// Month of sale; `None` lets the absorption pace decide.
    pub sale_month: Option<ProjectMonth>,
    /// Month of delivery; `None` uses the scenario default.
    pub delivery_month: Option<ProjectMonth>,
    /// Down payment as a percentage of the net price.
    pub down_payment_pct: Decimal,
    /// Number of monthly installments for the down payment.
    pub down_payment_installments: u32,
}

/// Scenario-level sales assumptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesAssumptions {
    /// First month in which paced units can be sold.
    pub sales_start_month: ProjectMonth,
    /// Units sold per month by the pace.
    pub absorption_per_month: u32,
    /// Delivery month for units without their own.
    pub default_delivery_month: ProjectMonth,
    /// Monthly price escalation for paced units (0.005 for 0.5%).
    pub monthly_price_escalation: Decimal,
}

/// Resolved sale and delivery timing for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitTiming {
    /// Month of sale.
    pub sale_month: ProjectMonth,
    /// Month of delivery.
    pub delivery_month: ProjectMonth,
    /// Whether the sale month was assigned by the pace.
    pub paced: bool,
}

/// Revenue schedule of one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSchedule {
    /// Unit ID.
    pub unit_id: SalesUnitId,
    /// Unit code.
    pub code: String,
    /// Commercial status.
    pub status: UnitStatus,
    /// Sellable area.
    pub area_m2: Decimal,
    /// Month of sale.
    pub sale_month: ProjectMonth,
    /// Month of delivery.
    pub delivery_month: ProjectMonth,
    /// Whether the sale month came from the absorption pace.
    pub paced: bool,
    /// Net price after discount and escalation.
    #[serde(serialize_with = "cents::serialize")]
    pub net_price: Decimal,
    /// Down payment amount.
    #[serde(serialize_with = "cents::serialize")]
    pub down_payment: Decimal,
    /// Number of down payment installments actually used.
    pub installments: u32,
    /// Balance collected at delivery.
    #[serde(serialize_with = "cents::serialize")]
    pub delivery_balance: Decimal,
}

/// Revenue schedule of all units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesSchedule {
    /// Down payment collections per month.
    #[serde(serialize_with = "cents::vec")]
    pub down_payment: Vec<Decimal>,
    /// Delivery collections per month.
    #[serde(serialize_with = "cents::vec")]
    pub delivery: Vec<Decimal>,
    /// Per-unit schedules, in unit order.
    pub units: Vec<UnitSchedule>,
    /// Total net revenue.
    #[serde(serialize_with = "cents::serialize")]
    pub total_revenue: Decimal,
    /// Total sellable area.
    pub total_area: Decimal,
}

fn check_percentage(value: Decimal, what: &str, code: &str) -> Result<(), ProjectionError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(ProjectionError::InvalidPercentage(format!("{what} of unit {code}")));
    }
    Ok(())
}

impl SalesUnit {
    /// Checks price, area, and percentages.
    pub fn validate(&self) -> Result<(), ProjectionError> {
        if self.list_price < Decimal::ZERO {
            return Err(ProjectionError::NegativeAmount(format!(
                "list price of unit {}",
                self.code
            )));
        }
        if self.area_m2 < Decimal::ZERO {
            return Err(ProjectionError::NegativeAmount(format!(
                "area of unit {}",
                self.code
            )));
        }
        check_percentage(self.discount_pct, "discount", &self.code)?;
        check_percentage(self.down_payment_pct, "down payment", &self.code)
    }
}

/// Resolves sale and delivery months for every unit.
///
/// Units with a fixed sale month keep it. The rest are sold by the
/// absorption pace, in unit order, starting at `sales_start_month`.
/// Delivery never precedes the sale.
pub fn resolve_timing(
    units: &[SalesUnit],
    assumptions: &SalesAssumptions,
) -> Result<Vec<UnitTiming>, ProjectionError> {
    let needs_pace = units.iter().any(|u| u.sale_month.is_none());
    if needs_pace && assumptions.absorption_per_month == 0 {
        return Err(ProjectionError::InvalidAbsorption);
    }

    let mut paced_count: u32 = 0;
    Ok(units
        .iter()
        .map(|unit| {
            let (sale_month, paced) = if let Some(month) = unit.sale_month {
                (month, false)
            } else {
                let month =
                    assumptions.sales_start_month + paced_count / assumptions.absorption_per_month;
                paced_count += 1;
                (month, true)
            };
            let delivery_month = unit
                .delivery_month
                .unwrap_or(assumptions.default_delivery_month)
                .max(sale_month);
            UnitTiming {
                sale_month,
                delivery_month,
                paced,
            }
        })
        .collect())
}

/// Last month with a sales collection, if any unit exists.
pub fn last_sales_month(
    units: &[SalesUnit],
    assumptions: &SalesAssumptions,
) -> Result<Option<ProjectMonth>, ProjectionError> {
    Ok(resolve_timing(units, assumptions)?
        .iter()
        .map(|t| t.delivery_month)
        .max())
}

/// Schedules down payment and delivery collections for every unit.
///
/// For each unit the down payment is spread over its installments starting
/// in the sale month, never running past the delivery month, and the
/// balance is collected at delivery. Down payment plus balance always equal
/// the net price.
pub fn schedule_sales(
    units: &[SalesUnit],
    assumptions: &SalesAssumptions,
    horizon: u32,
) -> Result<SalesSchedule, ProjectionError> {
    for unit in units {
        unit.validate()?;
    }
    if assumptions.monthly_price_escalation <= -Decimal::ONE {
        return Err(ProjectionError::InvalidPercentage(
            "monthly price escalation".to_string(),
        ));
    }

    let timings = resolve_timing(units, assumptions)?;
    let mut down_payment = vec![Decimal::ZERO; horizon as usize];
    let mut delivery = vec![Decimal::ZERO; horizon as usize];
    let mut schedules = Vec::with_capacity(units.len());

    for (unit, timing) in units.iter().zip(timings) {
        if timing.delivery_month >= horizon {
            return Err(ProjectionError::BeyondHorizon {
                month: timing.delivery_month,
                horizon,
            });
        }

        let discounted = unit.list_price * (Decimal::ONE - unit.discount_pct / Decimal::ONE_HUNDRED);
        let net_price = if timing.paced {
            let periods = timing.sale_month - assumptions.sales_start_month;
            round_money(discounted * compound_factor(assumptions.monthly_price_escalation, periods))
        } else {
            round_money(discounted)
        };

        let down = round_money(net_price * unit.down_payment_pct / Decimal::ONE_HUNDRED);
        let balance = net_price - down;

        let max_installments = timing.delivery_month - timing.sale_month + 1;
        let installments = unit.down_payment_installments.clamp(1, max_installments);

        for (offset, part) in spread_equal(down, installments as usize)
            .into_iter()
            .enumerate()
        {
            down_payment[timing.sale_month as usize + offset] += part;
        }
        delivery[timing.delivery_month as usize] += balance;

        schedules.push(UnitSchedule {
            unit_id: unit.id,
            code: unit.code.clone(),
            status: unit.status,
            area_m2: unit.area_m2,
            sale_month: timing.sale_month,
            delivery_month: timing.delivery_month,
            paced: timing.paced,
            net_price,
            down_payment: down,
            installments,
            delivery_balance: balance,
        });
    }

    let total_revenue = schedules.iter().map(|u| u.net_price).sum();
    let total_area = units.iter().map(|u| u.area_m2).sum();

    Ok(SalesSchedule {
        down_payment,
        delivery,
        units: schedules,
        total_revenue,
        total_area,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn assumptions() -> SalesAssumptions {
        SalesAssumptions {
            sales_start_month: 1,
            absorption_per_month: 2,
            default_delivery_month: 6,
            monthly_price_escalation: Decimal::ZERO,
        }
    }

    fn unit(code: &str, price: Decimal) -> SalesUnit {
        SalesUnit {
            id: SalesUnitId::new(),
            code: code.to_string(),
            typology: Some("2BR".to_string()),
            area_m2: dec!(80),
            list_price: price,
            discount_pct: Decimal::ZERO,
            status: UnitStatus::Available,
            sale_month: None,
            delivery_month: None,
            down_payment_pct: dec!(30),
            down_payment_installments: 3,
        }
    }

    #[test]
    fn test_pace_assigns_sale_months_in_order() {
        let units: Vec<SalesUnit> = (0..5).map(|i| unit(&format!("U{i}"), dec!(100))).collect();
        let timings = resolve_timing(&units, &assumptions()).unwrap();
        let months: Vec<u32> = timings.iter().map(|t| t.sale_month).collect();
        assert_eq!(months, vec![1, 1, 2, 2, 3]);
        assert!(timings.iter().all(|t| t.paced && t.delivery_month == 6));
    }

    #[test]
    fn test_fixed_sale_month_does_not_consume_pace() {
        let mut sold = unit("SOLD", dec!(100));
        sold.sale_month = Some(0);
        sold.status = UnitStatus::Sold;
        let units = vec![sold, unit("A", dec!(100)), unit("B", dec!(100))];
        let timings = resolve_timing(&units, &assumptions()).unwrap();
        assert_eq!(timings[0].sale_month, 0);
        assert!(!timings[0].paced);
        assert_eq!(timings[1].sale_month, 1);
        assert_eq!(timings[2].sale_month, 1);
    }

    #[test]
    fn test_delivery_never_before_sale() {
        let mut late = unit("LATE", dec!(100));
        late.sale_month = Some(9);
        let timings = resolve_timing(&[late], &assumptions()).unwrap();
        assert_eq!(timings[0].delivery_month, 9);
    }

    #[test]
    fn test_zero_absorption_rejected_with_unsold_units() {
        let mut a = assumptions();
        a.absorption_per_month = 0;
        let err = resolve_timing(&[unit("A", dec!(1))], &a).unwrap_err();
        assert_eq!(err, ProjectionError::InvalidAbsorption);
    }

    #[test]
    fn test_split_recognition() {
        let mut u = unit("A", dec!(100000));
        u.sale_month = Some(1);
        let schedule = schedule_sales(&[u], &assumptions(), 8).unwrap();

        assert_eq!(schedule.down_payment[1], dec!(10000));
        assert_eq!(schedule.down_payment[2], dec!(10000));
        assert_eq!(schedule.down_payment[3], dec!(10000));
        assert_eq!(schedule.delivery[6], dec!(70000));
        assert_eq!(schedule.total_revenue, dec!(100000));
        assert_eq!(schedule.units[0].installments, 3);
    }

    #[test]
    fn test_installments_clamped_to_delivery() {
        let mut u = unit("A", dec!(1000));
        u.sale_month = Some(5);
        u.down_payment_installments = 12;
        let schedule = schedule_sales(&[u], &assumptions(), 8).unwrap();

        // Months 5 and 6 only
        assert_eq!(schedule.units[0].installments, 2);
        assert_eq!(schedule.down_payment[5], dec!(150));
        assert_eq!(schedule.down_payment[6], dec!(150));
        assert_eq!(schedule.delivery[6], dec!(700));
    }

    #[test]
    fn test_discount_and_escalation() {
        let mut a = assumptions();
        a.absorption_per_month = 1;
        a.monthly_price_escalation = dec!(0.01);
        let mut first = unit("A", dec!(1000));
        first.discount_pct = dec!(10);
        let second = unit("B", dec!(1000));

        let schedule = schedule_sales(&[first, second], &a, 8).unwrap();
        // Sold in the start month: no escalation
        assert_eq!(schedule.units[0].net_price, dec!(900));
        // One month later: +1%
        assert_eq!(schedule.units[1].net_price, dec!(1010));
    }

    #[test]
    fn test_invalid_down_payment_percentage() {
        let mut u = unit("A", dec!(1000));
        u.down_payment_pct = dec!(120);
        let err = schedule_sales(&[u], &assumptions(), 8).unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidPercentage(_)));
    }

    #[test]
    fn test_unit_revenue_identity() {
        let mut u = unit("ODD", dec!(99999.99));
        u.down_payment_pct = dec!(33.3);
        u.down_payment_installments = 7;
        let schedule = schedule_sales(&[u], &assumptions(), 8).unwrap();
        let unit = &schedule.units[0];
        assert_eq!(unit.down_payment + unit.delivery_balance, unit.net_price);

        let collected: Decimal = schedule
            .down_payment
            .iter()
            .chain(schedule.delivery.iter())
            .copied()
            .sum();
        assert_eq!(collected, schedule.total_revenue);
    }
}

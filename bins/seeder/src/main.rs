//! Database seeder for Cimiento development and testing.
//!
//! Seeds a demo residential tower: land and S-curve construction costs, a
//! construction loan, and twenty units sold at two per month.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use cimiento_core::projection::{
    CostCategory, Distribution, InterestMode, MovementKind, ProjectionEngine, ProjectionOptions,
    SalesAssumptions, UnitStatus,
};
use cimiento_db::repositories::{
    CostItemRepository, CreateScenarioInput, CreditLineRepository, NewCostItem, NewCreditLine,
    NewCreditMovement, NewSalesUnit, ProjectionRepository, SalesUnitRepository, ScenarioFilter,
    ScenarioRepository,
};
use cimiento_shared::types::{Currency, PageRequest};

/// Name of the demo scenario; seeding is skipped when it already exists.
const DEMO_NAME: &str = "Torre Demo";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = cimiento_db::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    let scenarios = ScenarioRepository::new(db.clone());
    let existing = scenarios
        .list(
            &ScenarioFilter::default(),
            &PageRequest {
                page: 1,
                per_page: 100,
            },
        )
        .await?;
    if existing.data.iter().any(|s| s.name == DEMO_NAME) {
        println!("  Demo scenario already exists, skipping...");
        return Ok(());
    }

    println!("Seeding demo scenario...");
    let scenario = scenarios
        .create(CreateScenarioInput {
            name: DEMO_NAME.to_string(),
            description: Some("Twenty-unit residential tower, 24 month build".to_string()),
            currency: Currency::Usd,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).context("invalid start date")?,
            duration_months: 24,
            discount_rate: dec!(0.12),
            sales: SalesAssumptions {
                sales_start_month: 3,
                absorption_per_month: 2,
                default_delivery_month: 23,
                monthly_price_escalation: dec!(0.005),
            },
        })
        .await?;

    println!("Seeding cost items...");
    CostItemRepository::new(db.clone())
        .create_many(scenario.id, demo_costs())
        .await?;

    println!("Seeding credit line...");
    CreditLineRepository::new(db.clone())
        .create(
            scenario.id,
            NewCreditLine {
                name: "Construction loan".to_string(),
                limit: dec!(1500000),
                annual_rate: dec!(0.09),
                start_month: 4,
                term_months: 20,
                interest_mode: InterestMode::Capitalized,
                movements: [4, 8, 12, 16]
                    .into_iter()
                    .map(|month| NewCreditMovement {
                        month,
                        kind: MovementKind::Drawdown,
                        amount: dec!(375000),
                        note: None,
                    })
                    .collect(),
            },
        )
        .await?;

    println!("Seeding units...");
    SalesUnitRepository::new(db.clone())
        .create_many(scenario.id, demo_units())
        .await?;

    let loaded = ProjectionRepository::new(db)
        .load_input(scenario.id)
        .await?;
    let result = ProjectionEngine::run(&loaded.input, &ProjectionOptions::default())?;
    println!(
        "  Horizon {} months, revenue {}, equity NPV {}",
        result.horizon_months,
        result.metrics.project.total_revenue,
        result.metrics.equity.npv
    );

    println!("Seeding complete!");
    Ok(())
}

fn demo_costs() -> Vec<NewCostItem> {
    let item = |category, description: &str, amount, start_month, duration_months, distribution| {
        NewCostItem {
            category,
            description: description.to_string(),
            amount,
            start_month,
            duration_months,
            distribution,
        }
    };

    vec![
        item(CostCategory::Land, "Lot purchase", dec!(800000), 0, 1, Distribution::Lump),
        item(
            CostCategory::SoftCosts,
            "Design and permits",
            dec!(150000),
            0,
            4,
            Distribution::Custom(vec![dec!(40), dec!(30), dec!(20), dec!(10)]),
        ),
        item(
            CostCategory::Construction,
            "Structure and finishes",
            dec!(2400000),
            4,
            18,
            Distribution::SCurve,
        ),
        item(CostCategory::Marketing, "Sales campaign", dec!(120000), 2, 20, Distribution::Uniform),
        item(CostCategory::Contingency, "Contingency", dec!(100000), 10, 10, Distribution::Uniform),
    ]
}

fn demo_units() -> Vec<NewSalesUnit> {
    (1..=20u32)
        .map(|n| {
            let floor = (n + 1) / 2 + 1;
            let large = n % 2 == 0;
            NewSalesUnit {
                code: format!("T1-{floor:02}{:02}", 2 - n % 2),
                typology: Some(if large { "3BR" } else { "2BR" }.to_string()),
                area_m2: if large { dec!(110) } else { dec!(78) },
                list_price: if large { dec!(245000) } else { dec!(175000) },
                discount_pct: Decimal::ZERO,
                status: if n <= 2 {
                    UnitStatus::Sold
                } else {
                    UnitStatus::Available
                },
                sale_month: (n <= 2).then_some(1),
                delivery_month: None,
                down_payment_pct: dec!(30),
                down_payment_installments: 12,
            }
        })
        .collect()
}

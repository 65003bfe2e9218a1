//! Scenario projects schema.
//!
//! Creates the enums, tables, and indexes behind the projection engine:
//! scenario projects, their cost items, credit lines and movements, units
//! for sale, recorded actuals, and approved baselines.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: SCENARIOS
        // ============================================================
        db.execute_unprepared(SCENARIO_PROJECTS_SQL).await?;

        // ============================================================
        // PART 3: PROJECTION SOURCES
        // ============================================================
        db.execute_unprepared(COST_ITEMS_SQL).await?;
        db.execute_unprepared(CREDIT_LINES_SQL).await?;
        db.execute_unprepared(CREDIT_MOVEMENTS_SQL).await?;
        db.execute_unprepared(UNITS_SQL).await?;

        // ============================================================
        // PART 4: ACTUALS & BASELINES
        // ============================================================
        db.execute_unprepared(ACTUALS_SQL).await?;
        db.execute_unprepared(BASELINES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE scenario_status AS ENUM ('draft', 'approved', 'archived');

CREATE TYPE cost_category AS ENUM (
    'land',
    'construction',
    'soft_costs',
    'marketing',
    'payroll',
    'administrative',
    'commissions',
    'contingency',
    'other'
);

CREATE TYPE cost_distribution AS ENUM ('lump', 'uniform', 's_curve', 'custom');

CREATE TYPE interest_mode AS ENUM ('capitalized', 'paid');

CREATE TYPE credit_movement_kind AS ENUM ('drawdown', 'repayment');

CREATE TYPE unit_status AS ENUM ('available', 'reserved', 'sold', 'delivered');
";

const SCENARIO_PROJECTS_SQL: &str = r"
CREATE TABLE scenario_projects (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    description TEXT,
    currency VARCHAR(3) NOT NULL DEFAULT 'USD',
    start_date DATE NOT NULL,
    duration_months INTEGER NOT NULL,
    discount_rate NUMERIC(9, 6) NOT NULL DEFAULT 0.12,
    sales_start_month INTEGER NOT NULL DEFAULT 0,
    absorption_per_month INTEGER NOT NULL DEFAULT 1,
    default_delivery_month INTEGER NOT NULL DEFAULT 0,
    monthly_price_escalation NUMERIC(9, 6) NOT NULL DEFAULT 0,
    status scenario_status NOT NULL DEFAULT 'draft',
    revision BIGINT NOT NULL DEFAULT 1,
    approved_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_scenario_duration CHECK (duration_months > 0),
    CONSTRAINT chk_scenario_discount_rate CHECK (discount_rate >= 0 AND discount_rate <= 1),
    CONSTRAINT chk_scenario_sales_months CHECK (sales_start_month >= 0 AND default_delivery_month >= 0),
    CONSTRAINT chk_scenario_absorption CHECK (absorption_per_month >= 0),
    CONSTRAINT chk_scenario_escalation CHECK (monthly_price_escalation > -1),
    CONSTRAINT chk_scenario_approved_at CHECK (status <> 'approved' OR approved_at IS NOT NULL)
);

CREATE INDEX idx_scenario_projects_status ON scenario_projects(status, created_at DESC);
";

const COST_ITEMS_SQL: &str = r"
CREATE TABLE scenario_cost_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    scenario_id UUID NOT NULL REFERENCES scenario_projects(id) ON DELETE CASCADE,
    category cost_category NOT NULL,
    description VARCHAR(255) NOT NULL,
    amount NUMERIC(20, 2) NOT NULL,
    start_month INTEGER NOT NULL DEFAULT 0,
    duration_months INTEGER NOT NULL DEFAULT 1,
    distribution cost_distribution NOT NULL DEFAULT 'uniform',
    custom_percentages JSONB,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_cost_amount CHECK (amount >= 0),
    CONSTRAINT chk_cost_months CHECK (start_month >= 0 AND duration_months >= 0),
    CONSTRAINT chk_cost_custom CHECK (distribution <> 'custom' OR custom_percentages IS NOT NULL)
);

CREATE INDEX idx_cost_items_scenario ON scenario_cost_items(scenario_id, sort_order);
";

const CREDIT_LINES_SQL: &str = r"
CREATE TABLE scenario_credit_lines (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    scenario_id UUID NOT NULL REFERENCES scenario_projects(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    credit_limit NUMERIC(20, 2) NOT NULL,
    annual_rate NUMERIC(9, 6) NOT NULL,
    start_month INTEGER NOT NULL DEFAULT 0,
    term_months INTEGER NOT NULL,
    interest_mode interest_mode NOT NULL DEFAULT 'paid',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_credit_limit CHECK (credit_limit >= 0),
    CONSTRAINT chk_credit_rate CHECK (annual_rate >= 0 AND annual_rate <= 1),
    CONSTRAINT chk_credit_months CHECK (start_month >= 0 AND term_months > 0)
);

CREATE INDEX idx_credit_lines_scenario ON scenario_credit_lines(scenario_id);
";

const CREDIT_MOVEMENTS_SQL: &str = r"
CREATE TABLE scenario_credit_movements (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    credit_line_id UUID NOT NULL REFERENCES scenario_credit_lines(id) ON DELETE CASCADE,
    month INTEGER NOT NULL,
    kind credit_movement_kind NOT NULL,
    amount NUMERIC(20, 2) NOT NULL,
    note TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_movement_month CHECK (month >= 0),
    CONSTRAINT chk_movement_amount CHECK (amount > 0)
);

CREATE INDEX idx_credit_movements_line ON scenario_credit_movements(credit_line_id, month);
";

const UNITS_SQL: &str = r"
CREATE TABLE scenario_units (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    scenario_id UUID NOT NULL REFERENCES scenario_projects(id) ON DELETE CASCADE,
    code VARCHAR(50) NOT NULL,
    typology VARCHAR(100),
    area_m2 NUMERIC(12, 2) NOT NULL DEFAULT 0,
    list_price NUMERIC(20, 2) NOT NULL,
    discount_pct NUMERIC(5, 2) NOT NULL DEFAULT 0,
    status unit_status NOT NULL DEFAULT 'available',
    sale_month INTEGER,
    delivery_month INTEGER,
    down_payment_pct NUMERIC(5, 2) NOT NULL DEFAULT 0,
    down_payment_installments INTEGER NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_units_scenario_code UNIQUE (scenario_id, code),
    CONSTRAINT chk_unit_amounts CHECK (area_m2 >= 0 AND list_price >= 0),
    CONSTRAINT chk_unit_pcts CHECK (
        discount_pct BETWEEN 0 AND 100 AND down_payment_pct BETWEEN 0 AND 100
    ),
    CONSTRAINT chk_unit_months CHECK (
        (sale_month IS NULL OR sale_month >= 0)
        AND (delivery_month IS NULL OR delivery_month >= 0)
    ),
    CONSTRAINT chk_unit_installments CHECK (down_payment_installments >= 1)
);

CREATE INDEX idx_units_scenario ON scenario_units(scenario_id, sort_order);
";

const ACTUALS_SQL: &str = r"
CREATE TABLE scenario_actuals (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    scenario_id UUID NOT NULL REFERENCES scenario_projects(id) ON DELETE CASCADE,
    month INTEGER NOT NULL,
    line_key VARCHAR(50) NOT NULL,
    amount NUMERIC(20, 2) NOT NULL,
    note TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_actual_month CHECK (month >= 0),
    CONSTRAINT chk_actual_amount CHECK (amount >= 0)
);

CREATE INDEX idx_actuals_scenario_month ON scenario_actuals(scenario_id, month);
";

const BASELINES_SQL: &str = r"
CREATE TABLE scenario_baselines (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    scenario_id UUID NOT NULL REFERENCES scenario_projects(id) ON DELETE CASCADE,
    revision BIGINT NOT NULL,
    month INTEGER NOT NULL,
    label VARCHAR(7) NOT NULL,
    period_start DATE NOT NULL,
    inflows NUMERIC(20, 2) NOT NULL,
    outflows NUMERIC(20, 2) NOT NULL,
    project_net NUMERIC(20, 2) NOT NULL,
    financing_net NUMERIC(20, 2) NOT NULL,
    net NUMERIC(20, 2) NOT NULL,
    cumulative NUMERIC(20, 2) NOT NULL,
    project_cumulative NUMERIC(20, 2) NOT NULL,
    breakdown JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_baselines_scenario_month UNIQUE (scenario_id, month)
);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS scenario_baselines CASCADE;
DROP TABLE IF EXISTS scenario_actuals CASCADE;
DROP TABLE IF EXISTS scenario_units CASCADE;
DROP TABLE IF EXISTS scenario_credit_movements CASCADE;
DROP TABLE IF EXISTS scenario_credit_lines CASCADE;
DROP TABLE IF EXISTS scenario_cost_items CASCADE;
DROP TABLE IF EXISTS scenario_projects CASCADE;

DROP TYPE IF EXISTS unit_status;
DROP TYPE IF EXISTS credit_movement_kind;
DROP TYPE IF EXISTS interest_mode;
DROP TYPE IF EXISTS cost_distribution;
DROP TYPE IF EXISTS cost_category;
DROP TYPE IF EXISTS scenario_status;
";

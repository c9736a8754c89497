//! The cost-to-price waterfall.
//!
//! Costs flow one way: office overhead, variable costs and staffed hours
//! form the direct cost; complexity surcharges, profit and the negotiation
//! uplift are stacked on top; the discount is taken off and tax is added
//! last. Every intermediate value is returned so proposals can be itemized.
//!
//! All arithmetic is checked. An output whose computation overflows is
//! reported as zero, and so is every output derived from it.

use quote_core::{
    input, ComplexityFactorItem, CostItem, CostItemUnit, MemberId, PricingPolicy, ProjectStage,
    ProjectStageItem, TeamMember, TeamMemberConfigItem, WaterfallTotals,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::warn;

/// Share of the prorated office overhead charged to a single project.
///
/// Not divided by the number of concurrent projects.
pub const OFFICE_CONTRIBUTION_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// Hourly rates of team members, resolved at computation time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TeamRates {
    rates: BTreeMap<MemberId, Decimal>,
}

impl TeamRates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rates of every catalog entry, archived ones included.
    pub fn from_configs(items: &[TeamMemberConfigItem]) -> Self {
        items
            .iter()
            .map(|m| (m.id.clone(), m.hourly_rate))
            .collect()
    }

    /// Add users with a known rate that the catalog does not already cover.
    pub fn fill_from_members(&mut self, members: &[TeamMember]) {
        for m in members {
            if let Some(rate) = m.hourly_rate {
                self.rates.entry(m.id.clone()).or_insert(rate);
            }
        }
    }

    pub fn insert(&mut self, id: MemberId, rate: Decimal) {
        self.rates.insert(id, rate);
    }

    pub fn rate(&self, id: &MemberId) -> Option<Decimal> {
        self.rates.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl FromIterator<(MemberId, Decimal)> for TeamRates {
    fn from_iter<T: IntoIterator<Item = (MemberId, Decimal)>>(iter: T) -> Self {
        Self {
            rates: iter.into_iter().collect(),
        }
    }
}

/// Everything the waterfall reads.
#[derive(Clone, Copy, Debug)]
pub struct WaterfallInputs<'a> {
    pub duration_months: u32,
    pub office_fixed: &'a [CostItem],
    pub variable: &'a [CostItem],
    pub stages: &'a [ProjectStage],
    pub complexity: &'a [ComplexityFactorItem],
    pub policy: PricingPolicy,
    pub rates: &'a TeamRates,
}

fn mul(a: Decimal, b: Decimal) -> Option<Decimal> {
    a.checked_mul(b)
}

fn add(a: Decimal, b: Decimal) -> Option<Decimal> {
    a.checked_add(b)
}

/// `base * pct / 100`, or `None` on overflow.
///
/// ```
/// use quote_pricing::percent_of;
/// use rust_decimal::Decimal;
///
/// assert_eq!(percent_of(Decimal::new(1300, 0), Decimal::new(6, 0)), Some(Decimal::new(78, 0)));
/// assert_eq!(percent_of(Decimal::MAX, Decimal::new(200, 0)), None);
/// ```
pub fn percent_of(base: Decimal, pct: Decimal) -> Option<Decimal> {
    pct.checked_div(Decimal::ONE_HUNDRED)
        .and_then(|f| base.checked_mul(f))
}

fn sum<I: IntoIterator<Item = Option<Decimal>>>(terms: I) -> Option<Decimal> {
    terms
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, term| add(acc, term?))
}

fn checked_office_item_cost(item: &CostItem, months: u32) -> Option<Decimal> {
    match item.unit {
        CostItemUnit::Monthly => mul(item.base_value(), Decimal::from(months)),
        _ => Some(item.calculated_cost()),
    }
}

/// Cost of one office line over `months`. Monthly lines are always
/// prorated from the current duration, whatever quantity they carry.
pub fn office_item_cost(item: &CostItem, months: u32) -> Decimal {
    checked_office_item_cost(item, months).unwrap_or(Decimal::ZERO)
}

/// Copy of `items` with every monthly line re-prorated to `months`.
pub fn prorate_office_items(items: &[CostItem], months: u32) -> Vec<CostItem> {
    items
        .iter()
        .cloned()
        .map(|mut item| {
            if item.unit == CostItemUnit::Monthly {
                item.set_quantity(Decimal::from(months));
            }
            item
        })
        .collect()
}

fn checked_stage_item_cost(item: &ProjectStageItem, rates: &TeamRates) -> Option<Decimal> {
    let Some(member) = &item.responsible_id else {
        return Some(Decimal::ZERO);
    };
    let rate = match rates.rate(member) {
        Some(rate) => rate,
        None => {
            warn!(item = %item.id, member = %member.0, "responsible member not found; charging rate 0");
            Decimal::ZERO
        }
    };
    mul(input::non_negative(item.hours_or_zero()), rate)
}

fn checked_stage_cost(stage: &ProjectStage, rates: &TeamRates) -> Option<Decimal> {
    sum(stage
        .items
        .iter()
        .map(|item| checked_stage_item_cost(item, rates)))
}

fn checked_team_cost(stages: &[ProjectStage], rates: &TeamRates) -> Option<Decimal> {
    sum(stages.iter().map(|stage| checked_stage_cost(stage, rates)))
}

/// Cost of one stage item: hours times the responsible member's rate.
/// An unknown member is charged at zero.
pub fn stage_item_cost(item: &ProjectStageItem, rates: &TeamRates) -> Decimal {
    checked_stage_item_cost(item, rates).unwrap_or(Decimal::ZERO)
}

/// Sum of the item costs of one stage; zero if it overflows.
pub fn stage_cost(stage: &ProjectStage, rates: &TeamRates) -> Decimal {
    checked_stage_cost(stage, rates).unwrap_or(Decimal::ZERO)
}

/// Sum of all stage costs; zero if it overflows.
pub fn team_cost(stages: &[ProjectStage], rates: &TeamRates) -> Decimal {
    checked_team_cost(stages, rates).unwrap_or(Decimal::ZERO)
}

/// Compute the full waterfall. Pure; cheap enough to run on every edit.
///
/// ```
/// use quote_core::{CostItem, PricingPolicy};
/// use quote_pricing::{compute_waterfall, TeamRates, WaterfallInputs};
/// use rust_decimal::Decimal;
///
/// // 1040 of direct cost at 25% profit and 6% tax
/// let variable = vec![CostItem::variable("v", "Direct", Decimal::new(1040, 0), Decimal::ONE)];
/// let totals = compute_waterfall(&WaterfallInputs {
///     duration_months: 1,
///     office_fixed: &[],
///     variable: &variable,
///     stages: &[],
///     complexity: &[],
///     policy: PricingPolicy::default(),
///     rates: &TeamRates::new(),
/// });
/// assert_eq!(totals.cost_plus_profit, Decimal::new(1300, 0));
/// assert_eq!(totals.final_proposed_value, Decimal::new(1378, 0));
/// ```
pub fn compute_waterfall(inputs: &WaterfallInputs<'_>) -> WaterfallTotals {
    let policy = inputs.policy.sanitized();

    let office_subtotal = sum(inputs
        .office_fixed
        .iter()
        .filter(|item| item.is_applied)
        .map(|item| checked_office_item_cost(item, inputs.duration_months)));
    let office_contribution = office_subtotal.and_then(|s| mul(s, OFFICE_CONTRIBUTION_RATE));

    let variable_subtotal = sum(inputs
        .variable
        .iter()
        .map(|item| mul(item.base_value(), item.quantity())));

    let team_subtotal = checked_team_cost(inputs.stages, inputs.rates);

    let direct = office_contribution
        .zip(variable_subtotal)
        .and_then(|(c, v)| add(c, v))
        .zip(team_subtotal)
        .and_then(|(cv, t)| add(cv, t));

    // every factor applies to the same direct base
    let complexity = direct.and_then(|direct| {
        sum(inputs
            .complexity
            .iter()
            .filter(|f| f.is_applied)
            .map(|f| percent_of(direct, input::non_negative(f.percentage))))
    });
    let cost_with_complexity = direct.zip(complexity).and_then(|(d, c)| add(d, c));

    let profit = cost_with_complexity.and_then(|c| percent_of(c, policy.profit_margin_percentage));
    let cost_plus_profit = cost_with_complexity.zip(profit).and_then(|(c, p)| add(c, p));

    let negotiation =
        cost_plus_profit.and_then(|c| percent_of(c, policy.negotiation_margin_percentage));
    let cost_plus_negotiation = cost_plus_profit
        .zip(negotiation)
        .and_then(|(c, n)| add(c, n));

    let discount = cost_plus_negotiation.and_then(|c| percent_of(c, policy.discount_percentage));
    let before_tax = cost_plus_negotiation
        .zip(discount)
        .and_then(|(c, d)| c.checked_sub(d));

    let tax = before_tax.and_then(|b| percent_of(b, policy.tax_percentage));
    let final_value = before_tax.zip(tax).and_then(|(b, t)| add(b, t));

    let or_zero = |v: Option<Decimal>| v.unwrap_or(Decimal::ZERO);
    WaterfallTotals {
        subtotal_office_fixed_costs_pro_rata: or_zero(office_subtotal),
        office_fixed_costs_contribution: or_zero(office_contribution),
        subtotal_project_variable_costs: or_zero(variable_subtotal),
        subtotal_team_costs: or_zero(team_subtotal),
        subtotal_direct_costs: or_zero(direct),
        total_complexity_value: or_zero(complexity),
        cost_with_complexity: or_zero(cost_with_complexity),
        profit_value: or_zero(profit),
        cost_plus_profit: or_zero(cost_plus_profit),
        negotiation_value: or_zero(negotiation),
        cost_plus_profit_and_negotiation: or_zero(cost_plus_negotiation),
        discount_value: or_zero(discount),
        final_value_before_tax: or_zero(before_tax),
        tax_value: or_zero(tax),
        final_proposed_value: or_zero(final_value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use quote_core::{ArchiveStatus, OfficeCostConfigItem};

    fn d(v: i64) -> Decimal {
        Decimal::new(v, 0)
    }

    fn rent(base: i64, months: u32) -> CostItem {
        let cfg = OfficeCostConfigItem {
            id: "config-fixed-rent".to_string(),
            name: "Office rent".to_string(),
            monthly_base_value: d(base),
            status: ArchiveStatus::Active,
        };
        CostItem::office_fixed("fixed-rent", &cfg, months)
    }

    fn staffed_stage(hours: Decimal, member: &str) -> ProjectStage {
        ProjectStage {
            id: "stage-1".to_string(),
            name: "Stage 1".to_string(),
            is_collapsed: false,
            items: vec![ProjectStageItem {
                id: "item-1".to_string(),
                name: "Survey".to_string(),
                responsible_id: Some(MemberId::new(member)),
                hours: Some(hours),
            }],
        }
    }

    fn principal_rates() -> TeamRates {
        [(MemberId::new("user-principal"), d(150))].into_iter().collect()
    }

    fn policy(profit: i64, negotiation: i64, discount: i64, tax: i64) -> PricingPolicy {
        PricingPolicy {
            profit_margin_percentage: d(profit),
            negotiation_margin_percentage: d(negotiation),
            discount_percentage: d(discount),
            tax_percentage: d(tax),
        }
    }

    #[test]
    fn end_to_end_example() {
        let office = vec![rent(1600, 1)];
        let variable = vec![CostItem::variable("var-1", "Plotting", d(500), d(1))];
        let stages = vec![staffed_stage(d(2), "user-principal")];
        let rates = principal_rates();
        let totals = compute_waterfall(&WaterfallInputs {
            duration_months: 1,
            office_fixed: &office,
            variable: &variable,
            stages: &stages,
            complexity: &[],
            policy: policy(25, 0, 0, 6),
            rates: &rates,
        });
        assert_eq!(totals.subtotal_office_fixed_costs_pro_rata, d(1600));
        assert_eq!(totals.office_fixed_costs_contribution, d(240));
        assert_eq!(totals.subtotal_project_variable_costs, d(500));
        assert_eq!(totals.subtotal_team_costs, d(300));
        assert_eq!(totals.subtotal_direct_costs, d(1040));
        assert_eq!(totals.total_complexity_value, Decimal::ZERO);
        assert_eq!(totals.cost_with_complexity, d(1040));
        assert_eq!(totals.profit_value, d(260));
        assert_eq!(totals.cost_plus_profit, d(1300));
        assert_eq!(totals.negotiation_value, Decimal::ZERO);
        assert_eq!(totals.cost_plus_profit_and_negotiation, d(1300));
        assert_eq!(totals.discount_value, Decimal::ZERO);
        assert_eq!(totals.final_value_before_tax, d(1300));
        assert_eq!(totals.tax_value, d(78));
        assert_eq!(totals.final_proposed_value, d(1378));
    }

    #[test]
    fn office_items_prorate_from_duration_not_stored_quantity() {
        // stored with one month, computed over three
        let office = vec![rent(1000, 1)];
        let rates = TeamRates::new();
        let totals = compute_waterfall(&WaterfallInputs {
            duration_months: 3,
            office_fixed: &office,
            variable: &[],
            stages: &[],
            complexity: &[],
            policy: policy(0, 0, 0, 0),
            rates: &rates,
        });
        assert_eq!(totals.subtotal_office_fixed_costs_pro_rata, d(3000));
        assert_eq!(totals.office_fixed_costs_contribution, d(450));

        let prorated = prorate_office_items(&office, 3);
        assert_eq!(prorated[0].quantity(), d(3));
        assert_eq!(prorated[0].calculated_cost(), d(3000));
    }

    #[test]
    fn unapplied_office_item_only_drops_its_own_share() {
        let mut second = rent(400, 1);
        second.id = "fixed-condo".to_string();
        let mut office = vec![rent(1600, 1), second];
        let variable = vec![CostItem::variable("var-1", "Plotting", d(500), d(1))];
        let rates = TeamRates::new();
        let run = |office: &[CostItem]| {
            compute_waterfall(&WaterfallInputs {
                duration_months: 1,
                office_fixed: office,
                variable: &variable,
                stages: &[],
                complexity: &[],
                policy: policy(0, 0, 0, 0),
                rates: &rates,
            })
        };
        let before = run(&office);
        office[1].is_applied = false;
        let after = run(&office);
        assert_eq!(
            before.subtotal_office_fixed_costs_pro_rata - after.subtotal_office_fixed_costs_pro_rata,
            d(400)
        );
        assert_eq!(
            before.office_fixed_costs_contribution - after.office_fixed_costs_contribution,
            d(60)
        );
        assert_eq!(
            before.subtotal_project_variable_costs,
            after.subtotal_project_variable_costs
        );
        assert_eq!(before.subtotal_team_costs, after.subtotal_team_costs);
    }

    #[test]
    fn unknown_responsible_costs_nothing() {
        let stages = vec![staffed_stage(d(10), "user-gone")];
        let rates = principal_rates();
        assert_eq!(team_cost(&stages, &rates), Decimal::ZERO);
    }

    #[test]
    fn missing_hours_count_as_zero() {
        let mut stage = staffed_stage(d(1), "user-principal");
        stage.items[0].hours = None;
        assert_eq!(stage_cost(&stage, &principal_rates()), Decimal::ZERO);
    }

    #[test]
    fn negotiation_is_an_uplift() {
        let variable = vec![CostItem::variable("var-1", "Model", d(1000), d(1))];
        let rates = TeamRates::new();
        let totals = compute_waterfall(&WaterfallInputs {
            duration_months: 1,
            office_fixed: &[],
            variable: &variable,
            stages: &[],
            complexity: &[],
            policy: policy(0, 10, 0, 0),
            rates: &rates,
        });
        assert_eq!(totals.negotiation_value, d(100));
        assert_eq!(totals.final_proposed_value, d(1100));
    }

    #[test]
    fn margin_above_one_hundred_percent_doubles_and_more() {
        let variable = vec![CostItem::variable("var-1", "Model", d(1000), d(1))];
        let rates = TeamRates::new();
        let totals = compute_waterfall(&WaterfallInputs {
            duration_months: 1,
            office_fixed: &[],
            variable: &variable,
            stages: &[],
            complexity: &[],
            policy: policy(100, 0, 0, 0),
            rates: &rates,
        });
        assert_eq!(totals.cost_plus_profit, d(2000));
    }

    #[test]
    fn negative_percentages_are_treated_as_zero() {
        let variable = vec![CostItem::variable("var-1", "Model", d(1000), d(1))];
        let rates = TeamRates::new();
        let totals = compute_waterfall(&WaterfallInputs {
            duration_months: 1,
            office_fixed: &[],
            variable: &variable,
            stages: &[],
            complexity: &[],
            policy: policy(-25, -5, -10, -6),
            rates: &rates,
        });
        assert_eq!(totals.final_proposed_value, d(1000));
    }

    #[test]
    fn discount_then_tax() {
        let variable = vec![CostItem::variable("var-1", "Model", d(1000), d(1))];
        let rates = TeamRates::new();
        let totals = compute_waterfall(&WaterfallInputs {
            duration_months: 1,
            office_fixed: &[],
            variable: &variable,
            stages: &[],
            complexity: &[],
            policy: policy(0, 0, 10, 10),
            rates: &rates,
        });
        assert_eq!(totals.discount_value, d(100));
        assert_eq!(totals.final_value_before_tax, d(900));
        assert_eq!(totals.tax_value, d(90));
        assert_eq!(totals.final_proposed_value, d(990));
    }

    #[test]
    fn catalog_rates_win_over_user_rates() {
        let configs = vec![TeamMemberConfigItem {
            id: MemberId::new("user-principal"),
            name: "Principal".to_string(),
            role: "Architect".to_string(),
            hourly_rate: d(150),
            status: ArchiveStatus::Archived,
        }];
        let mut rates = TeamRates::from_configs(&configs);
        rates.fill_from_members(&[
            TeamMember {
                id: MemberId::new("user-principal"),
                name: "Principal".to_string(),
                email: "p@example.com".to_string(),
                role: None,
                hourly_rate: Some(d(1)),
                status: ArchiveStatus::Active,
            },
            TeamMember {
                id: MemberId::new("user-new"),
                name: "New".to_string(),
                email: "n@example.com".to_string(),
                role: None,
                hourly_rate: Some(d(40)),
                status: ArchiveStatus::Active,
            },
        ]);
        assert_eq!(rates.rate(&MemberId::new("user-principal")), Some(d(150)));
        assert_eq!(rates.rate(&MemberId::new("user-new")), Some(d(40)));
        assert_eq!(rates.len(), 2);
    }

    #[test]
    fn overflowing_subtotal_zeroes_itself_and_what_follows() {
        let huge = Decimal::MAX / Decimal::new(15, 1);
        let office = vec![rent(1600, 1)];
        let variable = vec![
            CostItem::variable("var-1", "A", huge, Decimal::ONE),
            CostItem::variable("var-2", "B", huge, Decimal::ONE),
            CostItem::variable("var-3", "C", d(5), Decimal::ONE),
        ];
        let rates = TeamRates::new();
        let totals = compute_waterfall(&WaterfallInputs {
            duration_months: 1,
            office_fixed: &office,
            variable: &variable,
            stages: &[],
            complexity: &[],
            policy: policy(25, 0, 0, 6),
            rates: &rates,
        });
        assert_eq!(totals.subtotal_office_fixed_costs_pro_rata, d(1600));
        assert_eq!(totals.office_fixed_costs_contribution, d(240));
        assert_eq!(totals.subtotal_project_variable_costs, Decimal::ZERO);
        assert_eq!(totals.subtotal_direct_costs, Decimal::ZERO);
        assert_eq!(totals.final_proposed_value, Decimal::ZERO);
    }

    #[test]
    fn overflow_late_in_the_chain_keeps_earlier_steps() {
        let huge = Decimal::MAX / Decimal::new(15, 1);
        let variable = vec![CostItem::variable("var-1", "A", huge, Decimal::ONE)];
        let rates = TeamRates::new();
        let totals = compute_waterfall(&WaterfallInputs {
            duration_months: 1,
            office_fixed: &[],
            variable: &variable,
            stages: &[],
            complexity: &[],
            policy: policy(100, 0, 0, 0),
            rates: &rates,
        });
        assert_eq!(totals.cost_with_complexity, huge);
        assert_eq!(totals.profit_value, huge);
        assert_eq!(totals.cost_plus_profit, Decimal::ZERO);
        assert_eq!(totals.cost_plus_profit_and_negotiation, Decimal::ZERO);
        assert_eq!(totals.final_value_before_tax, Decimal::ZERO);
        assert_eq!(totals.final_proposed_value, Decimal::ZERO);
    }

    #[test]
    fn overflowing_stage_costs_nothing() {
        let mut stage = staffed_stage(Decimal::MAX, "user-principal");
        stage.items.push(stage.items[0].clone());
        assert_eq!(stage_cost(&stage, &principal_rates()), Decimal::ZERO);
        assert_eq!(percent_of(d(1000), d(10)), Some(d(100)));
    }

    fn factor(id: &str, pct: Decimal, applied: bool) -> ComplexityFactorItem {
        ComplexityFactorItem {
            id: id.to_string(),
            name: id.to_string(),
            percentage: pct,
            is_applied: applied,
        }
    }

    proptest! {
        #[test]
        fn complexity_is_linear_and_non_compounding(
            base in 1i64..1_000_000,
            pcts in proptest::collection::vec((0i64..10_000, any::<bool>()), 0..8),
        ) {
            let variable = vec![CostItem::variable("v", "V", Decimal::new(base, 2), Decimal::ONE)];
            let factors: Vec<_> = pcts
                .iter()
                .enumerate()
                .map(|(i, (p, on))| factor(&format!("f{i}"), Decimal::new(*p, 2), *on))
                .collect();
            let rates = TeamRates::new();
            let totals = compute_waterfall(&WaterfallInputs {
                duration_months: 1,
                office_fixed: &[],
                variable: &variable,
                stages: &[],
                complexity: &factors,
                policy: policy(0, 0, 0, 0),
                rates: &rates,
            });
            let expected = factors
                .iter()
                .filter(|f| f.is_applied)
                .fold(Decimal::ZERO, |acc, f| {
                    acc + totals.subtotal_direct_costs * (f.percentage / Decimal::ONE_HUNDRED)
                });
            prop_assert_eq!(totals.total_complexity_value, expected);
        }

        #[test]
        fn final_value_is_monotonic_in_policy(
            base in 1i64..10_000_000,
            profit in 0i64..300,
            negotiation in 0i64..100,
            discount in 0i64..100,
            tax in 0i64..50,
            bump in 1i64..50,
        ) {
            let variable = vec![CostItem::variable("v", "V", Decimal::new(base, 2), Decimal::ONE)];
            let rates = TeamRates::new();
            let run = |p: PricingPolicy| {
                compute_waterfall(&WaterfallInputs {
                    duration_months: 1,
                    office_fixed: &[],
                    variable: &variable,
                    stages: &[],
                    complexity: &[],
                    policy: p,
                    rates: &rates,
                })
                .final_proposed_value
            };
            let base_policy = policy(profit, negotiation, discount, tax);
            let reference = run(base_policy);
            prop_assert!(run(policy(profit + bump, negotiation, discount, tax)) >= reference);
            prop_assert!(run(policy(profit, negotiation + bump, discount, tax)) >= reference);
            prop_assert!(run(policy(profit, negotiation, discount, tax + bump)) >= reference);
            prop_assert!(run(policy(profit, negotiation, (discount + bump).min(100), tax)) <= reference);
        }
    }
}

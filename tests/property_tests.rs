//! Property-based tests for the pure costing math, verifying invariants
//! across a wide range of inputs.

use backhouse_api::entities::menu::PricingMode;
use backhouse_api::services::menu_costing::{
    cost_range, dish_cost, effective_price, margin_pct, MenuDishCosting, SectionCosting,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

// Strategies for generating test data

/// Money-like decimals with two fractional digits, in cents.
fn money_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Quantities with four fractional digits, strictly positive.
fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000).prop_map(|n| Decimal::new(n, 4))
}

fn line_strategy() -> impl Strategy<Value = (Decimal, Option<Decimal>)> {
    (quantity_strategy(), proptest::option::of(money_strategy()))
}

fn section_strategy(required: bool) -> impl Strategy<Value = SectionCosting> {
    proptest::collection::vec(proptest::option::of(money_strategy()), 0..6).prop_map(
        move |costs| SectionCosting {
            section_id: Uuid::nil(),
            name: String::new(),
            is_required: required,
            dishes: costs
                .into_iter()
                .map(|cost| MenuDishCosting {
                    dish_id: Uuid::nil(),
                    name: String::new(),
                    cost,
                    effective_price: None,
                })
                .collect(),
        },
    )
}

fn sections_strategy() -> impl Strategy<Value = Vec<SectionCosting>> {
    proptest::collection::vec(any::<bool>().prop_flat_map(section_strategy), 0..5)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Cost is None exactly when no line carries a price.
    #[test]
    fn dish_cost_none_iff_nothing_priced(lines in proptest::collection::vec(line_strategy(), 0..10)) {
        let result = dish_cost(&lines);
        let any_priced = lines.iter().any(|(_, p)| p.is_some());
        prop_assert_eq!(result.is_some(), any_priced);
    }

    /// Cost equals the sum over priced lines, missing prices contributing
    /// zero, and never goes negative for non-negative inputs.
    #[test]
    fn dish_cost_matches_priced_sum(lines in proptest::collection::vec(line_strategy(), 1..10)) {
        if let Some(cost) = dish_cost(&lines) {
            let expected: Decimal = lines
                .iter()
                .filter_map(|(q, p)| p.map(|p| *q * p))
                .sum();
            prop_assert_eq!(cost, expected);
            prop_assert!(cost >= Decimal::ZERO);
        }
    }

    /// Splitting a recipe in two and costing the halves separately sums
    /// to the whole, as long as each half has a priced line.
    #[test]
    fn dish_cost_is_additive(
        left in proptest::collection::vec((quantity_strategy(), money_strategy().prop_map(Some)), 1..5),
        right in proptest::collection::vec((quantity_strategy(), money_strategy().prop_map(Some)), 1..5),
    ) {
        let mut whole = left.clone();
        whole.extend(right.iter().cloned());

        let sum = dish_cost(&left).unwrap() + dish_cost(&right).unwrap();
        prop_assert_eq!(dish_cost(&whole), Some(sum));
    }

    /// Margin is defined only for positive cost and price, and never
    /// reads above 100% (rounding may touch it from below).
    #[test]
    fn margin_is_bounded(cost in money_strategy(), price in money_strategy()) {
        match margin_pct(cost, Some(price)) {
            Some(margin) => {
                prop_assert!(cost > Decimal::ZERO && price > Decimal::ZERO);
                prop_assert!(margin <= Decimal::ONE_HUNDRED);
            }
            None => prop_assert!(cost <= Decimal::ZERO || price <= Decimal::ZERO),
        }
    }

    /// The override always wins; the fallback only fills a gap.
    #[test]
    fn effective_price_prefers_override(
        override_price in proptest::option::of(money_strategy()),
        selling_price in proptest::option::of(money_strategy()),
    ) {
        let result = effective_price(override_price, selling_price);
        match override_price {
            Some(p) => prop_assert_eq!(result, Some(p)),
            None => prop_assert_eq!(result, selling_price),
        }
    }

    /// For every pricing mode with non-negative costs, min ≤ max, and a
    /// fixed-price menu's range is degenerate.
    #[test]
    fn cost_range_min_never_exceeds_max(sections in sections_strategy()) {
        for mode in [PricingMode::FixedPrice, PricingMode::Choice, PricingMode::ALaCarte] {
            let range = cost_range(mode, &sections);
            prop_assert!(range.min_cost <= range.max_cost);
            prop_assert!(range.average_cost >= Decimal::ZERO);
        }

        let fixed = cost_range(PricingMode::FixedPrice, &sections);
        prop_assert_eq!(fixed.min_cost, fixed.max_cost);
    }

    /// Choice-mode maximum dominates the required-only maximum: optional
    /// sections only ever widen the upper bound.
    #[test]
    fn optional_sections_only_widen_the_upper_bound(sections in sections_strategy()) {
        let full = cost_range(PricingMode::Choice, &sections);

        let required_only: Vec<SectionCosting> = sections
            .iter()
            .filter(|s| s.is_required)
            .cloned()
            .collect();
        let narrowed = cost_range(PricingMode::Choice, &required_only);

        prop_assert!(full.max_cost >= narrowed.max_cost);
        prop_assert_eq!(full.min_cost, narrowed.min_cost);
    }

    /// Same input, same output: the range computation is pure.
    #[test]
    fn cost_range_is_deterministic(sections in sections_strategy()) {
        let first = cost_range(PricingMode::Choice, &sections);
        let second = cost_range(PricingMode::Choice, &sections);
        prop_assert_eq!(first, second);
    }
}

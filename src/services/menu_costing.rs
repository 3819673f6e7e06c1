use crate::{
    db::DbPool,
    entities::{
        dish::{self, Entity as Dish},
        item::{self, Entity as Item},
        menu::{Entity as Menu, PricingMode},
        menu_dish::{self, Entity as MenuDish},
        menu_section::{self, Entity as MenuSection},
        recipe_line::{self, Entity as RecipeLine},
    },
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Cost contribution of one recipe line.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngredientCost {
    pub item_id: Uuid,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Option<Decimal>,
    /// `quantity × unit_price`; absent when the item has no price.
    pub line_cost: Option<Decimal>,
}

/// Cost and margin figures for one dish.
///
/// `cost` is `None` when it cannot be computed (no recipe lines, or no
/// ingredient carries a price), which is distinct from a provably zero
/// cost.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DishCosting {
    pub dish_id: Uuid,
    pub name: String,
    pub selling_price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub margin_pct: Option<Decimal>,
    pub ingredients: Vec<IngredientCost>,
}

/// One dish as it appears inside a costed menu.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MenuDishCosting {
    pub dish_id: Uuid,
    pub name: String,
    pub cost: Option<Decimal>,
    /// Price override if set, else the dish's own selling price.
    pub effective_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SectionCosting {
    pub section_id: Uuid,
    pub name: String,
    pub is_required: bool,
    pub dishes: Vec<MenuDishCosting>,
}

/// Full costing picture of one menu.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MenuCosting {
    pub menu_id: Uuid,
    pub name: String,
    pub pricing_mode: String,
    pub fixed_price: Option<Decimal>,
    pub min_cost: Decimal,
    pub max_cost: Decimal,
    pub average_cost: Decimal,
    pub dish_count: usize,
    /// Margin at the costliest selection; `None` without a positive price
    /// and cost.
    pub worst_margin_pct: Option<Decimal>,
    /// Margin at the cheapest selection.
    pub best_margin_pct: Option<Decimal>,
    /// Human-readable price; `None` means "price not set".
    pub display_price: Option<String>,
    pub sections: Vec<SectionCosting>,
}

/// Read-only engine deriving cost, price and margin figures from the
/// recipe graph and menu structure. Assembles its read model explicitly
/// (entities fetched by foreign key, joined in application code) and
/// performs no validation: it trusts entity-validated inputs and
/// propagates nonsensical values arithmetically.
#[derive(Clone)]
pub struct MenuCostingService {
    db: Arc<DbPool>,
}

impl MenuCostingService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Cost and margin for one dish from its recipe lines and the
    /// ingredients' current unit prices.
    #[instrument(skip(self))]
    pub async fn dish_costing(&self, dish_id: Uuid) -> Result<DishCosting, ServiceError> {
        let db = self.db.as_ref();

        let found = Dish::find_by_id(dish_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Dish {} not found", dish_id)))?;

        let lines = RecipeLine::find()
            .filter(recipe_line::Column::DishId.eq(dish_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let items = self
            .items_by_id(lines.iter().map(|l| l.item_id).collect())
            .await?;

        Ok(assemble_dish_costing(&found, &lines, &items))
    }

    /// Cost range, margin band and display price for one menu.
    #[instrument(skip(self))]
    pub async fn menu_costing(&self, menu_id: Uuid) -> Result<MenuCosting, ServiceError> {
        let db = self.db.as_ref();

        let found = Menu::find_by_id(menu_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Menu {} not found", menu_id)))?;

        let sections = MenuSection::find()
            .filter(menu_section::Column::MenuId.eq(menu_id))
            .order_by_asc(menu_section::Column::Position)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let section_ids: Vec<Uuid> = sections.iter().map(|s| s.id).collect();
        let entries = if section_ids.is_empty() {
            Vec::new()
        } else {
            MenuDish::find()
                .filter(menu_dish::Column::SectionId.is_in(section_ids))
                .order_by_asc(menu_dish::Column::Position)
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
        };

        let dish_ids: Vec<Uuid> = entries.iter().map(|e| e.dish_id).collect();
        let dishes: HashMap<Uuid, dish::Model> = if dish_ids.is_empty() {
            HashMap::new()
        } else {
            Dish::find()
                .filter(dish::Column::Id.is_in(dish_ids.clone()))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|d| (d.id, d))
                .collect()
        };

        let recipe_lines = if dish_ids.is_empty() {
            Vec::new()
        } else {
            RecipeLine::find()
                .filter(recipe_line::Column::DishId.is_in(dish_ids))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
        };

        let items = self
            .items_by_id(recipe_lines.iter().map(|l| l.item_id).collect())
            .await?;

        let mut lines_by_dish: HashMap<Uuid, Vec<&recipe_line::Model>> = HashMap::new();
        for line in &recipe_lines {
            lines_by_dish.entry(line.dish_id).or_default().push(line);
        }

        // Per-dish cost, computed once per dish even when a dish appears
        // in several sections.
        let costs_by_dish: HashMap<Uuid, Option<Decimal>> = dishes
            .values()
            .map(|d| {
                let lines: Vec<(Decimal, Option<Decimal>)> = lines_by_dish
                    .get(&d.id)
                    .map(|lines| {
                        lines
                            .iter()
                            .map(|l| (l.quantity, items.get(&l.item_id).and_then(|i| i.unit_price)))
                            .collect()
                    })
                    .unwrap_or_default();
                (d.id, dish_cost(&lines))
            })
            .collect();

        let section_costings: Vec<SectionCosting> = sections
            .iter()
            .map(|section| {
                let section_dishes: Vec<MenuDishCosting> = entries
                    .iter()
                    .filter(|e| e.section_id == section.id)
                    .filter_map(|e| {
                        dishes.get(&e.dish_id).map(|d| MenuDishCosting {
                            dish_id: d.id,
                            name: d.name.clone(),
                            cost: costs_by_dish.get(&d.id).copied().flatten(),
                            effective_price: effective_price(e.price_override, d.selling_price),
                        })
                    })
                    .collect();

                SectionCosting {
                    section_id: section.id,
                    name: section.name.clone(),
                    is_required: section.is_required,
                    dishes: section_dishes,
                }
            })
            .collect();

        let mode = found.mode().unwrap_or(PricingMode::ALaCarte);
        let range = cost_range(mode, &section_costings);
        let worst_margin_pct = margin_pct(range.max_cost, found.fixed_price);
        let best_margin_pct = margin_pct(range.min_cost, found.fixed_price);
        let display =
            display_price(found.fixed_price, found.min_courses, found.max_courses);

        Ok(MenuCosting {
            menu_id: found.id,
            name: found.name,
            pricing_mode: found.pricing_mode,
            fixed_price: found.fixed_price,
            min_cost: range.min_cost,
            max_cost: range.max_cost,
            average_cost: range.average_cost,
            dish_count: range.dish_count,
            worst_margin_pct,
            best_margin_pct,
            display_price: display,
            sections: section_costings,
        })
    }

    async fn items_by_id(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, item::Model>, ServiceError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let db = self.db.as_ref();
        Ok(Item::find()
            .filter(item::Column::Id.is_in(ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|i| (i.id, i))
            .collect())
    }
}

fn assemble_dish_costing(
    dish: &dish::Model,
    lines: &[recipe_line::Model],
    items: &HashMap<Uuid, item::Model>,
) -> DishCosting {
    let ingredients: Vec<IngredientCost> = lines
        .iter()
        .map(|line| {
            let linked = items.get(&line.item_id);
            let unit_price = linked.and_then(|i| i.unit_price);
            IngredientCost {
                item_id: line.item_id,
                item_name: linked.map(|i| i.name.clone()).unwrap_or_default(),
                quantity: line.quantity,
                unit: line.unit.clone(),
                unit_price,
                line_cost: unit_price.map(|p| line.quantity * p),
            }
        })
        .collect();

    let priced: Vec<(Decimal, Option<Decimal>)> = ingredients
        .iter()
        .map(|i| (i.quantity, i.unit_price))
        .collect();
    let cost = dish_cost(&priced);

    DishCosting {
        dish_id: dish.id,
        name: dish.name.clone(),
        selling_price: dish.selling_price,
        cost,
        margin_pct: cost.and_then(|c| margin_pct(c, dish.selling_price)),
        ingredients,
    }
}

/// Dish cost over `(quantity, unit_price)` recipe lines: the priced lines
/// sum, missing prices contributing zero. `None` when nothing is priced,
/// since an unpriced recipe has an *unknown* cost, not a free one.
pub fn dish_cost(lines: &[(Decimal, Option<Decimal>)]) -> Option<Decimal> {
    let mut any_priced = false;
    let mut total = Decimal::ZERO;
    for (quantity, unit_price) in lines {
        if let Some(price) = unit_price {
            any_priced = true;
            total += *quantity * *price;
        }
    }
    any_priced.then_some(total)
}

/// `(price − cost) / price × 100`, defined only for positive cost and
/// positive price; rounded to two decimals.
pub fn margin_pct(cost: Decimal, price: Option<Decimal>) -> Option<Decimal> {
    let price = price?;
    if price <= Decimal::ZERO || cost <= Decimal::ZERO {
        return None;
    }
    Some(((price - cost) / price * Decimal::ONE_HUNDRED).round_dp(2))
}

/// Price of a dish within a menu: the entry override wins over the dish's
/// own selling price.
pub fn effective_price(
    price_override: Option<Decimal>,
    selling_price: Option<Decimal>,
) -> Option<Decimal> {
    price_override.or(selling_price)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostRange {
    pub min_cost: Decimal,
    pub max_cost: Decimal,
    pub average_cost: Decimal,
    pub dish_count: usize,
}

/// Menu cost range by pricing mode. Dishes with unknown cost count as
/// zero here; the per-dish output keeps the distinction.
///
/// Choice mode deliberately uses a conservative upper bound: the dearest
/// dish of every required *and* optional section, not an enumeration of
/// course combinations bounded by min/max courses.
pub fn cost_range(mode: PricingMode, sections: &[SectionCosting]) -> CostRange {
    let all_costs: Vec<Decimal> = sections
        .iter()
        .flat_map(|s| s.dishes.iter())
        .map(|d| d.cost.unwrap_or(Decimal::ZERO))
        .collect();
    let dish_count = all_costs.len();
    let total: Decimal = all_costs.iter().copied().sum();
    let average_cost = if dish_count == 0 {
        Decimal::ZERO
    } else {
        (total / Decimal::from(dish_count as u64)).round_dp(2)
    };

    match mode {
        PricingMode::FixedPrice => CostRange {
            // The diner gets the whole menu: every dish counted once, no
            // choice exists, so min and max collapse to the total.
            min_cost: total,
            max_cost: total,
            average_cost,
            dish_count,
        },
        PricingMode::Choice => {
            let mut min_cost = Decimal::ZERO;
            let mut max_cost = Decimal::ZERO;
            for section in sections {
                let costs = section
                    .dishes
                    .iter()
                    .map(|d| d.cost.unwrap_or(Decimal::ZERO));
                let cheapest = costs.clone().min();
                let dearest = costs.max();
                if section.is_required {
                    // Empty sections contribute zero to both bounds.
                    min_cost += cheapest.unwrap_or(Decimal::ZERO);
                    max_cost += dearest.unwrap_or(Decimal::ZERO);
                } else {
                    max_cost += dearest.unwrap_or(Decimal::ZERO);
                }
            }
            CostRange {
                min_cost,
                max_cost,
                average_cost,
                dish_count,
            }
        }
        PricingMode::ALaCarte => {
            let min_cost = all_costs.iter().copied().min().unwrap_or(Decimal::ZERO);
            let max_cost = all_costs.iter().copied().max().unwrap_or(Decimal::ZERO);
            CostRange {
                min_cost,
                max_cost,
                average_cost,
                dish_count,
            }
        }
    }
}

/// Formats the menu's price for display. `None` means "price not set".
/// The course-count range is appended only when min and max differ.
pub fn display_price(
    fixed_price: Option<Decimal>,
    min_courses: Option<i32>,
    max_courses: Option<i32>,
) -> Option<String> {
    let price = fixed_price?;
    let formatted = format!("{:.2} €", price.round_dp(2));
    match (min_courses, max_courses) {
        (Some(min), Some(max)) if min != max => {
            Some(format!("{} ({}-{} courses)", formatted, min, max))
        }
        _ => Some(formatted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn section(is_required: bool, costs: &[Decimal]) -> SectionCosting {
        SectionCosting {
            section_id: Uuid::new_v4(),
            name: "section".to_string(),
            is_required,
            dishes: costs
                .iter()
                .map(|c| MenuDishCosting {
                    dish_id: Uuid::new_v4(),
                    name: "dish".to_string(),
                    cost: Some(*c),
                    effective_price: None,
                })
                .collect(),
        }
    }

    #[test]
    fn dish_cost_sums_priced_lines() {
        let lines = vec![
            (dec!(0.2), Some(dec!(12.50))), // 2.50
            (dec!(3), Some(dec!(0.50))),    // 1.50
        ];
        assert_eq!(dish_cost(&lines), Some(dec!(4.00)));
    }

    #[test]
    fn dish_cost_treats_missing_prices_as_zero_but_not_all_missing() {
        let lines = vec![(dec!(1), Some(dec!(2.00))), (dec!(5), None)];
        assert_eq!(dish_cost(&lines), Some(dec!(2.00)));

        // Unknown, not free: no line has a price.
        let unpriced = vec![(dec!(1), None), (dec!(5), None)];
        assert_eq!(dish_cost(&unpriced), None);
        assert_eq!(dish_cost(&[]), None);
    }

    #[test]
    fn dish_cost_zero_only_when_provably_zero() {
        let lines = vec![(dec!(2), Some(dec!(0)))];
        assert_eq!(dish_cost(&lines), Some(dec!(0)));
    }

    #[test]
    fn margin_requires_positive_cost_and_price() {
        assert_eq!(margin_pct(dec!(10.5), Some(dec!(25))), Some(dec!(58.00)));
        assert_eq!(margin_pct(dec!(0), Some(dec!(25))), None);
        assert_eq!(margin_pct(dec!(10), Some(dec!(0))), None);
        assert_eq!(margin_pct(dec!(10), None), None);
        // Negative margin propagates: the engine does not validate.
        assert_eq!(margin_pct(dec!(30), Some(dec!(25))), Some(dec!(-20.00)));
    }

    #[test]
    fn effective_price_prefers_override() {
        assert_eq!(
            effective_price(Some(dec!(9.00)), Some(dec!(12.00))),
            Some(dec!(9.00))
        );
        assert_eq!(effective_price(None, Some(dec!(12.00))), Some(dec!(12.00)));
        assert_eq!(effective_price(None, None), None);
    }

    #[test]
    fn fixed_price_range_is_degenerate() {
        let sections = vec![section(true, &[dec!(4.00)]), section(true, &[dec!(6.50)])];
        let range = cost_range(PricingMode::FixedPrice, &sections);
        assert_eq!(range.min_cost, dec!(10.50));
        assert_eq!(range.max_cost, dec!(10.50));
        assert_eq!(range.average_cost, dec!(5.25));
        assert_eq!(range.dish_count, 2);

        // Worked example: fixed price 25.00 over these costs.
        assert_eq!(
            margin_pct(range.max_cost, Some(dec!(25.00))),
            Some(dec!(58.00))
        );
        assert_eq!(
            margin_pct(range.min_cost, Some(dec!(25.00))),
            Some(dec!(58.00))
        );
    }

    #[test]
    fn choice_range_required_and_optional_sections() {
        let sections = vec![
            section(true, &[dec!(3), dec!(5), dec!(8)]),
            section(false, &[dec!(2), dec!(10)]),
        ];
        let range = cost_range(PricingMode::Choice, &sections);
        // Min: cheapest of the required section only.
        assert_eq!(range.min_cost, dec!(3));
        // Max: dearest required plus dearest optional.
        assert_eq!(range.max_cost, dec!(18));
        // Average: mean over every dish in every section.
        assert_eq!(range.average_cost, dec!(5.60));
        assert_eq!(range.dish_count, 5);
    }

    #[test]
    fn choice_range_empty_section_contributes_zero() {
        let sections = vec![section(true, &[]), section(true, &[dec!(4)])];
        let range = cost_range(PricingMode::Choice, &sections);
        assert_eq!(range.min_cost, dec!(4));
        assert_eq!(range.max_cost, dec!(4));
    }

    #[test]
    fn unknown_dish_cost_counts_as_zero_in_ranges() {
        let mut with_unknown = section(true, &[dec!(7)]);
        with_unknown.dishes.push(MenuDishCosting {
            dish_id: Uuid::new_v4(),
            name: "unpriced".to_string(),
            cost: None,
            effective_price: None,
        });
        let range = cost_range(PricingMode::Choice, &[with_unknown]);
        assert_eq!(range.min_cost, dec!(0));
        assert_eq!(range.max_cost, dec!(7));
    }

    #[test]
    fn display_price_formats_and_suffixes_courses() {
        assert_eq!(display_price(None, None, None), None);
        assert_eq!(
            display_price(Some(dec!(32)), None, None),
            Some("32.00 €".to_string())
        );
        // Equal min/max courses: no suffix.
        assert_eq!(
            display_price(Some(dec!(32)), Some(3), Some(3)),
            Some("32.00 €".to_string())
        );
        assert_eq!(
            display_price(Some(dec!(45.5)), Some(3), Some(5)),
            Some("45.50 € (3-5 courses)".to_string())
        );
    }

    #[test]
    fn cost_range_is_pure() {
        let sections = vec![
            section(true, &[dec!(3), dec!(5), dec!(8)]),
            section(false, &[dec!(2), dec!(10)]),
        ];
        let first = cost_range(PricingMode::Choice, &sections);
        let second = cost_range(PricingMode::Choice, &sections);
        assert_eq!(first, second);
    }
}

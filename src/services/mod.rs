pub mod bills;
pub mod dishes;
pub mod disputes;
pub mod items;
pub mod menu_costing;
pub mod menus;
pub mod stock_ledger;

// Inventory side
pub mod item;
pub mod stock_movement;

// Recipe / menu side
pub mod dish;
pub mod menu;
pub mod menu_dish;
pub mod menu_section;
pub mod recipe_line;

// Paperwork driving the ledger
pub mod bill_line;
pub mod dispute;
pub mod supplier_bill;

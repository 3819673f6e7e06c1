use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240110_000001_create_inventory_tables::Migration),
            Box::new(m20240110_000002_create_recipe_menu_tables::Migration),
            Box::new(m20240110_000003_create_bill_dispute_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240110_000001_create_inventory_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240110_000001_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create items table aligned with entities::item::Model
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Items::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Items::Name).string().not_null())
                        .col(ColumnDef::new(Items::Unit).string().not_null())
                        .col(
                            ColumnDef::new(Items::Quantity)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Items::UnitPrice).decimal_len(19, 4).null())
                        .col(ColumnDef::new(Items::TotalValue).decimal_len(19, 4).null())
                        .col(
                            ColumnDef::new(Items::TrackStock)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Items::ParLevel).decimal_len(19, 4).null())
                        .col(ColumnDef::new(Items::Category).string().null())
                        .col(
                            ColumnDef::new(Items::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Items::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Items::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_category")
                        .table(Items::Table)
                        .col(Items::Category)
                        .to_owned(),
                )
                .await?;

            // Create stock_movements table (append-only ledger)
            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::ItemId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::Kind).string().not_null())
                        .col(
                            ColumnDef::new(StockMovements::Quantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::BalanceAfter)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::UnitPrice)
                                .decimal_len(19, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::TotalValue)
                                .decimal_len(19, 4)
                                .null(),
                        )
                        .col(ColumnDef::new(StockMovements::ReferenceId).uuid().null())
                        .col(
                            ColumnDef::new(StockMovements::ReferenceType)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(StockMovements::Reason).string().not_null())
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_movements_item_id")
                                .from(StockMovements::Table, StockMovements::ItemId)
                                .to(Items::Table, Items::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_item_id")
                        .table(StockMovements::Table)
                        .col(StockMovements::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_created_at")
                        .table(StockMovements::Table)
                        .col(StockMovements::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Items {
        Table,
        Id,
        Name,
        Unit,
        Quantity,
        UnitPrice,
        TotalValue,
        TrackStock,
        ParLevel,
        Category,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
        ItemId,
        Kind,
        Quantity,
        BalanceAfter,
        UnitPrice,
        TotalValue,
        ReferenceId,
        ReferenceType,
        Reason,
        CreatedAt,
    }
}

mod m20240110_000002_create_recipe_menu_tables {
    use super::m20240110_000001_create_inventory_tables::Items;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240110_000002_create_recipe_menu_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create dishes table
            manager
                .create_table(
                    Table::create()
                        .table(Dishes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Dishes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Dishes::Name).string().not_null())
                        .col(ColumnDef::new(Dishes::Description).string().null())
                        .col(
                            ColumnDef::new(Dishes::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Dishes::SellingPrice)
                                .decimal_len(19, 4)
                                .null(),
                        )
                        .col(ColumnDef::new(Dishes::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Dishes::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            // Create recipe_lines table; cascades remove lines with their
            // dish or item, no application-level recompute needed
            manager
                .create_table(
                    Table::create()
                        .table(RecipeLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RecipeLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RecipeLines::DishId).uuid().not_null())
                        .col(ColumnDef::new(RecipeLines::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(RecipeLines::Quantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(RecipeLines::Unit).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_recipe_lines_dish_id")
                                .from(RecipeLines::Table, RecipeLines::DishId)
                                .to(Dishes::Table, Dishes::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_recipe_lines_item_id")
                                .from(RecipeLines::Table, RecipeLines::ItemId)
                                .to(Items::Table, Items::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_recipe_lines_dish_id")
                        .table(RecipeLines::Table)
                        .col(RecipeLines::DishId)
                        .to_owned(),
                )
                .await?;

            // Create menus table
            manager
                .create_table(
                    Table::create()
                        .table(Menus::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Menus::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Menus::Name).string().not_null())
                        .col(
                            ColumnDef::new(Menus::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Menus::PricingMode).string().not_null())
                        .col(ColumnDef::new(Menus::FixedPrice).decimal_len(19, 4).null())
                        .col(ColumnDef::new(Menus::MinCourses).integer().null())
                        .col(ColumnDef::new(Menus::MaxCourses).integer().null())
                        .col(ColumnDef::new(Menus::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Menus::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            // Create menu_sections table
            manager
                .create_table(
                    Table::create()
                        .table(MenuSections::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MenuSections::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MenuSections::MenuId).uuid().not_null())
                        .col(ColumnDef::new(MenuSections::Name).string().not_null())
                        .col(
                            ColumnDef::new(MenuSections::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(MenuSections::IsRequired)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_menu_sections_menu_id")
                                .from(MenuSections::Table, MenuSections::MenuId)
                                .to(Menus::Table, Menus::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_menu_sections_menu_id")
                        .table(MenuSections::Table)
                        .col(MenuSections::MenuId)
                        .to_owned(),
                )
                .await?;

            // Create menu_dishes table
            manager
                .create_table(
                    Table::create()
                        .table(MenuDishes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MenuDishes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MenuDishes::SectionId).uuid().not_null())
                        .col(ColumnDef::new(MenuDishes::DishId).uuid().not_null())
                        .col(
                            ColumnDef::new(MenuDishes::PriceOverride)
                                .decimal_len(19, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(MenuDishes::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(MenuDishes::Notes).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_menu_dishes_section_id")
                                .from(MenuDishes::Table, MenuDishes::SectionId)
                                .to(MenuSections::Table, MenuSections::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_menu_dishes_dish_id")
                                .from(MenuDishes::Table, MenuDishes::DishId)
                                .to(Dishes::Table, Dishes::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_menu_dishes_section_id")
                        .table(MenuDishes::Table)
                        .col(MenuDishes::SectionId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MenuDishes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MenuSections::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Menus::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(RecipeLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Dishes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Dishes {
        Table,
        Id,
        Name,
        Description,
        IsActive,
        SellingPrice,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum RecipeLines {
        Table,
        Id,
        DishId,
        ItemId,
        Quantity,
        Unit,
    }

    #[derive(DeriveIden)]
    enum Menus {
        Table,
        Id,
        Name,
        IsActive,
        PricingMode,
        FixedPrice,
        MinCourses,
        MaxCourses,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum MenuSections {
        Table,
        Id,
        MenuId,
        Name,
        Position,
        IsRequired,
    }

    #[derive(DeriveIden)]
    enum MenuDishes {
        Table,
        Id,
        SectionId,
        DishId,
        PriceOverride,
        Position,
        Notes,
    }
}

mod m20240110_000003_create_bill_dispute_tables {
    use super::m20240110_000001_create_inventory_tables::Items;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240110_000003_create_bill_dispute_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create supplier_bills table
            manager
                .create_table(
                    Table::create()
                        .table(SupplierBills::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SupplierBills::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SupplierBills::SupplierName).string().null())
                        .col(ColumnDef::new(SupplierBills::BillDate).date().null())
                        .col(
                            ColumnDef::new(SupplierBills::TotalAmount)
                                .decimal_len(19, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(SupplierBills::Status)
                                .string()
                                .not_null()
                                .default("draft"),
                        )
                        .col(ColumnDef::new(SupplierBills::ConfirmedAt).timestamp().null())
                        .col(
                            ColumnDef::new(SupplierBills::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SupplierBills::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_supplier_bills_status")
                        .table(SupplierBills::Table)
                        .col(SupplierBills::Status)
                        .to_owned(),
                )
                .await?;

            // Create bill_lines table
            manager
                .create_table(
                    Table::create()
                        .table(BillLines::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(BillLines::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(BillLines::BillId).uuid().not_null())
                        .col(ColumnDef::new(BillLines::ItemId).uuid().null())
                        .col(ColumnDef::new(BillLines::ItemName).string().not_null())
                        .col(
                            ColumnDef::new(BillLines::Quantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(BillLines::Unit).string().not_null())
                        .col(
                            ColumnDef::new(BillLines::UnitPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bill_lines_bill_id")
                                .from(BillLines::Table, BillLines::BillId)
                                .to(SupplierBills::Table, SupplierBills::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_bill_lines_bill_id")
                        .table(BillLines::Table)
                        .col(BillLines::BillId)
                        .to_owned(),
                )
                .await?;

            // Create disputes table
            manager
                .create_table(
                    Table::create()
                        .table(Disputes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Disputes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Disputes::BillId).uuid().null())
                        .col(ColumnDef::new(Disputes::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(Disputes::QuantityDelta)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Disputes::Reason).string().not_null())
                        .col(
                            ColumnDef::new(Disputes::Status)
                                .string()
                                .not_null()
                                .default("open"),
                        )
                        .col(ColumnDef::new(Disputes::ResolvedAt).timestamp().null())
                        .col(ColumnDef::new(Disputes::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Disputes::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_disputes_item_id")
                                .from(Disputes::Table, Disputes::ItemId)
                                .to(Items::Table, Items::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_disputes_status")
                        .table(Disputes::Table)
                        .col(Disputes::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Disputes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BillLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SupplierBills::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SupplierBills {
        Table,
        Id,
        SupplierName,
        BillDate,
        TotalAmount,
        Status,
        ConfirmedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum BillLines {
        Table,
        Id,
        BillId,
        ItemId,
        ItemName,
        Quantity,
        Unit,
        UnitPrice,
    }

    #[derive(DeriveIden)]
    enum Disputes {
        Table,
        Id,
        BillId,
        ItemId,
        QuantityDelta,
        Reason,
        Status,
        ResolvedAt,
        CreatedAt,
        UpdatedAt,
    }
}

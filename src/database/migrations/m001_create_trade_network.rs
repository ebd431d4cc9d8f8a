use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create nodes table
        manager
            .create_table(
                Table::create()
                    .table(Nodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Nodes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Nodes::Name).string_len(300).not_null().unique_key())
                    .col(ColumnDef::new(Nodes::SupplierId).integer().null())
                    .col(ColumnDef::new(Nodes::Level).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Nodes::DebtToTheSupplier)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Nodes::DateOfCreation).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_nodes_supplier_id")
                            .from(Nodes::Table, Nodes::SupplierId)
                            .to(Nodes::Table, Nodes::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_nodes_supplier_id")
                    .table(Nodes::Table)
                    .col(Nodes::SupplierId)
                    .to_owned(),
            )
            .await?;

        // Create contacts table (one row per node)
        manager
            .create_table(
                Table::create()
                    .table(Contacts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contacts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Contacts::NodeId).integer().not_null().unique_key())
                    .col(ColumnDef::new(Contacts::Email).string_len(254).null())
                    .col(ColumnDef::new(Contacts::Country).string_len(50).null())
                    .col(ColumnDef::new(Contacts::City).string_len(50).null())
                    .col(ColumnDef::new(Contacts::Street).string_len(50).null())
                    .col(ColumnDef::new(Contacts::HouseNumber).string_len(10).null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contacts_node_id")
                            .from(Contacts::Table, Contacts::NodeId)
                            .to(Nodes::Table, Nodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create products table
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string_len(150).not_null())
                    .col(ColumnDef::new(Products::Model).string_len(100).not_null())
                    .col(ColumnDef::new(Products::ReleaseDate).date().not_null())
                    .col(ColumnDef::new(Products::OwnerId).integer().not_null())
                    .col(
                        ColumnDef::new(Products::SellingPrice)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_owner_id")
                            .from(Products::Table, Products::OwnerId)
                            .to(Nodes::Table, Nodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contacts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Nodes::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Nodes {
    Table,
    Id,
    Name,
    SupplierId,
    Level,
    DebtToTheSupplier,
    DateOfCreation,
}

#[derive(DeriveIden)]
enum Contacts {
    Table,
    Id,
    NodeId,
    Email,
    Country,
    City,
    Street,
    HouseNumber,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    Model,
    ReleaseDate,
    OwnerId,
    SellingPrice,
}

//! Initial schema migration - creates all tables from scratch.
//!
//! Consolidated schema for the invoice engine:
//!
//! - `users`: actors referenced by audit fields and guardian counts
//! - `currencies`: currency master data (minor-unit scale, active flag)
//! - `vendors`: payees with a vetting status and soft delete
//! - `categories`, `payment_types`, `invoice_profiles`: master data
//! - `invoices`: financial obligations with lifecycle + audit columns
//! - `payments`: settlements with frozen TDS capture
//! - `attachments`, `comments`: invoice satellites
//! - `master_data_requests`: the propose/review workflow
//! - `deletion_log`: tombstones for hard-deleted invoices

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    Role,
    Active,
}

#[derive(Iden)]
enum Currencies {
    Table,
    Code,
    Name,
    DecimalPlaces,
    Active,
}

#[derive(Iden)]
enum Vendors {
    Table,
    Id,
    Name,
    NameNorm,
    Address,
    TaxExempt,
    BankName,
    BankAccount,
    Status,
    CreatedBy,
    ApprovedBy,
    ApprovedAt,
    RejectionReason,
    DeletedAt,
    CreatedAt,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    Name,
    NameNorm,
    Description,
    Active,
}

#[derive(Iden)]
enum PaymentTypes {
    Table,
    Id,
    Name,
    NameNorm,
    Active,
}

#[derive(Iden)]
enum InvoiceProfiles {
    Table,
    Id,
    Name,
    NameNorm,
    CategoryId,
    DayOfMonth,
    Active,
}

#[derive(Iden)]
enum Invoices {
    Table,
    Id,
    InvoiceNumber,
    VendorId,
    AmountMinor,
    CurrencyCode,
    Status,
    InvoiceDate,
    DueDate,
    PeriodStart,
    PeriodEnd,
    CategoryId,
    ProfileId,
    TdsApplicable,
    TdsRatePercent,
    TdsRounding,
    Archived,
    ArchivedBy,
    ArchivedAt,
    ArchiveReason,
    HeldBy,
    HeldAt,
    HoldReason,
    RejectedBy,
    RejectedAt,
    RejectionReason,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    InvoiceId,
    AmountPaidMinor,
    PaymentDate,
    PaymentTypeId,
    Status,
    TdsWithheldMinor,
    TdsRounding,
    Reference,
    CreatedBy,
    CreatedAt,
    ReviewedBy,
    ReviewedAt,
    RejectionNote,
}

#[derive(Iden)]
enum Attachments {
    Table,
    Id,
    InvoiceId,
    FileName,
    StoragePath,
    UploadedBy,
    UploadedAt,
}

#[derive(Iden)]
enum Comments {
    Table,
    Id,
    InvoiceId,
    AuthorId,
    Body,
    CreatedAt,
}

#[derive(Iden)]
enum MasterDataRequests {
    Table,
    Id,
    EntityType,
    Status,
    Payload,
    TargetRef,
    RequestedBy,
    ReviewedBy,
    ReviewedAt,
    ReviewNotes,
    AdminEdits,
    RejectionReason,
    ResubmissionCount,
    PreviousAttemptId,
    SupersededById,
    CreatedEntityId,
    CreatedAt,
}

#[derive(Iden)]
enum DeletionLog {
    Table,
    Id,
    InvoiceId,
    InvoiceNumber,
    VendorId,
    Reason,
    DeletedBy,
    DeletedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string().not_null())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .col(
                        ColumnDef::new(Users::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-username")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // currencies
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Currencies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Currencies::Code)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Currencies::Name).string().not_null())
                    .col(
                        ColumnDef::new(Currencies::DecimalPlaces)
                            .small_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Currencies::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // vendors
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Vendors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vendors::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vendors::Name).string().not_null())
                    .col(ColumnDef::new(Vendors::NameNorm).string().not_null())
                    .col(ColumnDef::new(Vendors::Address).string())
                    .col(
                        ColumnDef::new(Vendors::TaxExempt)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Vendors::BankName).string())
                    .col(ColumnDef::new(Vendors::BankAccount).string())
                    .col(ColumnDef::new(Vendors::Status).string().not_null())
                    .col(ColumnDef::new(Vendors::CreatedBy).integer().not_null())
                    .col(ColumnDef::new(Vendors::ApprovedBy).integer())
                    .col(ColumnDef::new(Vendors::ApprovedAt).timestamp())
                    .col(ColumnDef::new(Vendors::RejectionReason).string())
                    .col(ColumnDef::new(Vendors::DeletedAt).timestamp())
                    .col(ColumnDef::new(Vendors::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-vendors-created_by")
                            .from(Vendors::Table, Vendors::CreatedBy)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Uniqueness is case/diacritic-insensitive and only among non-deleted
        // rows, so it is enforced in-transaction; this index keeps the lookup
        // fast.
        manager
            .create_index(
                Index::create()
                    .name("idx-vendors-name_norm")
                    .table(Vendors::Table)
                    .col(Vendors::NameNorm)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // categories / payment_types / invoice_profiles
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::NameNorm).string().not_null())
                    .col(ColumnDef::new(Categories::Description).string())
                    .col(
                        ColumnDef::new(Categories::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-name_norm")
                    .table(Categories::Table)
                    .col(Categories::NameNorm)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentTypes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentTypes::Name).string().not_null())
                    .col(ColumnDef::new(PaymentTypes::NameNorm).string().not_null())
                    .col(
                        ColumnDef::new(PaymentTypes::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InvoiceProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvoiceProfiles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InvoiceProfiles::Name).string().not_null())
                    .col(
                        ColumnDef::new(InvoiceProfiles::NameNorm)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoiceProfiles::CategoryId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InvoiceProfiles::DayOfMonth).small_integer())
                    .col(
                        ColumnDef::new(InvoiceProfiles::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoice_profiles-category_id")
                            .from(InvoiceProfiles::Table, InvoiceProfiles::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // invoices
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Invoices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Invoices::InvoiceNumber).string().not_null())
                    .col(ColumnDef::new(Invoices::VendorId).integer().not_null())
                    .col(
                        ColumnDef::new(Invoices::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::CurrencyCode).string().not_null())
                    .col(ColumnDef::new(Invoices::Status).string().not_null())
                    .col(ColumnDef::new(Invoices::InvoiceDate).date().not_null())
                    .col(ColumnDef::new(Invoices::DueDate).date())
                    .col(ColumnDef::new(Invoices::PeriodStart).date())
                    .col(ColumnDef::new(Invoices::PeriodEnd).date())
                    .col(ColumnDef::new(Invoices::CategoryId).integer())
                    .col(ColumnDef::new(Invoices::ProfileId).integer())
                    .col(
                        ColumnDef::new(Invoices::TdsApplicable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Invoices::TdsRatePercent).big_integer())
                    .col(ColumnDef::new(Invoices::TdsRounding).string().not_null())
                    .col(
                        ColumnDef::new(Invoices::Archived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Invoices::ArchivedBy).integer())
                    .col(ColumnDef::new(Invoices::ArchivedAt).timestamp())
                    .col(ColumnDef::new(Invoices::ArchiveReason).string())
                    .col(ColumnDef::new(Invoices::HeldBy).integer())
                    .col(ColumnDef::new(Invoices::HeldAt).timestamp())
                    .col(ColumnDef::new(Invoices::HoldReason).string())
                    .col(ColumnDef::new(Invoices::RejectedBy).integer())
                    .col(ColumnDef::new(Invoices::RejectedAt).timestamp())
                    .col(ColumnDef::new(Invoices::RejectionReason).string())
                    .col(ColumnDef::new(Invoices::CreatedBy).integer().not_null())
                    .col(ColumnDef::new(Invoices::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoices-vendor_id")
                            .from(Invoices::Table, Invoices::VendorId)
                            .to(Vendors::Table, Vendors::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoices-currency_code")
                            .from(Invoices::Table, Invoices::CurrencyCode)
                            .to(Currencies::Table, Currencies::Code),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoices-category_id")
                            .from(Invoices::Table, Invoices::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoices-profile_id")
                            .from(Invoices::Table, Invoices::ProfileId)
                            .to(InvoiceProfiles::Table, InvoiceProfiles::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoices-created_by")
                            .from(Invoices::Table, Invoices::CreatedBy)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoices-vendor_id-invoice_number")
                    .table(Invoices::Table)
                    .col(Invoices::VendorId)
                    .col(Invoices::InvoiceNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoices-status")
                    .table(Invoices::Table)
                    .col(Invoices::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoices-due_date")
                    .table(Invoices::Table)
                    .col(Invoices::DueDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::InvoiceId).integer().not_null())
                    .col(
                        ColumnDef::new(Payments::AmountPaidMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::PaymentDate).date().not_null())
                    .col(ColumnDef::new(Payments::PaymentTypeId).integer())
                    .col(ColumnDef::new(Payments::Status).string().not_null())
                    .col(
                        ColumnDef::new(Payments::TdsWithheldMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::TdsRounding).string().not_null())
                    .col(ColumnDef::new(Payments::Reference).string())
                    .col(ColumnDef::new(Payments::CreatedBy).integer().not_null())
                    .col(ColumnDef::new(Payments::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Payments::ReviewedBy).integer())
                    .col(ColumnDef::new(Payments::ReviewedAt).timestamp())
                    .col(ColumnDef::new(Payments::RejectionNote).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-invoice_id")
                            .from(Payments::Table, Payments::InvoiceId)
                            .to(Invoices::Table, Invoices::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-payment_type_id")
                            .from(Payments::Table, Payments::PaymentTypeId)
                            .to(PaymentTypes::Table, PaymentTypes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-invoice_id-status")
                    .table(Payments::Table)
                    .col(Payments::InvoiceId)
                    .col(Payments::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // attachments / comments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Attachments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Attachments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Attachments::InvoiceId).integer().not_null())
                    .col(ColumnDef::new(Attachments::FileName).string().not_null())
                    .col(ColumnDef::new(Attachments::StoragePath).string().not_null())
                    .col(ColumnDef::new(Attachments::UploadedBy).integer().not_null())
                    .col(
                        ColumnDef::new(Attachments::UploadedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-attachments-invoice_id")
                            .from(Attachments::Table, Attachments::InvoiceId)
                            .to(Invoices::Table, Invoices::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-attachments-invoice_id")
                    .table(Attachments::Table)
                    .col(Attachments::InvoiceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comments::InvoiceId).integer().not_null())
                    .col(ColumnDef::new(Comments::AuthorId).integer().not_null())
                    .col(ColumnDef::new(Comments::Body).string().not_null())
                    .col(ColumnDef::new(Comments::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-comments-invoice_id")
                            .from(Comments::Table, Comments::InvoiceId)
                            .to(Invoices::Table, Invoices::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-comments-invoice_id")
                    .table(Comments::Table)
                    .col(Comments::InvoiceId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // master_data_requests
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(MasterDataRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MasterDataRequests::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MasterDataRequests::EntityType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MasterDataRequests::Status)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MasterDataRequests::Payload).json().not_null())
                    .col(ColumnDef::new(MasterDataRequests::TargetRef).string())
                    .col(
                        ColumnDef::new(MasterDataRequests::RequestedBy)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MasterDataRequests::ReviewedBy).integer())
                    .col(ColumnDef::new(MasterDataRequests::ReviewedAt).timestamp())
                    .col(ColumnDef::new(MasterDataRequests::ReviewNotes).string())
                    .col(ColumnDef::new(MasterDataRequests::AdminEdits).json())
                    .col(ColumnDef::new(MasterDataRequests::RejectionReason).string())
                    .col(
                        ColumnDef::new(MasterDataRequests::ResubmissionCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(MasterDataRequests::PreviousAttemptId).integer())
                    .col(ColumnDef::new(MasterDataRequests::SupersededById).integer())
                    .col(ColumnDef::new(MasterDataRequests::CreatedEntityId).integer())
                    .col(
                        ColumnDef::new(MasterDataRequests::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-master_data_requests-previous_attempt_id")
                            .from(
                                MasterDataRequests::Table,
                                MasterDataRequests::PreviousAttemptId,
                            )
                            .to(MasterDataRequests::Table, MasterDataRequests::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-master_data_requests-status")
                    .table(MasterDataRequests::Table)
                    .col(MasterDataRequests::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-master_data_requests-entity_type-target_ref")
                    .table(MasterDataRequests::Table)
                    .col(MasterDataRequests::EntityType)
                    .col(MasterDataRequests::TargetRef)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // deletion_log
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(DeletionLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeletionLog::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeletionLog::InvoiceId).integer().not_null())
                    .col(
                        ColumnDef::new(DeletionLog::InvoiceNumber)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeletionLog::VendorId).integer().not_null())
                    .col(ColumnDef::new(DeletionLog::Reason).string().not_null())
                    .col(ColumnDef::new(DeletionLog::DeletedBy).integer().not_null())
                    .col(ColumnDef::new(DeletionLog::DeletedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Table::drop().table(DeletionLog::Table).to_owned(),
            Table::drop().table(MasterDataRequests::Table).to_owned(),
            Table::drop().table(Comments::Table).to_owned(),
            Table::drop().table(Attachments::Table).to_owned(),
            Table::drop().table(Payments::Table).to_owned(),
            Table::drop().table(Invoices::Table).to_owned(),
            Table::drop().table(InvoiceProfiles::Table).to_owned(),
            Table::drop().table(PaymentTypes::Table).to_owned(),
            Table::drop().table(Categories::Table).to_owned(),
            Table::drop().table(Vendors::Table).to_owned(),
            Table::drop().table(Currencies::Table).to_owned(),
            Table::drop().table(Users::Table).to_owned(),
        ] {
            manager.drop_table(table).await?;
        }
        Ok(())
    }
}

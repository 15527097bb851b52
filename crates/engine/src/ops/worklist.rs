//! The invoice worklist: filter, enrich, rank, paginate.
//!
//! Worklist reads are advisory and non-transactional; every authoritative
//! predicate is re-checked inside the mutating operations. The sort contract:
//! stored columns are ordered by the database, while any sort key that is not
//! a stored column (the default priority ranking, remaining balance) requires
//! fetching the filtered set, enriching it, and sorting in memory.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use sea_orm::{
    ConnectionTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement,
    prelude::*,
};

use crate::{
    Invoice, InvoiceStatus, PaymentStatus, ResultEngine,
    due::{self, DueState},
    invoices,
};

use super::{Engine, payments::{SettlementSummary, derive_status}};

/// Predicate set for the worklist. Status and overdue filters act on the
/// **derived** status, so they are applied after enrichment.
#[derive(Clone, Debug, Default)]
pub struct InvoiceListFilter {
    /// If present, acts as an allow-list of derived statuses to return.
    pub statuses: Option<Vec<InvoiceStatus>>,
    pub vendor_id: Option<i32>,
    pub category_id: Option<i32>,
    pub created_by: Option<i32>,
    /// If true, archived invoices are included (default: false).
    pub include_archived: bool,
    /// If true, only invoices past their due date are returned.
    pub overdue_only: bool,
}

/// Sort order for the worklist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WorklistSort {
    /// The default ranking: action-required and time-critical items first.
    #[default]
    Priority,
    InvoiceDate,
    DueDate,
    Amount,
    CreatedAt,
    /// Derived from payments; always sorted in memory.
    RemainingBalance,
}

impl WorklistSort {
    /// The backing column for database-side ordering, when one exists.
    fn stored_column(self) -> Option<(invoices::Column, Order)> {
        match self {
            Self::InvoiceDate => Some((invoices::Column::InvoiceDate, Order::Desc)),
            Self::DueDate => Some((invoices::Column::DueDate, Order::Asc)),
            Self::Amount => Some((invoices::Column::AmountMinor, Order::Desc)),
            Self::CreatedAt => Some((invoices::Column::CreatedAt, Order::Desc)),
            Self::Priority | Self::RemainingBalance => None,
        }
    }
}

/// One enriched worklist row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorklistItem {
    pub invoice: Invoice,
    pub settlement: SettlementSummary,
    pub due: Option<DueState>,
    /// Rank class from the priority ordering (0 = most urgent).
    pub priority: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorklistPage {
    pub items: Vec<WorklistItem>,
    /// Matching rows before pagination.
    pub total: u64,
}

impl Engine {
    /// Builds the worklist for `today`.
    pub async fn invoice_worklist(
        &self,
        filter: &InvoiceListFilter,
        sort: WorklistSort,
        limit: u64,
        offset: u64,
        today: NaiveDate,
    ) -> ResultEngine<WorklistPage> {
        let mut query = invoices::Entity::find();
        if let Some(vendor_id) = filter.vendor_id {
            query = query.filter(invoices::Column::VendorId.eq(vendor_id));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(invoices::Column::CategoryId.eq(category_id));
        }
        if let Some(created_by) = filter.created_by {
            query = query.filter(invoices::Column::CreatedBy.eq(created_by));
        }
        if !filter.include_archived {
            query = query.filter(invoices::Column::Archived.eq(false));
        }

        let needs_enriched_filter = filter.statuses.is_some() || filter.overdue_only;
        let stored_order = sort.stored_column();
        // Pagination can only be pushed down when neither the filter nor the
        // sort depends on computed fields.
        let push_down = stored_order.is_some() && !needs_enriched_filter;

        if let Some((column, order)) = stored_order {
            query = query
                .order_by(column, order)
                .order_by_desc(invoices::Column::Id);
        }

        let (rows, mut total): (Vec<invoices::Model>, u64) = if push_down {
            let total = query.clone().count(&self.database).await?;
            let rows = query
                .limit(limit)
                .offset(offset)
                .all(&self.database)
                .await?;
            (rows, total)
        } else {
            (query.all(&self.database).await?, 0)
        };

        let approved = self.approved_totals_by_invoice(&self.database).await?;
        let pending = self.invoices_with_pending_payment(&self.database).await?;

        let mut keyed: Vec<((u8, i64, i64), WorklistItem)> = Vec::with_capacity(rows.len());
        for model in rows {
            let persisted = InvoiceStatus::try_from(model.status.as_str())?;
            let (approved_total, approved_count) =
                approved.get(&model.id).copied().unwrap_or((0, 0));
            let derived =
                derive_status(persisted, model.amount_minor, approved_total, approved_count);
            let remaining = (model.amount_minor - approved_total).max(0);
            let due = due::classify(
                derived,
                model.due_date,
                remaining,
                today,
                self.due_soon_days,
            );
            let key = due::priority_key(derived, model.archived, due.as_ref(), model.created_at);

            let settlement = SettlementSummary {
                invoice_id: model.id,
                approved_total_minor: approved_total,
                remaining_balance_minor: remaining,
                derived_status: derived,
                has_pending_payment: pending.contains(&model.id),
            };
            let item = WorklistItem {
                invoice: Invoice::try_from(model)?,
                settlement,
                due,
                priority: key.0,
            };
            keyed.push((key, item));
        }

        if let Some(statuses) = &filter.statuses {
            keyed.retain(|(_, item)| statuses.contains(&item.settlement.derived_status));
        }
        if filter.overdue_only {
            keyed.retain(|(_, item)| item.due.as_ref().is_some_and(DueState::is_overdue));
        }

        match sort {
            WorklistSort::Priority => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
            WorklistSort::RemainingBalance => keyed.sort_by(|a, b| {
                b.1.settlement
                    .remaining_balance_minor
                    .cmp(&a.1.settlement.remaining_balance_minor)
                    .then(b.1.invoice.created_at.cmp(&a.1.invoice.created_at))
            }),
            // Stored-column sorts arrived in database order.
            _ => {}
        }

        let mut items: Vec<WorklistItem> = keyed.into_iter().map(|(_, item)| item).collect();
        if !push_down {
            total = items.len() as u64;
            items = items
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect();
        }

        Ok(WorklistPage { items, total })
    }

    /// `(sum, count)` of approved payments grouped by invoice.
    async fn approved_totals_by_invoice<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> ResultEngine<HashMap<i32, (i64, i64)>> {
        let backend = db.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT invoice_id, COALESCE(SUM(amount_paid_minor), 0) AS sum, COUNT(*) AS cnt \
             FROM payments \
             WHERE status = ? \
             GROUP BY invoice_id",
            vec![PaymentStatus::Approved.as_str().into()],
        );
        let rows = db.query_all(stmt).await?;

        let mut totals = HashMap::with_capacity(rows.len());
        for row in rows {
            let invoice_id: i32 = row.try_get("", "invoice_id")?;
            let sum: i64 = row.try_get("", "sum")?;
            let cnt: i64 = row.try_get("", "cnt")?;
            totals.insert(invoice_id, (sum, cnt));
        }
        Ok(totals)
    }

    /// Invoices with at least one payment awaiting review.
    async fn invoices_with_pending_payment<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> ResultEngine<HashSet<i32>> {
        let backend = db.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT DISTINCT invoice_id FROM payments WHERE status = ?",
            vec![PaymentStatus::Pending.as_str().into()],
        );
        let rows = db.query_all(stmt).await?;

        let mut pending = HashSet::with_capacity(rows.len());
        for row in rows {
            pending.insert(row.try_get("", "invoice_id")?);
        }
        Ok(pending)
    }
}

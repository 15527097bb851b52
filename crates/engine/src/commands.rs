//! Command structs for engine operations.
//!
//! These types group parameters for the wider write operations (submit/update
//! invoice, record payment, create vendor), keeping call sites readable and
//! avoiding long argument lists.

use chrono::NaiveDate;

use crate::tds::TdsRounding;

/// Create a new invoice.
#[derive(Clone, Debug)]
pub struct SubmitInvoiceCmd {
    pub invoice_number: String,
    pub vendor_id: i32,
    pub amount_minor: i64,
    pub currency_code: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub category_id: Option<i32>,
    pub profile_id: Option<i32>,
    pub tds_rate_percent: Option<i64>,
    pub tds_rounding: TdsRounding,
}

impl SubmitInvoiceCmd {
    #[must_use]
    pub fn new(
        invoice_number: impl Into<String>,
        vendor_id: i32,
        amount_minor: i64,
        currency_code: impl Into<String>,
        invoice_date: NaiveDate,
    ) -> Self {
        Self {
            invoice_number: invoice_number.into(),
            vendor_id,
            amount_minor,
            currency_code: currency_code.into(),
            invoice_date,
            due_date: None,
            period_start: None,
            period_end: None,
            category_id: None,
            profile_id: None,
            tds_rate_percent: None,
            tds_rounding: TdsRounding::default(),
        }
    }

    #[must_use]
    pub fn due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    #[must_use]
    pub fn period(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.period_start = Some(start);
        self.period_end = Some(end);
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: i32) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn profile_id(mut self, profile_id: i32) -> Self {
        self.profile_id = Some(profile_id);
        self
    }

    #[must_use]
    pub fn tds(mut self, rate_percent: i64, rounding: TdsRounding) -> Self {
        self.tds_rate_percent = Some(rate_percent);
        self.tds_rounding = rounding;
        self
    }
}

/// Update an existing invoice. Unset fields keep their current value.
#[derive(Clone, Debug)]
pub struct UpdateInvoiceCmd {
    pub invoice_id: i32,
    pub invoice_number: Option<String>,
    pub amount_minor: Option<i64>,
    pub currency_code: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub category_id: Option<i32>,
    pub profile_id: Option<i32>,
    pub tds_rate_percent: Option<i64>,
    pub tds_rounding: Option<TdsRounding>,
}

impl UpdateInvoiceCmd {
    #[must_use]
    pub fn new(invoice_id: i32) -> Self {
        Self {
            invoice_id,
            invoice_number: None,
            amount_minor: None,
            currency_code: None,
            invoice_date: None,
            due_date: None,
            category_id: None,
            profile_id: None,
            tds_rate_percent: None,
            tds_rounding: None,
        }
    }

    #[must_use]
    pub fn invoice_number(mut self, invoice_number: impl Into<String>) -> Self {
        self.invoice_number = Some(invoice_number.into());
        self
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn currency_code(mut self, currency_code: impl Into<String>) -> Self {
        self.currency_code = Some(currency_code.into());
        self
    }

    #[must_use]
    pub fn invoice_date(mut self, invoice_date: NaiveDate) -> Self {
        self.invoice_date = Some(invoice_date);
        self
    }

    #[must_use]
    pub fn due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: i32) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn profile_id(mut self, profile_id: i32) -> Self {
        self.profile_id = Some(profile_id);
        self
    }

    #[must_use]
    pub fn tds(mut self, rate_percent: i64, rounding: TdsRounding) -> Self {
        self.tds_rate_percent = Some(rate_percent);
        self.tds_rounding = Some(rounding);
        self
    }
}

/// Record a settlement against an invoice.
#[derive(Clone, Debug)]
pub struct RecordPaymentCmd {
    pub invoice_id: i32,
    pub amount_paid_minor: i64,
    pub payment_date: NaiveDate,
    pub payment_type_id: Option<i32>,
    pub reference: Option<String>,
}

impl RecordPaymentCmd {
    #[must_use]
    pub fn new(invoice_id: i32, amount_paid_minor: i64, payment_date: NaiveDate) -> Self {
        Self {
            invoice_id,
            amount_paid_minor,
            payment_date,
            payment_type_id: None,
            reference: None,
        }
    }

    #[must_use]
    pub fn payment_type_id(mut self, payment_type_id: i32) -> Self {
        self.payment_type_id = Some(payment_type_id);
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Create a vendor directly (outside the request workflow).
#[derive(Clone, Debug)]
pub struct CreateVendorCmd {
    pub name: String,
    pub address: Option<String>,
    pub tax_exempt: bool,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
}

impl CreateVendorCmd {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
            tax_exempt: false,
            bank_name: None,
            bank_account: None,
        }
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn tax_exempt(mut self, tax_exempt: bool) -> Self {
        self.tax_exempt = tax_exempt;
        self
    }

    #[must_use]
    pub fn bank_details(
        mut self,
        bank_name: impl Into<String>,
        bank_account: impl Into<String>,
    ) -> Self {
        self.bank_name = Some(bank_name.into());
        self.bank_account = Some(bank_account.into());
        self
    }
}

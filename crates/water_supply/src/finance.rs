use std::collections::BTreeMap;

use itertools::Itertools;
use model::{
    finance::{Invoice, InvoiceStatus, Month, Partner},
    view::FinanceOverview,
};

use crate::collections::FinanceCollections;

/// Sum of invoices issued in `month`, whatever their status.
pub fn revenue(invoices: &[Invoice], month: Month) -> f64 {
    invoices
        .iter()
        .filter(|invoice| invoice.issue_date.is_some_and(|date| month.contains(date)))
        .fold(0.0, |sum, invoice| sum + invoice.amount)
}

/// Sum of pending and overdue invoices.
pub fn outstanding(invoices: &[Invoice]) -> f64 {
    invoices
        .iter()
        .filter(|invoice| invoice.is_outstanding())
        .fold(0.0, |sum, invoice| sum + invoice.amount)
}

/// Signed sum of partner balances. Partners without a balance count as
/// zero.
pub fn partner_balance(partners: &[Partner]) -> f64 {
    partners
        .iter()
        .fold(0.0, |sum, partner| sum + partner.balance.unwrap_or(0.0))
}

/// Invoices per status. The three known statuses are always present.
pub fn invoice_counts(invoices: &[Invoice]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = [
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
    ]
    .iter()
    .map(|status| (status.as_str().to_owned(), 0))
    .collect();
    for (status, count) in invoices
        .iter()
        .map(|invoice| invoice.status.as_str().to_owned())
        .counts()
    {
        counts.insert(status, count);
    }
    counts
}

pub fn overview(collections: &FinanceCollections, month: Month) -> FinanceOverview {
    FinanceOverview {
        month,
        revenue: revenue(&collections.invoices, month),
        outstanding: outstanding(&collections.invoices),
        partner_balance: partner_balance(&collections.partners),
        invoice_counts: invoice_counts(&collections.invoices),
        transaction_count: collections.transactions.len(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    /// Matched case-insensitively against invoice number and client.
    pub search: Option<String>,
}

impl InvoiceFilter {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        let status_matches = self
            .status
            .as_ref()
            .map_or(true, |status| &invoice.status == status);
        let search_matches = self.search.as_deref().map(str::trim).map_or(true, |search| {
            let search = search.to_lowercase();
            [&invoice.invoice_number, &invoice.client_name]
                .into_iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(&search))
        });
        status_matches && search_matches
    }

    pub fn apply<'a>(&self, invoices: &'a [Invoice]) -> Vec<&'a Invoice> {
        invoices
            .iter()
            .filter(|invoice| self.matches(invoice))
            .collect()
    }
}

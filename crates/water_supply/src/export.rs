//! CSV exports of the deployment table and the invoice list.

use model::{finance::Invoice, view::DeploymentView};
use serde::Serialize;

#[derive(Serialize)]
struct DeploymentRow<'a> {
    id: &'a str,
    status: &'a str,
    site_status: &'a str,
    location: &'a str,
    address: &'a str,
    postcode: &'a str,
    bowser: &'a str,
    supply_percent: u8,
    start_date: String,
    end_date: String,
}

#[derive(Serialize)]
struct InvoiceRow<'a> {
    invoice_number: &'a str,
    client: &'a str,
    amount: f64,
    status: &'a str,
    issue_date: String,
    due_date: String,
}

fn write_rows<R: Serialize>(rows: impl IntoIterator<Item = R>) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|why| csv::Error::from(why.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn deployments_csv(views: &[DeploymentView]) -> Result<String, csv::Error> {
    write_rows(views.iter().map(|view| DeploymentRow {
        id: view.id.as_str(),
        status: view.status.as_str(),
        site_status: view.site_status.as_str(),
        location: &view.location_name,
        address: &view.address,
        postcode: view.postcode.as_deref().unwrap_or_default(),
        bowser: &view.bowser_number,
        supply_percent: view.supply_percent,
        start_date: view
            .start_date
            .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default(),
        end_date: view
            .end_date
            .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default(),
    }))
}

pub fn invoices_csv(invoices: &[Invoice]) -> Result<String, csv::Error> {
    write_rows(invoices.iter().map(|invoice| InvoiceRow {
        invoice_number: invoice.invoice_number.as_deref().unwrap_or(invoice.id.as_str()),
        client: invoice.client_name.as_deref().unwrap_or_default(),
        amount: invoice.amount,
        status: invoice.status.as_str(),
        issue_date: invoice
            .issue_date
            .map(|date| date.to_string())
            .unwrap_or_default(),
        due_date: invoice
            .due_date
            .map(|date| date.to_string())
            .unwrap_or_default(),
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn invoice_export() {
        let invoices: Vec<Invoice> = serde_json::from_value(json!([
            {"id": "I1", "invoice_number": "INV-001", "client_name": "Westminster Council, Finance",
             "amount": 2400.5, "status": "paid", "issue_date": "2025-04-02"},
            {"id": "I2", "amount": 10, "status": "pending"}
        ]))
        .unwrap();
        let csv = invoices_csv(&invoices).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(
            lines,
            [
                "invoice_number,client,amount,status,issue_date,due_date",
                "INV-001,\"Westminster Council, Finance\",2400.5,paid,2025-04-02,",
                "I2,,10.0,pending,,",
            ]
        );
    }

    #[test]
    fn empty_export_is_empty() {
        assert_eq!(deployments_csv(&[]).unwrap(), "");
    }
}

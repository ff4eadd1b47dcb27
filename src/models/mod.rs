mod invoice_record;

pub use invoice_record::{format_amount, InvoiceRecord, LineItem};

mod allowance;
mod deduction_config;
mod deduction_record;
mod tax_bracket;
mod tax_request;
mod tax_response;

pub use allowance::{AllowanceEntry, AllowanceKind};
pub use deduction_config::{ADMIN_DEDUCTION_CEILING, DeductionConfig, PERSONAL_EXEMPTION_FLOOR};
pub use deduction_record::{DeductionRecord, NewDeductionRecord};
pub use tax_bracket::TaxBracket;
pub use tax_request::{DeductionUpdate, FlatShape, TaxRequest};
pub use tax_response::{
    BatchTaxResponse, IncomeTaxRecord, KReceiptResponse, PersonalDeductionResponse, TaxLevel,
    TaxResponse,
};

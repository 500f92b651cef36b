pub mod discrepancies;
pub mod notice;
pub mod quality;
pub mod spreadsheet;

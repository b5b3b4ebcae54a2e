pub mod contract_llm;
pub mod db;
pub mod fixture_llm;
pub mod pdf_export;
pub mod storage;
pub mod text_extraction;

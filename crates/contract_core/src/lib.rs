pub mod assistant;
pub mod contracts;
pub mod domain;
pub mod ports;
pub mod serde_ext;
pub mod upload;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use assistant::ContractAssistant;
pub use contracts::ContractService;
pub use domain::{
    Contract, ContractDraftRequest, ContractStatus, Document, ExtractedContract, Notification,
    Plan, RiskReport, User,
};
pub use ports::{
    AiDelegate, ContractExporter, DatabaseService, DocumentStorage, PortError, PortResult,
    TextExtractionService,
};
pub use upload::{UploadOutcome, UploadService};

//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::{
    pdf_export::LopdfContractExporter, storage::LocalFileStorage,
    text_extraction::PdfTextExtractor,
};
use crate::config::Config;
use contract_core::ports::{AiDelegate, ContractExporter, DatabaseService};
use contract_core::{ContractAssistant, ContractService, UploadService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseService>,
    pub assistant: ContractAssistant,
    pub contracts: ContractService,
    pub uploads: UploadService,
    pub exporter: Arc<dyn ContractExporter>,
}

impl AppState {
    /// Wires the services around a database and an AI delegate. Files go to
    /// the upload and export directories named in `config`.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseService>,
        delegate: Arc<dyn AiDelegate>,
    ) -> Self {
        let assistant = ContractAssistant::new(delegate, config.ai_timeout);
        let contracts = ContractService::new(db.clone(), assistant.clone());
        let uploads = UploadService::new(
            db.clone(),
            assistant.clone(),
            Arc::new(LocalFileStorage::new(config.upload_dir.clone())),
            Arc::new(PdfTextExtractor),
        );
        let exporter = Arc::new(LopdfContractExporter::new(config.export_dir.clone()));

        Self {
            config,
            db,
            assistant,
            contracts,
            uploads,
            exporter,
        }
    }
}

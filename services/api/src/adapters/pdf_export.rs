//! services/api/src/adapters/pdf_export.rs
//!
//! Renders a contract to an A4 PDF with `lopdf` and writes it to the export
//! directory as `contract_<id>.pdf`.

use std::path::PathBuf;

use async_trait::async_trait;
use contract_core::domain::Contract;
use contract_core::ports::{ContractExporter, PortError, PortResult};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::info;

//=========================================================================================
// Page Geometry
//=========================================================================================

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const TITLE_SIZE: i64 = 16;
const BODY_SIZE: i64 = 10;
const LEADING: i64 = 14;
const WRAP_COLUMNS: usize = 90;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

/// Writes contract PDFs into `export_dir`.
#[derive(Clone, Debug)]
pub struct LopdfContractExporter {
    export_dir: PathBuf,
}

impl LopdfContractExporter {
    pub fn new(export_dir: PathBuf) -> Self {
        Self { export_dir }
    }
}

#[async_trait]
impl ContractExporter for LopdfContractExporter {
    async fn export_contract(&self, contract: &Contract) -> PortResult<PathBuf> {
        let owned = contract.clone();
        let bytes = tokio::task::spawn_blocking(move || render_contract_pdf(&owned))
            .await
            .map_err(|e| PortError::Unexpected(format!("Task join error: {e}")))??;

        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .map_err(|e| PortError::Unexpected(format!("cannot create export directory: {e}")))?;
        let path = self.export_dir.join(format!("contract_{}.pdf", contract.id));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| PortError::Unexpected(format!("cannot write {}: {e}", path.display())))?;

        info!("Exported contract {} to {}", contract.id, path.display());
        Ok(path)
    }
}

//=========================================================================================
// Rendering
//=========================================================================================

fn party_line(label: &str, name: &str, role: &str, address: Option<&str>) -> String {
    match address {
        Some(address) if !address.trim().is_empty() => {
            format!("{label}: {name} ({role}), {address}")
        }
        _ => format!("{label}: {name} ({role})"),
    }
}

/// The header block printed above the contract text.
fn header_lines(c: &Contract) -> Vec<String> {
    let date = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
    vec![
        party_line("Party 1", &c.party_1_name, &c.party_1_role, c.party_1_address.as_deref()),
        party_line("Party 2", &c.party_2_name, &c.party_2_role, c.party_2_address.as_deref()),
        format!("Type: {}    Status: {}", c.contract_type, c.status),
        format!(
            "Duration: {}    Start: {}    End: {}",
            c.contract_duration,
            date(c.start_date),
            date(c.end_date)
        ),
        format!(
            "Payment: {} {} ({}, {})",
            c.payment_amount,
            c.currency.as_deref().unwrap_or("USD"),
            c.payment_type,
            c.payment_schedule
        ),
        String::new(),
    ]
}

/// Greedy word wrap on character count. Words longer than a line are split.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > columns {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(columns);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let current_len = current.chars().count();
            if current_len > 0 && current_len + 1 + word.len() > columns {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
        lines.push(current);
    }
    lines
}

/// Helvetica with WinAnsi encoding covers Latin-1; anything else prints as `?`.
fn encode_latin1(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn page_content(title: Option<&str>, lines: &[String]) -> Content {
    let mut ops = vec![Operation::new("BT", vec![])];
    let top = PAGE_HEIGHT - MARGIN;
    if let Some(title) = title {
        ops.push(Operation::new("Tf", vec!["F2".into(), TITLE_SIZE.into()]));
        ops.push(Operation::new("Td", vec![MARGIN.into(), top.into()]));
        ops.push(Operation::new("Tj", vec![Object::string_literal(encode_latin1(title))]));
        ops.push(Operation::new("Td", vec![0.into(), (-2 * LEADING).into()]));
    } else {
        ops.push(Operation::new("Td", vec![MARGIN.into(), top.into()]));
    }
    ops.push(Operation::new("Tf", vec!["F1".into(), BODY_SIZE.into()]));
    ops.push(Operation::new("TL", vec![LEADING.into()]));
    for line in lines {
        ops.push(Operation::new("Tj", vec![Object::string_literal(encode_latin1(line))]));
        ops.push(Operation::new("T*", vec![]));
    }
    ops.push(Operation::new("ET", vec![]));
    Content { operations: ops }
}

fn font(doc: &mut Document, base: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Renders the contract into PDF bytes: title, header block, then the
/// wrapped content over as many pages as needed.
pub fn render_contract_pdf(contract: &Contract) -> PortResult<Vec<u8>> {
    let pdf_err = |e: lopdf::Error| PortError::Unexpected(format!("PDF rendering failed: {e}"));

    let mut lines = header_lines(contract);
    lines.extend(wrap(&contract.content, WRAP_COLUMNS));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let body_font = font(&mut doc, "Helvetica");
    let title_font = font(&mut doc, "Helvetica-Bold");
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => body_font,
            "F2" => title_font,
        },
    });

    // The title takes two lines on the first page.
    let first_page = LINES_PER_PAGE.saturating_sub(2).max(1);
    let mut chunks: Vec<&[String]> = Vec::new();
    let (head, mut rest) = lines.split_at(first_page.min(lines.len()));
    chunks.push(head);
    while !rest.is_empty() {
        let (chunk, tail) = rest.split_at(LINES_PER_PAGE.min(rest.len()));
        chunks.push(chunk);
        rest = tail;
    }

    let mut kids: Vec<Object> = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        let title = (index == 0).then_some(contract.title.as_str());
        let content = page_content(title, chunk);
        let encoded = content.encode().map_err(pdf_err)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| pdf_err(e.into()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use contract_core::domain::ContractStatus;
    use uuid::Uuid;

    fn contract(content: &str) -> Contract {
        let now = Utc::now();
        Contract {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Service Agreement".to_string(),
            content: content.to_string(),
            contract_type: "SERVICE".to_string(),
            party_1_name: "Acme".to_string(),
            party_1_role: "Provider".to_string(),
            party_1_address: Some("1 Main St".to_string()),
            party_2_name: "Bob".to_string(),
            party_2_role: "Client".to_string(),
            party_2_address: None,
            contract_purpose: "Consulting".to_string(),
            scope_of_work: "Advice".to_string(),
            contract_duration: "12 months".to_string(),
            start_date: None,
            end_date: None,
            auto_renewal: false,
            payment_type: "FIXED".to_string(),
            payment_amount: "10000".to_string(),
            currency: Some("BRL".to_string()),
            payment_schedule: "MONTHLY".to_string(),
            confidentiality_clause: false,
            non_compete_clause: false,
            termination_conditions: None,
            status: ContractStatus::Draft,
            signed: false,
            signed_at: None,
            expires_at: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn wrap_respects_the_column_limit() {
        let lines = wrap("alpha beta gamma delta\n\nepsilon", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta", "", "epsilon"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn long_contracts_span_several_pages() {
        let body = "The parties agree to the following terms. ".repeat(600);
        let bytes = render_contract_pdf(&contract(&body)).unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[tokio::test]
    async fn export_writes_contract_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = LopdfContractExporter::new(dir.path().to_path_buf());
        let c = contract("Short body.");

        let path = exporter.export_contract(&c).await.unwrap();

        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(format!("contract_{}.pdf", c.id).as_str())
        );
        let written = tokio::fs::read(&path).await.unwrap();
        assert!(written.starts_with(b"%PDF"));
    }
}

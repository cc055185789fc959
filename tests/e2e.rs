//! End-to-end integration tests for fiscaldoc.
//!
//! The first group builds small PDFs in memory with lopdf and runs the whole
//! pipeline; text-layer documents never reach pdfium or tesseract, so these
//! run everywhere.
//!
//! The second group uses real scanned documents in `./test_cases/` and needs
//! pdfium and tesseract installed. It is gated behind `E2E_ENABLED`:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/opt/pdfium/lib cargo test --test e2e -- --nocapture

use fiscaldoc::{
    extract, extract_from_bytes, extract_sync, extract_to_file, ClassifierProfile, DocumentType,
    ExtractError, ExtractionConfig, ExtractionConfigBuilder, ExtractionMethod,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("fiscaldoc=debug")
        .try_init();
}

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Build a PDF with one page per entry; each line is drawn in its own text
/// object. A page with no lines has an empty content stream (no text layer).
fn build_pdf(pages: &[&[&str]]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new(
                "Td",
                vec![72.into(), (760 - 20 * i as i64).into()],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id =
            doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn write_pdf(dir: &Path, name: &str, pages: &[&[&str]]) -> PathBuf {
    let path = dir.join(name);
    build_pdf(pages).save(&path).unwrap();
    path
}

/// Config whose renderer can never bind, so the OCR branch ends at rendering.
fn no_renderer_config() -> ExtractionConfig {
    ExtractionConfig::builder()
        .pdfium_library_path("/nonexistent/pdfium/libpdfium.so")
        .build()
        .unwrap()
}

/// Config for real documents: pdfium from `PDFIUM_LIB_PATH` if set, else the
/// system library.
fn real_config() -> ExtractionConfigBuilder {
    match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(path) => ExtractionConfig::builder().pdfium_library_path(path),
        None => ExtractionConfig::builder(),
    }
}

/// Normalized text has no two adjacent whitespace characters and no edge
/// whitespace. A single line break between text objects is kept.
fn assert_normalized(text: &str) {
    let chars: Vec<char> = text.chars().collect();
    assert!(
        !chars
            .windows(2)
            .any(|w| w[0].is_whitespace() && w[1].is_whitespace()),
        "whitespace run in {text:?}"
    );
    assert_eq!(text, text.trim(), "edge whitespace in {text:?}");
}

// ── Text-layer documents (no native dependencies) ────────────────────────────

#[tokio::test]
async fn text_layer_nfse_is_extracted_directly() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(
        dir.path(),
        "nfse.pdf",
        &[&[
            "PREFEITURA DO MUNICIPIO DE SAO PAULO",
            "NFS-e   Nota Fiscal de Servicos Eletronica",
            "Valor total: R$ 1.250,00",
        ]],
    );

    // The renderer is unusable: success proves OCR was never attempted.
    let output = extract(&path, &no_renderer_config()).await.unwrap();

    assert_eq!(output.method, ExtractionMethod::Direct);
    assert_eq!(output.result.tipo, DocumentType::Nfse);
    assert!(output.result.conteudo.contains("NFS-e Nota Fiscal de Servicos"));
    assert!(
        output.result.conteudo.contains("PAULO\nNFS-e"),
        "text objects stay one line break apart: {:?}",
        output.result.conteudo
    );
    assert!(output.result.conteudo.contains("1.250,00"));
    assert_normalized(&output.result.conteudo);
    assert!(output.pages.is_empty());
    assert_eq!(output.stats.ocr_pages, 0);
}

#[tokio::test]
async fn pages_are_concatenated_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(
        dir.path(),
        "boleto.pdf",
        &[
            &["Recibo do Pagador", "Banco 001"],
            &["Ficha de Compensacao"],
            &["Autenticacao Mecanica"],
        ],
    );

    let output = extract(&path, &no_renderer_config()).await.unwrap();
    let text = &output.result.conteudo;

    assert_eq!(output.result.tipo, DocumentType::Boleto);
    let first = text.find("Recibo do Pagador").unwrap();
    let second = text.find("Ficha de Compensacao").unwrap();
    let third = text.find("Autenticacao Mecanica").unwrap();
    assert!(first < second && second < third, "out of order: {text:?}");
}

#[tokio::test]
async fn unmatched_text_is_desconhecido() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(dir.path(), "memo.pdf", &[&["Ata da reuniao de condominio"]]);

    let output = extract(&path, &no_renderer_config()).await.unwrap();
    assert_eq!(output.result.tipo, DocumentType::Unknown);

    let json = output.result.to_json_pretty().unwrap();
    assert!(json.contains("\"tipo\": \"Desconhecido\""), "got: {json}");
}

#[tokio::test]
async fn extended_profile_detects_tax_guides() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(
        dir.path(),
        "darf.pdf",
        &[&["MINISTERIO DA FAZENDA", "DARF", "Pagamento via Boleto"]],
    );

    let standard = extract(&path, &no_renderer_config()).await.unwrap();
    assert_eq!(standard.result.tipo, DocumentType::Boleto);

    let config = ExtractionConfig::builder()
        .pdfium_library_path("/nonexistent/pdfium/libpdfium.so")
        .classifier(ClassifierProfile::Extended)
        .build()
        .unwrap();
    let extended = extract(&path, &config).await.unwrap();
    assert_eq!(extended.result.tipo, DocumentType::Darf);
    assert_eq!(extended.result.conteudo, standard.result.conteudo);
}

#[tokio::test]
async fn extract_from_bytes_matches_file_extraction() {
    let mut doc = build_pdf(&[&["CT-e", "Conhecimento de Transporte Eletronico"]]);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();

    let output = extract_from_bytes(&bytes, &no_renderer_config())
        .await
        .unwrap();
    assert_eq!(output.result.tipo, DocumentType::Cte);
    assert_eq!(output.method, ExtractionMethod::Direct);
}

#[tokio::test]
async fn extract_to_file_writes_tipo_and_conteudo_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(dir.path(), "fatura.pdf", &[&["FATURA 10/2024", "Vencimento 15/11"]]);
    let out_path = dir.path().join("out/fatura.json");

    let output = extract_to_file(&path, &out_path, &no_renderer_config())
        .await
        .unwrap();

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(written, output.result.to_json_pretty().unwrap());
    assert!(written.starts_with("{\n    \"tipo\": \"Fatura\""), "got: {written}");

    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 2);
    assert_eq!(value["tipo"], "Fatura");
    assert!(!dir.path().join("out/fatura.json.tmp").exists());
}

#[test]
fn extract_sync_runs_without_an_outer_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(dir.path(), "nfe.pdf", &[&["DANFE", "NF-e 000.123.456"]]);

    let output = extract_sync(&path, &no_renderer_config()).unwrap();
    assert_eq!(output.result.tipo, DocumentType::Nfe);
}

// ── Failure paths ────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_file_is_an_input_error() {
    let err = extract("/no/such/dir/nota.pdf", &ExtractionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::FileNotFound { .. }));
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn scanned_page_without_renderer_is_no_text() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(dir.path(), "scan.pdf", &[&[]]);

    let err = extract(&path, &no_renderer_config()).await.unwrap_err();
    assert!(matches!(err, ExtractError::NoTextExtracted { .. }), "got: {err}");
}

#[tokio::test]
async fn corrupt_file_falls_through_to_no_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.pdf");
    std::fs::write(&path, b"%PDF-1.4\nthis is not really a pdf").unwrap();

    let err = extract(&path, &no_renderer_config()).await.unwrap_err();
    assert!(matches!(err, ExtractError::NoTextExtracted { .. }), "got: {err}");
}

#[tokio::test]
async fn failed_extraction_writes_no_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(dir.path(), "scan.pdf", &[&[]]);
    let out_path = dir.path().join("scan.json");

    let err = extract_to_file(&path, &out_path, &no_renderer_config())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::NoTextExtracted { .. }));
    assert!(!out_path.exists());
}

// ── Real documents (pdfium + tesseract) ──────────────────────────────────────

#[tokio::test]
async fn e2e_scanned_nfse_is_recognised() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("nfse_scan.pdf"));
    init_tracing();

    let config = real_config().build().unwrap();
    let output = extract(&path, &config).await.expect("extraction should succeed");

    assert_eq!(output.method, ExtractionMethod::Ocr);
    assert_eq!(output.result.tipo, DocumentType::Nfse);
    assert_normalized(&output.result.conteudo);
    assert!(output.stats.ocr_pages >= 1);
    println!("{}", output.result.to_json_pretty().unwrap());
}

#[tokio::test]
async fn e2e_scanned_pages_keep_document_order() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("boleto_scan_multipage.pdf"));

    let config = real_config().concurrency(4).build().unwrap();
    let output = extract(&path, &config).await.expect("extraction should succeed");

    let nums: Vec<usize> = output.pages.iter().map(|p| p.page_num).collect();
    let expected: Vec<usize> = (1..=nums.len()).collect();
    assert_eq!(nums, expected);
    assert_eq!(output.result.tipo, DocumentType::Boleto);
}

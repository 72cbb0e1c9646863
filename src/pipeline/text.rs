//! Text extraction: read the PDF text layer, transcribe scanned pages.
//!
//! Lab reports come in two flavours: digital exports with a text layer and
//! photocopies without one. Each page's text layer is read through pdfium;
//! a page whose layer is blank is rasterised and sent to the vision model
//! when `ocr_fallback` is on. With the fallback off a blank page contributes
//! nothing.

use crate::config::AnalysisConfig;
use crate::error::SoilError;
use crate::model::{CompletionRequest, LanguageModel};
use crate::pipeline::{encode, llm, postprocess, render};
use crate::prompts::{OCR_SYSTEM_PROMPT, OCR_USER_PROMPT};
use image::DynamicImage;
use std::path::Path;
use tracing::{debug, info};

/// One page as read from the PDF.
pub struct PageText {
    /// 1-based page number.
    pub page: usize,
    /// Text layer content, possibly empty.
    pub text: String,
    /// Rendered image, present only for blank pages when the fallback is on.
    pub scan: Option<DynamicImage>,
}

/// True if the page has no usable text layer.
pub fn needs_ocr(text: &str) -> bool {
    text.trim().is_empty()
}

/// Join page texts, each followed by a newline.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let mut out = String::new();
    for page in pages {
        out.push_str(page.as_ref());
        out.push('\n');
    }
    out
}

/// Read every page of the PDF at `pdf_path`.
pub async fn read_pages(
    pdf_path: &Path,
    config: &AnalysisConfig,
) -> Result<Vec<PageText>, SoilError> {
    let path = pdf_path.to_path_buf();
    let password = config.password.clone();
    let render_scans = config.ocr_fallback;
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;

    tokio::task::spawn_blocking(move || {
        read_pages_blocking(&path, password.as_deref(), render_scans, dpi, max_pixels)
    })
    .await
    .map_err(|e| SoilError::Internal(format!("Text extraction task panicked: {}", e)))?
}

fn read_pages_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    render_scans: bool,
    dpi: u32,
    max_pixels: u32,
) -> Result<Vec<PageText>, SoilError> {
    let pdfium = render::bind_pdfium()?;
    let document = render::open_document(&pdfium, pdf_path, password)?;
    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut out = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| SoilError::TextExtractionFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?
            .all();

        let scan = if render_scans && needs_ocr(&text) {
            debug!("Page {} has no text layer, rendering for OCR", idx + 1);
            Some(render::render_page(&page, idx, dpi, max_pixels)?)
        } else {
            None
        };

        out.push(PageText {
            page: idx + 1,
            text,
            scan,
        });
    }
    Ok(out)
}

/// Extract the document text, transcribing scanned pages with `model`.
///
/// A failed transcription is fatal: the report cannot be trusted with a
/// page silently missing.
pub async fn extract_text(
    pdf_path: &Path,
    model: &dyn LanguageModel,
    config: &AnalysisConfig,
) -> Result<String, SoilError> {
    let pages = read_pages(pdf_path, config).await?;
    let mut texts = Vec::with_capacity(pages.len());
    let mut transcribed = 0usize;

    for page in pages {
        match page.scan {
            Some(ref image) => {
                texts.push(transcribe_page(model, page.page, image, config).await?);
                transcribed += 1;
            }
            None => texts.push(page.text),
        }
    }

    let text = join_pages(&texts);
    info!(
        "Extracted {} chars from {} pages ({} via OCR)",
        text.len(),
        texts.len(),
        transcribed
    );
    Ok(text)
}

async fn transcribe_page(
    model: &dyn LanguageModel,
    page: usize,
    image: &DynamicImage,
    config: &AnalysisConfig,
) -> Result<String, SoilError> {
    let data = encode::encode_page(image).map_err(|e| SoilError::RasterisationFailed {
        page,
        detail: format!("Image encoding failed: {}", e),
    })?;
    let request = CompletionRequest::new(format!("ocr-page-{page}"), OCR_SYSTEM_PROMPT, OCR_USER_PROMPT)
        .images(vec![data])
        .temperature(config.temperatures.ocr)
        .max_tokens(config.max_tokens);
    let completion = llm::complete(model, &request, config).await?;
    Ok(postprocess::clean_model_text(&completion.content))
}

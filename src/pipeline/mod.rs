//! Pipeline stages for soil-report analysis.
//!
//! Each submodule implements one step. The orchestration (timing, progress
//! events, the summary fan-out) lives in [`crate::analyze`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ extract ──▶ params::aggregate ──▶ interpret ──▶ recommend
//! (path/URL) (pdfium   (LLM →       (canonical map)      (LLM)       (LLM + RAG)
//!            + OCR)     JSON)                                              │
//!                                                                          ▼
//!                                    summarize (wo ∥ bm) ◀── report (Markdown)
//! ```
//!
//! 1. [`input`]:     canonicalise a path, URL or byte buffer to a local PDF
//! 2. [`text`]:      read the text layer; [`render`] + [`encode`] feed
//!    scanned pages to the vision model
//! 3. [`extract`]:   raw parameter JSON, never fatal
//! 4. [`interpret`]: agronomic reading of the canonical map
//! 5. [`recommend`]: amendments and crops, with retrieved context
//! 6. [`report`]:    Markdown assembly
//! 7. [`summarize`]: two regional summaries as concurrent tasks
//!
//! [`llm`] is the only place model calls are retried and timed out;
//! [`postprocess`] cleans every model answer.

pub mod encode;
pub mod extract;
pub mod input;
pub mod interpret;
pub mod llm;
pub mod postprocess;
pub mod recommend;
pub mod render;
pub mod report;
pub mod summarize;
pub mod text;

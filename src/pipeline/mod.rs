//! Pipeline stages for fiscal document extraction.
//!
//! Each submodule implements exactly one step. The stages that wrap an
//! external collaborator (text layer, renderer, OCR engine) sit behind a
//! trait so the orchestrator can be driven with fakes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text_layer ──(empty?)──▶ render ──▶ preprocess ──▶ ocr
//!                │                                              │
//!                └────────────▶ normalize ◀─────────────────────┘
//! ```
//!
//! 1. [`input`]      - validate the user-supplied path
//! 2. [`text_layer`] - embedded text via lopdf; empty result triggers OCR
//! 3. [`render`]     - rasterise pages via pdfium in `spawn_blocking`
//! 4. [`preprocess`] - grayscale + Otsu binarization
//! 5. [`ocr`]        - concurrent per-page recognition, joined in page order
//! 6. [`normalize`]  - accent, whitespace and currency-break cleanup

pub mod input;
pub mod normalize;
pub mod ocr;
pub mod preprocess;
pub mod render;
pub mod text_layer;

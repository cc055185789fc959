//! Text normalization applied to every extracted text before classification.
//!
//! Rules (applied in order):
//! 1. Canonical decomposition (NFD), dropping every combining mark
//!    (`"Serviços"` → `"Servicos"`)
//! 2. Join a currency sign split from its amount by a line break
//!    (`"R$\n 150,00"` → `"R$150,00"`)
//! 3. Collapse runs of two or more whitespace characters into one space
//! 4. Trim leading and trailing whitespace
//!
//! Diacritics go first so that a stray combining mark between two spaces
//! cannot leave a whitespace run behind. The currency rule runs before the
//! whitespace collapse, which would otherwise turn `"R$\n "` into `"R$ "`.
//!
//! The result contains no combining marks, no whitespace runs, and
//! `normalize(normalize(x)) == normalize(x)`.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static RE_CURRENCY_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"R\$\s*\n\s*").unwrap());

static RE_WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Normalize raw extracted text. Never fails; `""` maps to `""`.
pub fn normalize(raw: &str) -> String {
    let s = strip_diacritics(raw);
    let s = join_currency_breaks(&s);
    let s = collapse_whitespace(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip diacritics ─────────────────────────────────────────────────

fn strip_diacritics(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

// ── Rule 2: Currency line breaks ─────────────────────────────────────────────

fn join_currency_breaks(input: &str) -> String {
    RE_CURRENCY_BREAK.replace_all(input, "R$").into_owned()
}

// ── Rule 3: Collapse whitespace ──────────────────────────────────────────────

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE_RUN.replace_all(input, " ").into_owned()
}

//! Fiscal document classification by ordered pattern matching.
//!
//! A [`Classifier`] holds an immutable, ordered list of
//! `(DocumentType, Regex)` rules and returns the **first** type whose pattern
//! matches anywhere in the text. Declaration order is the tie-break: NFS-e is
//! declared before NF-e, and the tax-guide types (DARF, FGTS, GPS) of the
//! extended profile are declared before every invoice type.
//!
//! Rules run on normalized text (see [`crate::pipeline::normalize`]), so the
//! patterns accept the unaccented spelling as well as the accented one.

use crate::config::ClassifierProfile;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Brazilian fiscal document categories.
///
/// Serialised with the labels used in the JSON output (`"NF-e"`, `"Boleto"`,
/// `"Desconhecido"`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    /// Nota Fiscal Eletrônica (goods).
    #[serde(rename = "NF-e")]
    Nfe,
    /// Nota Fiscal de Serviços Eletrônica.
    #[serde(rename = "NFS-e")]
    Nfse,
    /// Nota Fiscal ao Consumidor Eletrônica.
    #[serde(rename = "NFC-e")]
    Nfce,
    /// Nota Fiscal de Energia Elétrica Eletrônica.
    #[serde(rename = "NF3-e")]
    Nf3e,
    /// Conhecimento de Transporte Eletrônico.
    #[serde(rename = "CT-e")]
    Cte,
    #[serde(rename = "Boleto")]
    Boleto,
    #[serde(rename = "Fatura")]
    Fatura,
    /// Documento de Arrecadação de Receitas Federais.
    #[serde(rename = "DARF")]
    Darf,
    /// Guia do Fundo de Garantia do Tempo de Serviço.
    #[serde(rename = "FGTS")]
    Fgts,
    /// Guia da Previdência Social.
    #[serde(rename = "GPS")]
    Gps,
    /// No rule matched.
    #[serde(rename = "Desconhecido")]
    Unknown,
}

impl DocumentType {
    /// The output label for this type.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Nfe => "NF-e",
            DocumentType::Nfse => "NFS-e",
            DocumentType::Nfce => "NFC-e",
            DocumentType::Nf3e => "NF3-e",
            DocumentType::Cte => "CT-e",
            DocumentType::Boleto => "Boleto",
            DocumentType::Fatura => "Fatura",
            DocumentType::Darf => "DARF",
            DocumentType::Fgts => "FGTS",
            DocumentType::Gps => "GPS",
            DocumentType::Unknown => "Desconhecido",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Rule tables ──────────────────────────────────────────────────────────────

/// Invoice and fiscal-note rules, in precedence order.
pub const STANDARD_RULES: &[(DocumentType, &str)] = &[
    (DocumentType::Nfse, r"\bNFS-e\b|Nota Fiscal de Servi[cç]os"),
    (DocumentType::Nfe, r"\bNF-e\b|Nota Fiscal Eletr[oô]nica\b"),
    (DocumentType::Nfce, r"\bNFC-e\b|Nota Fiscal ao Consumidor\b"),
    (DocumentType::Nf3e, r"\bNF3-e\b"),
    (DocumentType::Cte, r"\bCT-e\b|Conhecimento de Transporte\b"),
    (DocumentType::Boleto, r"\bBoleto\b|Recibo do Pagador"),
    (DocumentType::Fatura, r"\bFatura\b|Nota de Pagamento\b"),
];

/// Tax-guide rules. The extended profile checks these before [`STANDARD_RULES`].
pub const TAX_GUIDE_RULES: &[(DocumentType, &str)] = &[
    (
        DocumentType::Darf,
        r"Documento de Arrecada[cç][aã]o.*Receitas Federais|DARF",
    ),
    (DocumentType::Fgts, r"FGTS|GFD|Fundo de Garantia"),
    (
        DocumentType::Gps,
        r"GPS|Guia.*Previd[eê]ncia Social|Previd[eê]ncia.*Social.*Guia",
    ),
];

static STANDARD: Lazy<Classifier> = Lazy::new(|| {
    Classifier::from_rules(STANDARD_RULES.iter().copied()).expect("standard rules compile")
});

static EXTENDED: Lazy<Classifier> = Lazy::new(|| {
    Classifier::from_rules(TAX_GUIDE_RULES.iter().chain(STANDARD_RULES).copied())
        .expect("extended rules compile")
});

// ── Classifier ───────────────────────────────────────────────────────────────

/// Ordered, case-insensitive pattern classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<(DocumentType, Regex)>,
}

impl Classifier {
    /// Build a classifier from `(type, pattern)` pairs. Order is preserved.
    pub fn from_rules<'a, I>(rules: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = (DocumentType, &'a str)>,
    {
        let rules = rules
            .into_iter()
            .map(|(doc_type, pattern)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (doc_type, re))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// The shared classifier for a profile. Compiled once per process.
    pub fn for_profile(profile: ClassifierProfile) -> &'static Classifier {
        match profile {
            ClassifierProfile::Standard => &STANDARD,
            ClassifierProfile::Extended => &EXTENDED,
        }
    }

    /// Return the first type whose pattern matches, or [`DocumentType::Unknown`].
    pub fn classify(&self, text: &str) -> DocumentType {
        self.rules
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(doc_type, _)| *doc_type)
            .unwrap_or(DocumentType::Unknown)
    }

    /// Types in the order they are checked.
    #[cfg(test)]
    fn order(&self) -> impl Iterator<Item = DocumentType> + '_ {
        self.rules.iter().map(|(doc_type, _)| *doc_type)
    }
}

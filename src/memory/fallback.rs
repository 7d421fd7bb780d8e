// src/memory/fallback.rs
// Keyword-based canned answers for when retrieval or generation can't be used

use crate::memory::query::SourceRef;
use serde::Serialize;
use tracing::debug;

/// Topics the fallback responder knows how to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackTopic {
    Registration,
    SatelliteData,
    Download,
    General,
}

impl FallbackTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::SatelliteData => "satellite-data",
            Self::Download => "download",
            Self::General => "general",
        }
    }
}

/// One entry of the dispatch table. An empty keyword list matches any query.
pub struct FallbackRule {
    pub topic: FallbackTopic,
    pub keywords: &'static [&'static str],
    pub source: &'static str,
    pub relevance: f32,
    answer: fn(&str) -> String,
}

impl FallbackRule {
    /// `lowered` must already be lower-cased.
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.is_empty() || self.keywords.iter().any(|k| lowered.contains(k))
    }

    pub fn answer(&self, query: &str) -> String {
        (self.answer)(query)
    }
}

/// Evaluated top to bottom; the first matching rule wins.
pub const FALLBACK_RULES: &[FallbackRule] = &[
    FallbackRule {
        topic: FallbackTopic::Registration,
        keywords: &["registration", "register"],
        source: "MOSDAC Registration Guide",
        relevance: 0.9,
        answer: registration_answer,
    },
    FallbackRule {
        topic: FallbackTopic::SatelliteData,
        keywords: &["insat", "satellite"],
        source: "MOSDAC Satellite Data Catalog",
        relevance: 0.8,
        answer: satellite_answer,
    },
    FallbackRule {
        topic: FallbackTopic::Download,
        keywords: &["download", "data"],
        source: "MOSDAC Data Download Guide",
        relevance: 0.8,
        answer: download_answer,
    },
    FallbackRule {
        topic: FallbackTopic::General,
        keywords: &[],
        source: "MOSDAC Help Center",
        relevance: 0.7,
        answer: general_answer,
    },
];

/// Canned answer with its synthetic citation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackResponse {
    pub topic: FallbackTopic,
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Pick the rule for a query.
pub fn select_rule(query: &str) -> &'static FallbackRule {
    let lowered = query.to_lowercase();
    FALLBACK_RULES
        .iter()
        .find(|rule| rule.matches(&lowered))
        .unwrap_or(&FALLBACK_RULES[FALLBACK_RULES.len() - 1])
}

pub fn classify(query: &str) -> FallbackTopic {
    select_rule(query).topic
}

/// Answer a query from the static topic table.
pub fn fallback(query: &str) -> FallbackResponse {
    let rule = select_rule(query);
    debug!(topic = rule.topic.as_str(), "Answering from fallback table");
    FallbackResponse {
        topic: rule.topic,
        answer: rule.answer(query),
        sources: vec![SourceRef {
            source: rule.source.to_string(),
            relevance: rule.relevance,
        }],
    }
}

fn registration_answer(_query: &str) -> String {
    "To register on the MOSDAC portal:\n\
     1. Open https://www.mosdac.gov.in and choose \"Sign Up\".\n\
     2. Fill in your name, organisation, e-mail address and intended use of the data.\n\
     3. Confirm your e-mail address using the verification link.\n\
     4. Wait for account approval before ordering restricted products.\n\n\
     For account problems, use the \"Contact Us\" page of the portal."
        .to_string()
}

fn satellite_answer(_query: &str) -> String {
    "MOSDAC archives data from ISRO's meteorological and oceanographic missions, including:\n\
     - INSAT-3D and INSAT-3DR imager and sounder products\n\
     - SCATSAT-1 ocean surface winds\n\
     - Oceansat and Megha-Tropiques products\n\n\
     The satellite catalog on the portal lists the products, processing levels and time coverage of each mission."
        .to_string()
}

fn download_answer(_query: &str) -> String {
    "To download data from MOSDAC:\n\
     1. Log in with your registered account.\n\
     2. Search the catalog by satellite, sensor, product and date range.\n\
     3. Add the products to your cart and submit the order.\n\
     4. Fetch the files from the link sent to you once the order is processed.\n\n\
     Some near-real-time products can also be browsed without placing an order."
        .to_string()
}

fn general_answer(query: &str) -> String {
    format!(
        "Thank you for your question: \"{}\".\n\n\
         I could not find a specific answer in the MOSDAC knowledge base. You can:\n\
         - check the FAQ section of the MOSDAC portal\n\
         - rephrase the question with the satellite, product or task you need help with\n\
         - contact the MOSDAC Help Center for further assistance",
        query
    )
}

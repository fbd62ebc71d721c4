//! Heuristic extraction of vendor, date and total from OCR'd receipt text.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref DATE_RE: Regex = Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap();
    static ref NUMBER_RE: Regex = Regex::new(r"\d+(?:\.\d{1,2})?").unwrap();
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReceiptFields {
    pub vendor: Option<String>,
    /// As printed, `DD/MM/YYYY`.
    pub date: Option<String>,
    pub total: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ReceiptParser {
    amount_re: Regex,
}

impl ReceiptParser {
    pub fn new(currency_markers: &[&str]) -> anyhow::Result<Self> {
        anyhow::ensure!(!currency_markers.is_empty(), "no currency markers configured");
        // Longest first so "Rs." wins over "Rs".
        let mut markers: Vec<&str> = currency_markers.to_vec();
        markers.sort_by_key(|m| std::cmp::Reverse(m.len()));
        let alternation = markers
            .iter()
            .map(|m| regex::escape(m))
            .collect::<Vec<_>>()
            .join("|");
        let amount_re = Regex::new(&format!(r"(?:{})\s?(\d+(?:\.\d{{1,2}})?)", alternation))?;
        Ok(Self { amount_re })
    }

    /// Never fails; fields that cannot be found are `None`.
    pub fn parse(&self, text: &str) -> ReceiptFields {
        let lines: Vec<&str> = text
            .split('\n')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let vendor = lines.first().map(|l| l.to_string());
        let date = DATE_RE.find(text).map(|m| m.as_str().to_string());

        let mut amounts: Vec<f64> = lines
            .iter()
            .flat_map(|&line| self.amount_re.captures_iter(line))
            .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
            .collect();

        // No currency marker anywhere: take every number in the raw text,
        // including the digits of a printed date.
        if amounts.is_empty() {
            amounts = NUMBER_RE
                .find_iter(text)
                .filter_map(|m| m.as_str().parse::<f64>().ok())
                .collect();
        }

        let total = amounts.into_iter().reduce(f64::max);

        ReceiptFields {
            vendor,
            date,
            total,
        }
    }
}

//! Decoding of the listing and detail pages.
//!
//! Pages are parsed with `scraper`; the listing is the first table carrying
//! header cells and the detail value sits in the cell after its label.

use crate::core::error::{Error, Result};
use crate::core::instrument::ListingRow;
use crate::core::source::DocumentParser;
use crate::core::text::fold_diacritics;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

const PRICE_TO_BOOK: &str = "P/VP";

/// Labels of the detail cell holding the 12-month distribution per unit.
const DISTRIBUTION_LABELS: [&str; 2] = ["DIV/COTA", "DIVIDENDO/COTA"];

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlTableParser;

impl DocumentParser for HtmlTableParser {
    fn parse_listing(&self, document: &str) -> Result<Vec<ListingRow>> {
        let html = Html::parse_document(document);
        let (table_sel, th, tr, td) = (
            selector("table")?,
            selector("th")?,
            selector("tr")?,
            selector("td")?,
        );

        let table = html
            .select(&table_sel)
            .find(|table| table.select(&th).next().is_some())
            .ok_or_else(|| Error::parse("listing table not found; the page layout may have changed"))?;

        let headers: Vec<String> = table
            .select(&th)
            .map(inner_text)
            .filter(|h| !h.is_empty())
            .map(|h| normalize_header(&h))
            .collect();
        if headers.is_empty() {
            return Err(Error::parse("listing table has no headers"));
        }

        let rows: Vec<ListingRow> = table
            .select(&tr)
            .filter_map(|row| {
                let cells: Vec<String> = row.select(&td).map(inner_text).collect();
                if cells.is_empty() {
                    return None;
                }
                let fields: HashMap<&str, String> =
                    headers.iter().map(String::as_str).zip(cells).collect();
                Some(to_row(&fields))
            })
            .collect();

        debug!("Parsed {} listing rows with headers {:?}", rows.len(), headers);
        Ok(rows)
    }

    fn parse_detail(&self, document: &str) -> Result<Option<Decimal>> {
        let html = Html::parse_document(document);
        let td = selector("td")?;
        let cells: Vec<String> = html.select(&td).map(inner_text).collect();

        let value = cells
            .iter()
            .position(|cell| {
                let label = normalize_header(&cell.replace('?', "")).replace('_', "");
                DISTRIBUTION_LABELS.contains(&label.as_str())
            })
            .and_then(|index| cells.get(index + 1))
            .map(|cell| parse_decimal_br(cell));

        debug!("Detail distribution value: {:?}", value);
        Ok(value)
    }
}

fn to_row(fields: &HashMap<&str, String>) -> ListingRow {
    let text = |key: &str| field(fields, key).unwrap_or_default().to_string();
    let number = |key: &str| parse_decimal_br(field(fields, key).unwrap_or_default());

    ListingRow {
        identifier: field(fields, "PAPEL")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        category: text("SEGMENTO"),
        price: number("COTACAO"),
        ffo_yield: number("FFO_YIELD"),
        dividend_yield: number("DIVIDEND_YIELD"),
        price_to_book: number(PRICE_TO_BOOK),
        market_value: number("VALOR_DE_MERCADO"),
        liquidity: number("LIQUIDEZ"),
        property_count: parse_int_br(field(fields, "QTD_DE_IMOVEIS").unwrap_or_default()),
        price_per_m2: number("PRECO_DO_M2"),
        rent_per_m2: number("ALUGUEL_POR_M2"),
        cap_rate: number("CAP_RATE"),
        vacancy: number("VACANCIA_MEDIA"),
    }
}

/// Looks a column up by normalized header. The price-to-book column is also
/// matched loosely since its header varies between page versions.
fn field<'a>(fields: &'a HashMap<&str, String>, key: &str) -> Option<&'a str> {
    if let Some(value) = fields.get(key) {
        return Some(value);
    }
    if key == PRICE_TO_BOOK {
        return fields
            .iter()
            .find(|(header, _)| header.contains(PRICE_TO_BOOK) || **header == "PVP")
            .map(|(_, value)| value.as_str());
    }
    None
}

/// Uppercase, accent-free header with spaces replaced by underscores.
pub fn normalize_header(header: &str) -> String {
    fold_diacritics(&header.trim().to_uppercase())
        .replace('²', "2")
        .replace(' ', "_")
}

/// Parses a pt-BR formatted number such as `1.234,56` or `12,5%`.
/// Empty, dash and unparseable values read as zero.
pub fn parse_decimal_br(input: &str) -> Decimal {
    let s = input.trim().replace('%', "");
    let s = s.trim();
    if s.is_empty() || s == "-" || s == "—" {
        return Decimal::ZERO;
    }
    let normalized = s.replace('.', "").replace(',', ".");
    Decimal::from_str(&normalized).unwrap_or(Decimal::ZERO)
}

/// Parses a pt-BR integer; values with a fractional part read as zero.
pub fn parse_int_br(input: &str) -> i64 {
    let value = parse_decimal_br(input);
    if !value.fract().is_zero() {
        return 0;
    }
    value.to_i64().unwrap_or(0)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::parse(format!("invalid selector {css}: {e:?}")))
}

/// Text content of an element with whitespace collapsed. Text on either side
/// of a nested tag is kept as separate words.
fn inner_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

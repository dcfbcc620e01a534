use crate::models::{BasicRecord, PropertyType};
use crate::scrapers::error::ScrapeError;
use crate::scrapers::markup::{selector, MarkupNode};
use crate::scrapers::normalize::{capitalize, normalize_number, SQUARE_METRES};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// Card titles that mean the listing is a house; everything else is an apartment
pub const HOUSE_SUBTYPES: &[&str] = &[
    "Maison",
    "Bungalow",
    "Chalet",
    "Ferme",
    "Château",
    "Maison de campagne",
    "Bien exceptionnel",
    "Immeuble à appartements",
    "Immeuble mixte",
    "Maison bel-étage",
    "Maison de maître",
    "Villa",
    "Manoir",
    "Pavillon",
    "Autres biens",
];

const ROOMS_MARKER: &str = "ch.";
const AREA_SEPARATOR: char = '\u{00b7}';

static CONTAINER_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector("div#searchResults ul#main-content"));
static RESULTS_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector("div#searchResults ul#main-content > div li"));
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("a.card__title-link"));
static PRICE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("p.card--result__price"));
static INFO_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("div.card__informations"));
static PROPERTY_INFO_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector("p.card__information--property"));
static LOCALITY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector("p.card__information.card--results__information--locality"));

static LOCALITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4,5})\s+(.*)").expect("Failed to compile locality regex")
});

/// Parse every card on a search-results page.
///
/// Entries without a title link are not cards (ads, banners) and are skipped.
/// Card `href`s are resolved against `page_url`.
pub fn extract_cards(html: &str, page_url: &str) -> Result<Vec<BasicRecord>, ScrapeError> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    if root.find_first(&CONTAINER_SELECTOR).is_none() {
        return Err(ScrapeError::ResultsNotFound {
            url: page_url.to_string(),
        });
    }

    let base = Url::parse(page_url).ok();
    let records = root
        .find_all(&RESULTS_SELECTOR)
        .into_iter()
        .filter(|entry| entry.find_first(&TITLE_SELECTOR).is_some())
        .map(|card| {
            let mut record = extract_card(card);
            record.url = record.url.map(|href| resolve(base.as_ref(), href));
            debug!("Parsed card: {:?}", record.url);
            record
        })
        .collect();

    Ok(records)
}

/// Parse one card into a `BasicRecord`.
///
/// Missing sub-elements leave their fields `None`. A card without a title
/// link yields a record with no `url`, which callers must drop.
pub fn extract_card(card: ElementRef<'_>) -> BasicRecord {
    let mut record = BasicRecord::default();

    if let Some(title) = card.find_first(&TITLE_SELECTOR) {
        let title_text = title.text_content();
        record.url = title.attr("href").map(str::to_string);
        record.property_type = Some(classify(&title_text));
        record.sub_property_type = Some(title_text);
    }

    if let Some(price) = card.find_first(&PRICE_SELECTOR) {
        record.price = normalize_number(&price.text_content());
    }

    if let Some(info) = card.find_first(&INFO_SELECTOR) {
        if let Some(property_info) = info.find_first(&PROPERTY_INFO_SELECTOR) {
            let text = property_info.text_joined(" ");
            record.rooms = rooms_token(&text);
            record.area = area_token(&text);
        }

        if let Some(locality) = info.find_first(&LOCALITY_SELECTOR) {
            let (postal_code, locality) = split_locality(&locality.text_content());
            record.postal_code = postal_code;
            record.locality = Some(locality);
        }
    }

    record
}

fn classify(title: &str) -> PropertyType {
    if HOUSE_SUBTYPES.contains(&title) {
        PropertyType::House
    } else {
        PropertyType::Apartment
    }
}

/// "3 ch. · 120 m²" -> "3"
fn rooms_token(text: &str) -> Option<String> {
    let (before, _) = text.split_once(ROOMS_MARKER)?;
    Some(before.trim().to_string())
}

/// "3 ch. · 120 m²" -> "120"
fn area_token(text: &str) -> Option<String> {
    if !text.contains(SQUARE_METRES) {
        return None;
    }
    let last = text.rsplit(AREA_SEPARATOR).next().unwrap_or(text);
    let area = last.split(SQUARE_METRES).next().unwrap_or(last);
    Some(area.trim().to_string())
}

/// "1000 BRUXELLES" -> (Some("1000"), "Bruxelles")
fn split_locality(text: &str) -> (Option<String>, String) {
    match LOCALITY_RE.captures(text) {
        Some(caps) => (Some(caps[1].to_string()), capitalize(&caps[2])),
        None => (None, capitalize(text)),
    }
}

fn resolve(base: Option<&Url>, href: String) -> String {
    base.and_then(|base| base.join(&href).ok())
        .map(String::from)
        .unwrap_or(href)
}

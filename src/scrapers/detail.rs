use crate::models::DetailRecord;
use crate::scrapers::error::ScrapeError;
use crate::scrapers::markup::{selector, MarkupNode};
use crate::scrapers::sections::{
    exterior_info, general_info, installations_info, interior_info, overview_info,
};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

static CONTAINER_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector("div.container.container--body"));
static SECTION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("div.text-block"));
static SECTION_TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector("h2.text-block__title"));

/// Titled sections of a detail page that carry listing attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    General,
    Interior,
    Exterior,
    Installations,
    Overview,
}

impl Section {
    /// Exact title match; other titles are not ours to read
    pub fn from_title(title: &str) -> Option<Self> {
        match title {
            "Général" => Some(Self::General),
            "Intérieur" => Some(Self::Interior),
            "Extérieur" => Some(Self::Exterior),
            "Installations" => Some(Self::Installations),
            "Aperçu" => Some(Self::Overview),
            _ => None,
        }
    }
}

/// Read every known section of a detail page into a `DetailRecord`.
///
/// Fails only when the body container is missing. Sections with unknown
/// titles are skipped.
pub fn extract_detail(html: &str, url: &str) -> Result<DetailRecord, ScrapeError> {
    let document = Html::parse_document(html);
    let container = document
        .root_element()
        .find_first(&CONTAINER_SELECTOR)
        .ok_or_else(|| ScrapeError::ContainerNotFound {
            url: url.to_string(),
        })?;

    let mut detail = DetailRecord::default();

    for section in container.find_all(&SECTION_SELECTOR) {
        let Some(title) = section.find_first(&SECTION_TITLE_SELECTOR) else {
            continue;
        };
        let title = title.text_content();
        let Some(kind) = Section::from_title(&title) else {
            debug!("Skipping section {:?} on {}", title, url);
            continue;
        };

        match kind {
            Section::General => detail.general = general_info(section),
            Section::Interior => detail.interior = interior_info(section),
            Section::Exterior => detail.exterior = exterior_info(section),
            Section::Installations => detail.installations = installations_info(section),
            Section::Overview => detail.overview = overview_info(section),
        }
    }

    Ok(detail)
}

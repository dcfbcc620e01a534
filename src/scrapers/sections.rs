use crate::models::{
    ExteriorInfo, GeneralInfo, InstallationsInfo, InteriorInfo, KitchenType, OverviewInfo,
};
use crate::scrapers::markup::{selector, MarkupNode};
use crate::scrapers::normalize::{
    extract_leading_surface, first_integer, parse_boolean, NO, SQUARE_METRES, YES,
};
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

static CLASSIFIED_ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector("tr.classified-table__row"));
static ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static LABEL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("th"));
static VALUE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static OVERVIEW_ITEM_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector("div.overview__item"));

const FIRE_LABELS: &[&str] = &["feu", "foyer", "cheminée"];
const SURFACE_QUALIFIERS: &[&str] = &["habitable", "terrain"];

/// A table row read as (lowercased label, value)
struct Row {
    label: String,
    value: String,
}

/// Rows lacking a label or value cell are skipped
fn rows(section: ElementRef<'_>, row_selector: &Selector) -> Vec<Row> {
    section
        .find_all(row_selector)
        .into_iter()
        .filter_map(|row| {
            let label = row.find_first(&LABEL_SELECTOR)?.text_content().to_lowercase();
            let value = row.find_first(&VALUE_SELECTOR)?.text_content();
            Some(Row { label, value })
        })
        .collect()
}

/// "Général": facade count and building condition
pub fn general_info(section: ElementRef<'_>) -> GeneralInfo {
    let mut info = GeneralInfo::default();
    for row in rows(section, &CLASSIFIED_ROW_SELECTOR) {
        if row.label.contains("façade") && row.label.contains("nombre") {
            info.facades = row.value.parse().ok();
        } else if row.label.contains("état du bâtiment") {
            info.building_state = Some(row.value);
        }
    }
    info
}

/// "Intérieur": furnished, open fire and kitchen equipment
pub fn interior_info(section: ElementRef<'_>) -> InteriorInfo {
    let mut info = InteriorInfo::default();
    for row in rows(section, &CLASSIFIED_ROW_SELECTOR) {
        let value = row.value.to_lowercase();
        if row.label.contains("meublé") {
            info.furnished = Some(YES.iter().any(|yes| value.contains(yes)));
        } else if FIRE_LABELS.iter().any(|label| row.label.contains(label)) {
            let count = value.parse::<u32>().ok();
            info.open_fire =
                Some(YES.iter().any(|yes| value.contains(yes)) || count.is_some_and(|n| n > 0));
        } else if row.label.contains("cuisine") {
            if let Some(kitchen) = kitchen_type(&value) {
                info.kitchen_type = Some(kitchen);
            }
        }
    }
    info
}

/// Substring priority: "semi", then "équipée", then a negation
fn kitchen_type(value: &str) -> Option<KitchenType> {
    if value.contains("semi") {
        Some(KitchenType::SemiEquipped)
    } else if value.contains("équipée") {
        Some(KitchenType::Equipped)
    } else if value.contains("pas") || value.contains("non") {
        Some(KitchenType::NotEquipped)
    } else {
        None
    }
}

/// "Extérieur": terrace and garden, each with an optional surface
pub fn exterior_info(section: ElementRef<'_>) -> ExteriorInfo {
    let mut info = ExteriorInfo::default();
    for row in rows(section, &ROW_SELECTOR) {
        let value = row.value.to_lowercase();
        if row.label.contains("terrasse") {
            info.terrace = parse_boolean(&value, YES, NO);
            info.terrace_surface = first_integer(&value);
        } else if row.label.contains("jardin") {
            // A stated surface implies a garden even without "oui"
            info.garden = if extract_leading_surface(&value, SQUARE_METRES).is_some() {
                Some(true)
            } else {
                parse_boolean(&value, YES, NO)
            };
            info.garden_surface = first_integer(&value);
        }
    }
    info
}

/// "Installations": only the first pool row counts
pub fn installations_info(section: ElementRef<'_>) -> InstallationsInfo {
    let swimming_pool = rows(section, &ROW_SELECTOR)
        .into_iter()
        .find(|row| row.label.contains("piscine"))
        .map(|row| YES.iter().any(|yes| row.value.to_lowercase().contains(yes)));
    InstallationsInfo { swimming_pool }
}

/// "Aperçu": livable and land surfaces summed into `land_surface`.
///
/// The section being present means a total of at least 0; an overflowing
/// sum is unknown.
pub fn overview_info(section: ElementRef<'_>) -> OverviewInfo {
    let land_surface = section
        .find_all(&OVERVIEW_ITEM_SELECTOR)
        .into_iter()
        .map(|item| item.text_content().to_lowercase())
        .filter(|text| SURFACE_QUALIFIERS.iter().any(|q| text.contains(q)))
        .filter_map(|text| extract_leading_surface(&text, SQUARE_METRES))
        .try_fold(0u32, u32::checked_add);
    OverviewInfo { land_surface }
}

use serde::{Deserialize, Serialize};

/// Coarse property category derived from the card title
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PropertyType {
    House,
    Apartment,
}

/// Kitchen equipment level as stated on the detail page
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum KitchenType {
    Equipped,
    #[serde(rename = "Semi-equipped")]
    SemiEquipped,
    #[serde(rename = "Not-equipped")]
    NotEquipped,
}

/// Identity and summary fields read from a search-result card.
///
/// `url` is `None` only when the card had no title link; such a record is
/// dropped by the crawler and never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BasicRecord {
    pub url: Option<String>,
    /// Digits only, locale separators stripped
    pub price: Option<String>,
    pub rooms: Option<String>,
    pub area: Option<String>,
    pub postal_code: Option<String>,
    pub locality: Option<String>,
    pub property_type: Option<PropertyType>,
    pub sub_property_type: Option<String>,
}

/// Fields owned by the "Général" section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GeneralInfo {
    pub facades: Option<u32>,
    pub building_state: Option<String>,
}

/// Fields owned by the "Intérieur" section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InteriorInfo {
    pub furnished: Option<bool>,
    pub open_fire: Option<bool>,
    pub kitchen_type: Option<KitchenType>,
}

/// Fields owned by the "Extérieur" section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExteriorInfo {
    pub terrace: Option<bool>,
    pub terrace_surface: Option<u32>,
    pub garden: Option<bool>,
    pub garden_surface: Option<u32>,
}

/// Fields owned by the "Installations" section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InstallationsInfo {
    pub swimming_pool: Option<bool>,
}

/// Fields owned by the "Aperçu" section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OverviewInfo {
    /// Sum of livable and land surfaces
    pub land_surface: Option<u32>,
}

/// Enrichment read from a listing's detail page.
///
/// Each section owns its own struct, so two sections can never write the
/// same field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DetailRecord {
    pub general: GeneralInfo,
    pub interior: InteriorInfo,
    pub exterior: ExteriorInfo,
    pub installations: InstallationsInfo,
    pub overview: OverviewInfo,
}

/// One output row: card fields followed by detail fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MergedRecord {
    pub url: Option<String>,
    pub price: Option<String>,
    pub rooms: Option<String>,
    pub area: Option<String>,
    pub postal_code: Option<String>,
    pub locality: Option<String>,
    pub property_type: Option<PropertyType>,
    pub sub_property_type: Option<String>,
    pub facades: Option<u32>,
    pub building_state: Option<String>,
    pub furnished: Option<bool>,
    pub open_fire: Option<bool>,
    pub kitchen_type: Option<KitchenType>,
    pub terrace: Option<bool>,
    pub terrace_surface: Option<u32>,
    pub garden: Option<bool>,
    pub garden_surface: Option<u32>,
    pub swimming_pool: Option<bool>,
    pub land_surface: Option<u32>,
}

impl MergedRecord {
    /// Combine a card with its detail enrichment.
    ///
    /// Both inputs are destructured exhaustively: adding a field to either
    /// record without placing it here fails to compile.
    pub fn merge(basic: BasicRecord, detail: DetailRecord) -> Self {
        let BasicRecord {
            url,
            price,
            rooms,
            area,
            postal_code,
            locality,
            property_type,
            sub_property_type,
        } = basic;
        let DetailRecord {
            general: GeneralInfo {
                facades,
                building_state,
            },
            interior: InteriorInfo {
                furnished,
                open_fire,
                kitchen_type,
            },
            exterior: ExteriorInfo {
                terrace,
                terrace_surface,
                garden,
                garden_surface,
            },
            installations: InstallationsInfo { swimming_pool },
            overview: OverviewInfo { land_surface },
        } = detail;

        Self {
            url,
            price,
            rooms,
            area,
            postal_code,
            locality,
            property_type,
            sub_property_type,
            facades,
            building_state,
            furnished,
            open_fire,
            kitchen_type,
            terrace,
            terrace_surface,
            garden,
            garden_surface,
            swimming_pool,
            land_surface,
        }
    }

    /// Card-only row, used when the detail page could not be read
    pub fn from_basic(basic: BasicRecord) -> Self {
        Self::merge(basic, DetailRecord::default())
    }
}

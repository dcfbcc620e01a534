pub mod browser;
pub mod card;
pub mod detail;
pub mod error;
pub mod http;
pub mod markup;
pub mod normalize;
pub mod sections;
pub mod traits;

pub use browser::BrowserFetcher;
pub use card::extract_cards;
pub use detail::extract_detail;
pub use error::ScrapeError;
pub use http::HttpFetcher;
pub use traits::PageFetcher;

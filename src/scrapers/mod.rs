//! Scrapers for the tag listing and the article pages it links to.
//!
//! Scraping follows a two-phase pattern:
//!
//! 1. **Discovery** ([`listing`]): walk the paginated tag listing and collect
//!    headline links that point at genuine articles
//! 2. **Extraction** ([`article`]): pull title, author, date and body text out
//!    of one article page through ordered selector cascades
//!
//! # Layout drift
//!
//! The target site has been redesigned several times and individual articles
//! do not agree on markup. Each field is therefore read through a list of
//! [`article::FieldStrategy`] values tried in order; the first non-empty
//! result wins and a field nobody matched falls back to a sentinel.
//!
//! Both phases are pure over markup except for the page fetches, which go
//! through [`crate::fetcher::PageSource`].

pub mod article;
pub mod listing;

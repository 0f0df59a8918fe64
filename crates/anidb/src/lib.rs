//! AniDB client library.
//!
//! Searches the locally cached AniDB title index and fetches full anime
//! records (episodes, ratings, categories, tags) from the AniDB HTTP API.

pub mod api;
pub mod client;
pub mod decode;
pub mod error;
pub mod models;
pub mod search;
pub mod titles;
pub mod xml;

pub use api::{AnimeFetcher, Downloader, HttpApi, HttpDownloader};
pub use client::AnidbClient;
pub use error::AnidbError;
pub use models::{
    Anime, AnimeRecord, Category, Episode, EpisodeNumber, Picture, Ratings, StubAnime, Tag, Title,
};
pub use titles::{TitleIndex, TitleIndexCache, TitleIndexEntry};

pub type Result<T> = std::result::Result<T, AnidbError>;

//! HTTP clients for the services KrishiMitra+ consumes.
//!
//! Each client owns a `reqwest::Client` and a base URL from configuration.
//! None of them retries; failures surface as [`KrishiMitraError::Network`]
//! or [`KrishiMitraError::Parse`].
//!
//! [`KrishiMitraError::Network`]: krishimitra_shared::KrishiMitraError::Network
//! [`KrishiMitraError::Parse`]: krishimitra_shared::KrishiMitraError::Parse

pub mod assistant;
pub mod blogs;
pub mod disease;
pub mod geocode;
mod http;
pub mod market;
pub mod news;
pub mod videos;
pub mod weather;

pub use assistant::{AssistantClient, AssistantReply};
pub use blogs::{BlogArticle, BlogClient, BlogPost};
pub use disease::{DiseaseClient, Prediction};
pub use geocode::{GeocodeClient, Place};
pub use http::{USER_AGENT, Upload, build_client, client_from_config};
pub use market::{
    BestMarket, ForecastPoint, MarketClient, MarketInsight, MarketQuote, MarketRecommendations,
    PricePoint, Trend, TrendingMarket,
};
pub use news::{NewsArticle, NewsClient, NewsFeed};
pub use videos::{Video, VideoCategory, VideoClient, VideoPage};
pub use weather::{WeatherClient, WeatherReport, WeatherRequest};

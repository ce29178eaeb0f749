pub mod extractor;
pub mod fetcher;
pub mod hn;
pub mod http;
pub mod summarizer;

pub use extractor::{ReadabilityExtractor, TextFormat};
pub use fetcher::ReqwestFetcher;
pub use hn::{Feed, HnApiClient};
pub use http::{ClientConfig, build_http_client};
pub use summarizer::OpenAiSummarizer;

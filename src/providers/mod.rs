pub mod bcb;
pub mod fetcher;
pub mod fundamentus;
pub mod table_parser;
pub mod util;

pub use bcb::BcbBenchmarkProvider;
pub use fetcher::HttpFetcher;
pub use fundamentus::FundamentusRepository;
pub use table_parser::HtmlTableParser;

pub mod article;
pub mod dedup;
pub mod error;
pub mod rank;
pub mod urlnorm;

pub use article::{CanonicalArticle, Source};
pub use dedup::dedupe;
pub use error::Error;
pub use rank::{parse_published, rank};
pub use urlnorm::{hostname, normalize_url};

pub type Result<T> = std::result::Result<T, Error>;

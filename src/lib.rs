/// Macro for prefixed status logging to stderr (only when stderr is a terminal).
///
/// Usage:
/// ```ignore
/// log_status!("fetch", "GET {}", url);
/// log_status!("ows", "Querying {} capabilities at {}", service, server_url);
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        if ::std::io::IsTerminal::is_terminal(&::std::io::stderr()) {
            eprintln!(concat!("[", $prefix, "] {}"), format_args!($($arg)*));
        }
    };
}

pub mod error;
pub mod http;
pub mod layer;
pub mod ows;
pub mod tmp;

pub use error::{Error, Result};
pub use http::{fetch_page, FetchOptions, FetchOutcome, LoginOutcome, Session};
pub use layer::{check_layer, Layer};
pub use ows::{
    get_layer_metadata, parse_keywords, Catalog, CatalogEntry, LayerMetadata, LayerType,
    WebCoverageService, WebFeatureService,
};
pub use tmp::{unique_filename, TempOptions};

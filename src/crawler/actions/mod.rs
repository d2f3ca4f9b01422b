//! Standard response actions
//!
//! - `Redirect`: turns a redirect's `Location` into a reference
//! - `Download`: reads the body, recording size and elapsed time
//! - `ParseLinks`: extracts references from HTML and CSS bodies
//! - `Save`: records the response in the datastore

mod download;
mod parse_links;
mod redirect;
mod save;

pub use download::{download_body, Download};
pub use parse_links::ParseLinks;
pub use redirect::Redirect;
pub use save::Save;

use crate::crawler::pipeline::Pipeline;
use crate::storage::Datastore;
use std::sync::Arc;

/// The pipeline a crawl runs for every response
pub fn standard_pipeline(store: Arc<dyn Datastore>) -> Pipeline {
    Pipeline::new()
        .with(Redirect)
        .with(Download)
        .with(ParseLinks)
        .with(Save::new(store))
}

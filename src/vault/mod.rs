pub mod config;
pub mod daily;
pub mod index;
pub mod ingest;
pub mod ledger;
pub mod manifest;
pub mod paths;
pub mod record;
pub mod util;
pub mod warn;

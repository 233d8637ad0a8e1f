mod types;
mod usage_queries;
mod wallet_queries;

pub(crate) use types::*;

pub(crate) use wallet_queries::find_correlated;

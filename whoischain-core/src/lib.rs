pub mod bulk;
pub mod error;
pub mod hostname;
pub mod lookup;
pub mod net;
pub mod options;
pub mod output;
pub mod parse;
pub mod request;
pub mod response;
pub mod retry;
pub mod servers;

#[cfg(test)]
mod testing;

pub use error::{Result, WhoisError};
pub use hostname::HostName;

pub use lookup::WhoisLookup;
pub use net::{TcpFetcher, TextFetcher};
pub use options::{TextEncoding, WhoisOptions};
pub use parse::WhoisParser;
pub use request::WhoisRequest;
pub use response::{
    Contact, DomainRecord, NetworkRecord, RecordKind, Registrar, WhoisRecord, WhoisResponse,
    WhoisStatus,
};
pub use servers::{ServerLookup, WhoisServerSelector};

pub use bulk::{BulkExecutor, BulkResult};
pub use output::{OutputFormat, OutputFormatter};
pub use retry::{RetryExecutor, RetryPolicy};

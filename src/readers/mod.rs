pub mod datastore_client;
pub mod response;
pub mod station_reader;

pub use datastore_client::{with_retry, DatastoreClient, FetchedRecords, RetryPolicy};
pub use response::{parse_records, RawRecord};
pub use station_reader::{StationReader, StationRegistry};

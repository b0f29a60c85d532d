mod bar;
mod granularity;
mod instrument;
mod range;
mod timestamp;

pub use bar::{Bar, RawBar};
pub use granularity::Granularity;
pub use instrument::InstrumentCode;
pub use range::{yesterday_utc, FetchRange};
pub use timestamp::UtcDateTime;

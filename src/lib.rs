//! Balance and movement history of a Euroticket à la card, read from the
//! consumer portal's HTML pages.

pub mod amount;
pub mod card;
pub mod client;
pub mod error;
pub mod markup;
pub mod portal;
pub mod report;
pub mod settings;
pub mod transport;

pub use card::{Card, Movement};
pub use client::Alacard;
pub use error::{Error, Result};
pub use settings::Settings;
pub use transport::{HttpTransport, Reply, Transport};

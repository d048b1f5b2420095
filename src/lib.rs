#![doc = "COD-AB boundary quality checks and scoring"]
pub mod checks;
pub mod config;
pub mod frame;
pub mod geometry;
pub mod layer;
pub mod locale;
pub mod pipeline;
pub mod scores;

#[doc(inline)]
pub use config::Config;

#[doc(inline)]
pub use layer::{load_layers, BoundaryLayer};

#[doc(inline)]
pub use locale::{CldrExemplars, Exemplars};

#[doc(inline)]
pub use pipeline::{discover_countries, process_country, CountryReport};

#[doc(inline)]
pub use frame::{FrameError, Record, KEYS};

#![deny(warnings)]

//! Pricing engine for the studio quote tool.
//!
//! This crate turns a lead's simulation inputs into a priced proposal:
//! - `waterfall`: the pure cost-to-price computation
//! - `stages`: editing operations over the staged work plan
//! - `draft`: the editable simulation of one lead, seeded from the catalog
//! - `conversion`: turning a lead and its simulation into a project

pub mod conversion;
pub mod draft;
pub mod ids;
pub mod stages;
pub mod waterfall;

pub use conversion::{convert_lead, ConversionSource, ConversionStamp};
pub use draft::{SimulationDraft, VariableField};
pub use ids::IdGen;
pub use stages::{Confirmation, ItemField, StagePlan};
pub use waterfall::{
    compute_waterfall, percent_of, TeamRates, WaterfallInputs, OFFICE_CONTRIBUTION_RATE,
};

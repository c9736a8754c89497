#![deny(warnings)]

//! Orchestration of the quote engine over a record store.
//!
//! `QuoteDesk` wires the pure pricing functions to a [`persistence::Store`]:
//! catalog bootstrap, opening and saving a lead's simulation, converting a
//! lead into a project and deleting a lead together with its simulation.

pub mod clients;
pub mod desk;

pub use clients::{client_from_lead, find_matching_client};
pub use desk::{DeskError, NewLead, QuoteDesk};

//! Core library for the cup-tracker command line application.
//!
//! Attendance check-ins and a point economy for a multi-week program whose
//! records live in an external tabular store. The store seam and its
//! implementations live under [`cup::tracker::io`], time lookups in
//! [`cup::tracker::schedule`], header and key lookups in
//! [`cup::tracker::index`], and the operations themselves in
//! [`cup::tracker::checkin`], [`cup::tracker::transfer`],
//! [`cup::tracker::ranking`] and [`cup::tracker::transcript`]. The
//! [`cup::tracker::service`] module wraps them in structured responses.

pub mod cup;

pub use cup::tracker::{
    Result, TrackerError, checkin, clock, config, error, index, io, logging, model, ranking, saga,
    schedule, service, transcript, transfer,
};

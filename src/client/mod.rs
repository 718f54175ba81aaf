//! Client-side helpers for consumers of the HTTP API.

pub mod coordinates;

pub use coordinates::{CoordinatesClient, ResolvedCoordinates, Tier};

//! Unit tests for the shape codec.
//!
//! These tests verify SVG and TEI parsing, SVG export and the round trip
//! between the two.

mod roundtrip_tests;
mod svg_tests;

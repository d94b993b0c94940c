//! Core simulation infrastructure

pub mod calendar;

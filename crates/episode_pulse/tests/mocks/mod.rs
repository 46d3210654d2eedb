#![allow(dead_code)]

pub mod candidates;
pub mod clock;
pub mod generator;
pub mod messaging;
pub mod publisher;
pub mod state_store;
pub mod strategy;
